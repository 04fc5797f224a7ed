use serde::{Deserialize, Serialize};

use crate::ml::{Classifier, ModelError};

/// One node of a flattened decision tree. Children are indices into
/// [`DecisionTree::nodes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Rows with `features[feature] <= threshold` go left.
    Split {
        feature: u32,
        threshold: f64,
        left: u32,
        right: u32,
    },
    /// Class distribution of the training rows that reached this leaf.
    Leaf { proba: Vec<f64> },
}

/// A single CART tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    /// Walk the tree and return the leaf distribution for a feature vector.
    pub fn leaf_proba(&self, features: &[f64]) -> Result<&[f64], ModelError> {
        let mut idx = 0usize;
        // A well-formed tree reaches a leaf in at most `nodes.len()` steps.
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx) {
                Some(Node::Leaf { proba }) => return Ok(proba.as_slice()),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features.get(*feature as usize).copied().unwrap_or(0.0);
                    idx = if value <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
                None => break,
            }
        }
        Err(ModelError::Malformed(format!(
            "tree walk left the node table at index {idx}"
        )))
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature as usize >= n_features {
                        return Err(format!("node {idx} splits on unknown feature {feature}"));
                    }
                    // Children always follow their parent in the node table.
                    for child in [*left as usize, *right as usize] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {idx} points at invalid child {child}"));
                        }
                    }
                }
                Node::Leaf { proba } => {
                    if proba.len() != n_classes {
                        return Err(format!(
                            "leaf {idx} has {} probabilities but expected {n_classes}",
                            proba.len()
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Random forest classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    /// Model format version.
    pub model_version: i64,
    /// Length of the feature vectors the trees were grown on.
    pub n_features: usize,
    /// Ordered class identifiers; index 1 is the positive class.
    pub classes: Vec<String>,
    pub trees: Vec<DecisionTree>,
}

impl ForestModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.len() < 2 {
            return Err("Model must contain at least 2 classes".to_string());
        }
        if self.trees.is_empty() {
            return Err("Model must contain at least one tree".to_string());
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|err| format!("Tree {tree_idx}: {err}"))?;
        }
        Ok(())
    }
}

impl Classifier for ForestModel {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        if features.len() != self.n_features {
            return Err(ModelError::FeatureCount {
                expected: self.n_features,
                actual: features.len(),
            });
        }
        let mut sum = vec![0.0f64; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in sum.iter_mut().zip(tree.leaf_proba(features)?) {
                *acc += p;
            }
        }
        let n_trees = self.trees.len().max(1) as f64;
        for value in &mut sum {
            *value /= n_trees;
        }
        Ok(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(threshold: f64, left: [f64; 2], right: [f64; 2]) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold,
                    left: 1,
                    right: 2,
                },
                Node::Leaf {
                    proba: left.to_vec(),
                },
                Node::Leaf {
                    proba: right.to_vec(),
                },
            ],
        }
    }

    fn model() -> ForestModel {
        ForestModel {
            model_version: 1,
            n_features: 1,
            classes: vec!["0".into(), "1".into()],
            trees: vec![stump(0.5, [1.0, 0.0], [0.0, 1.0]), stump(1.5, [0.5, 0.5], [0.0, 1.0])],
        }
    }

    #[test]
    fn split_goes_left_on_equal() {
        let tree = stump(0.5, [1.0, 0.0], [0.0, 1.0]);
        assert_eq!(tree.leaf_proba(&[0.5]).unwrap(), &[1.0, 0.0]);
        assert_eq!(tree.leaf_proba(&[0.6]).unwrap(), &[0.0, 1.0]);
    }

    #[test]
    fn forest_averages_trees() {
        let model = model();
        assert_eq!(model.predict_proba(&[0.0]).unwrap(), vec![0.75, 0.25]);
        assert_eq!(model.predict_proba(&[1.0]).unwrap(), vec![0.25, 0.75]);
        assert_eq!(model.predict(&[0.0]).unwrap(), 0);
        assert_eq!(model.predict(&[2.0]).unwrap(), 1);
    }

    #[test]
    fn rejects_wrong_feature_count() {
        let err = model().predict_proba(&[0.0, 1.0]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::FeatureCount {
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn validate_catches_bad_children() {
        let mut model = model();
        model.trees[0].nodes[0] = Node::Split {
            feature: 0,
            threshold: 0.0,
            left: 0,
            right: 7,
        };
        assert!(model.validate().is_err());
    }

    #[test]
    fn json_round_trip_keeps_node_tags() {
        let json = serde_json::to_string(&model()).unwrap();
        assert!(json.contains("\"kind\":\"split\""));
        let back: ForestModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model());
    }
}
