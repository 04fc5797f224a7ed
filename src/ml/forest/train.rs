use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::model::{DecisionTree, ForestModel, Node};

/// Training hyperparameters for the random forest.
#[derive(Debug, Clone)]
pub struct ForestOptions {
    /// Number of trees.
    pub n_estimators: usize,
    /// Maximum tree depth; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Minimum number of rows a node needs before it may split.
    pub min_samples_split: usize,
    /// Candidate features per split; `None` uses `sqrt(n_features)`.
    pub max_features: Option<usize>,
    /// Draw a bootstrap sample of the rows for every tree.
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

/// In-memory dataset used for training and evaluation.
#[derive(Debug, Clone)]
pub struct TrainDataset {
    /// Ordered list of class identifiers.
    pub classes: Vec<String>,
    /// Feature matrix, row-major.
    pub x: Vec<Vec<f64>>,
    /// Class indices aligned with `x`.
    pub y: Vec<usize>,
}

/// Grow a random forest classifier.
pub fn train_forest(
    dataset: &TrainDataset,
    options: &ForestOptions,
) -> Result<ForestModel, String> {
    if dataset.x.len() != dataset.y.len() {
        return Err("Mismatched X/Y lengths".to_string());
    }
    if dataset.x.is_empty() {
        return Err("Empty dataset".to_string());
    }
    let n_classes = dataset.classes.len();
    if n_classes < 2 {
        return Err("Need at least 2 classes".to_string());
    }
    if options.n_estimators == 0 {
        return Err("Need at least 1 tree".to_string());
    }
    let n_features = dataset.x[0].len();
    if n_features == 0 {
        return Err("Feature vectors are empty".to_string());
    }
    if dataset.x.iter().any(|row| row.len() != n_features) {
        return Err("Inconsistent feature row length".to_string());
    }
    if let Some(bad) = dataset.y.iter().find(|&&label| label >= n_classes) {
        return Err(format!("Label {bad} is out of range for {n_classes} classes"));
    }

    let default_mtry = (n_features as f64).sqrt().floor() as usize;
    let mtry = options
        .max_features
        .unwrap_or(default_mtry)
        .clamp(1, n_features);
    let grower = Grower {
        x: &dataset.x,
        y: &dataset.y,
        n_classes,
        mtry,
        options,
    };

    let n = dataset.x.len();
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut trees = Vec::with_capacity(options.n_estimators);
    for _ in 0..options.n_estimators {
        let mut tree_rng = StdRng::seed_from_u64(rng.random::<u64>());
        let rows: Vec<usize> = if options.bootstrap {
            (0..n).map(|_| tree_rng.random_range(0..n)).collect()
        } else {
            (0..n).collect()
        };
        trees.push(grower.grow(rows, &mut tree_rng));
    }

    Ok(ForestModel {
        model_version: 1,
        n_features,
        classes: dataset.classes.clone(),
        trees,
    })
}

struct Grower<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    mtry: usize,
    options: &'a ForestOptions,
}

struct Pending {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
}

#[derive(Debug, Clone)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl Grower<'_> {
    fn grow(&self, rows: Vec<usize>, rng: &mut StdRng) -> DecisionTree {
        let placeholder = || Node::Leaf { proba: Vec::new() };
        let mut nodes = vec![placeholder()];
        let mut stack = vec![Pending {
            node: 0,
            rows,
            depth: 0,
        }];

        while let Some(Pending { node, rows, depth }) = stack.pop() {
            let counts = self.class_counts(&rows);
            let pure = counts.iter().filter(|&&count| count > 0).count() <= 1;
            let depth_ok = self.options.max_depth.is_none_or(|max| depth < max);
            let big_enough = rows.len() >= self.options.min_samples_split.max(2);
            let split = if !pure && depth_ok && big_enough {
                self.best_split(&rows, &counts, rng)
            } else {
                None
            };

            let Some(split) = split else {
                nodes[node] = Node::Leaf {
                    proba: distribution(&counts),
                };
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .into_iter()
                .partition(|&row| self.x[row][split.feature] <= split.threshold);
            let left = nodes.len();
            nodes.push(placeholder());
            let right = nodes.len();
            nodes.push(placeholder());
            nodes[node] = Node::Split {
                feature: split.feature as u32,
                threshold: split.threshold,
                left: left as u32,
                right: right as u32,
            };
            stack.push(Pending {
                node: right,
                rows: right_rows,
                depth: depth + 1,
            });
            stack.push(Pending {
                node: left,
                rows: left_rows,
                depth: depth + 1,
            });
        }

        DecisionTree { nodes }
    }

    fn class_counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &row in rows {
            counts[self.y[row]] += 1;
        }
        counts
    }

    /// Search a random subset of features for the split with the lowest
    /// weighted Gini impurity. Constant features do not count towards the
    /// subset size, so a splittable node always yields a candidate.
    fn best_split(
        &self,
        rows: &[usize],
        parent_counts: &[usize],
        rng: &mut StdRng,
    ) -> Option<SplitCandidate> {
        let n_features = self.x[rows[0]].len();
        let mut order: Vec<usize> = (0..n_features).collect();
        order.shuffle(rng);

        let total = rows.len();
        let mut best: Option<SplitCandidate> = None;
        let mut evaluated = 0usize;
        let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(total);
        let mut left_counts = vec![0usize; self.n_classes];
        let mut right_counts = vec![0usize; self.n_classes];

        for feature in order {
            if evaluated >= self.mtry {
                break;
            }
            sorted.clear();
            sorted.extend(rows.iter().map(|&row| (self.x[row][feature], self.y[row])));
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
            if sorted[0].0 == sorted[total - 1].0 {
                continue;
            }
            evaluated += 1;

            left_counts.iter_mut().for_each(|count| *count = 0);
            for i in 0..total - 1 {
                left_counts[sorted[i].1] += 1;
                let (value, next) = (sorted[i].0, sorted[i + 1].0);
                if next <= value {
                    continue;
                }
                for (k, right) in right_counts.iter_mut().enumerate() {
                    *right = parent_counts[k] - left_counts[k];
                }
                let n_left = i + 1;
                let n_right = total - n_left;
                let impurity = (n_left as f64 * gini(&left_counts, n_left)
                    + n_right as f64 * gini(&right_counts, n_right))
                    / total as f64;
                if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: midpoint(value, next),
                        impurity,
                    });
                }
            }
        }
        best
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&count| {
            let p = count as f64 / total;
            p * p
        })
        .sum::<f64>()
}

/// Threshold between two distinct sorted values; always `low <= t < high`.
fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low / 2.0 + high / 2.0;
    if mid >= high { low } else { mid }
}

fn distribution(counts: &[usize]) -> Vec<f64> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![1.0 / counts.len().max(1) as f64; counts.len()];
    }
    counts
        .iter()
        .map(|&count| count as f64 / total as f64)
        .collect()
}
