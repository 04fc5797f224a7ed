//! Machine learning helpers for training and inference.
//!
//! The model is a plain-Rust random forest with JSON export/load; metrics
//! cover held-out evaluation during training.

pub mod forest;
pub mod metrics;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model expects {expected} features but received {actual}")]
    FeatureCount { expected: usize, actual: usize },
    #[error("Malformed model: {0}")]
    Malformed(String),
}

/// Probabilistic classifier over fixed-length numeric feature vectors.
pub trait Classifier: Send + Sync {
    /// Length of the feature vector the model accepts.
    fn n_features(&self) -> usize;

    /// Class probabilities for one feature vector, indexed by class.
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError>;

    /// Most probable class index; ties resolve to the lower index.
    fn predict(&self, features: &[f64]) -> Result<usize, ModelError> {
        Ok(argmax(&self.predict_proba(features)?))
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best_idx = 0usize;
    let mut best_val = f64::NEG_INFINITY;
    for (idx, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = idx;
        }
    }
    best_idx
}
