//! Random forest of CART classification trees.
//!
//! - Bootstrap-sampled training rows per tree, seeded for reproducibility.
//! - `sqrt(n_features)` candidate features per split, Gini impurity.
//! - Probabilities are the mean of the per-tree leaf class distributions.
//! - JSON export/load through `serde`.

mod model;
mod train;

pub use model::{DecisionTree, ForestModel, Node};
pub use train::{ForestOptions, TrainDataset, train_forest};
