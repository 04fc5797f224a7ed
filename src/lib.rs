//! Heart disease risk trainer and prediction service.
/// Application directory resolution.
pub mod app_dirs;
/// Persisted model plus feature list.
pub mod artifact;
/// TOML configuration.
pub mod config;
/// Numeric coercion and one-hot encoding.
pub mod encode;
/// Minimal tabular data container.
pub mod frame;
/// Tracing setup.
pub mod logging;
/// Classifier trait, random forest and metrics.
pub mod ml;
/// Request validation and inference.
pub mod predict;
/// Column alias reconciliation.
pub mod reconcile;
/// Canonical field schema.
pub mod schema;
/// HTTP service.
pub mod server;
/// Offline training pipeline.
pub mod train;
