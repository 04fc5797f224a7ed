//! Training artifact: the fitted model paired with its ordered feature list.
//!
//! The feature list is the whole contract between trainer and predictor: the
//! model consumes exactly these columns, in this order.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ml::forest::ForestModel;
use crate::ml::metrics::Evaluation;

/// Current artifact format version.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Keys every artifact must carry.
const REQUIRED_KEYS: [&str; 2] = ["model", "features"];

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Model artifact not found at {path}; run heartrisk-train first")]
    NotFound { path: PathBuf },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid artifact JSON at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Artifact {path} is missing the '{key}' key; re-run heartrisk-train")]
    MissingKey { path: PathBuf, key: &'static str },
    #[error("Artifact is inconsistent: {0}")]
    Invalid(String),
    #[error("Failed to serialize artifact: {0}")]
    Serialize(serde_json::Error),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The persisted model variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    RandomForest(ForestModel),
}

/// Summary of the training run that produced an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Source data file.
    pub data_path: String,
    /// Rows left after cleaning.
    pub records: usize,
    /// Rows dropped for missing values.
    pub dropped_records: usize,
    pub train_records: usize,
    pub test_records: usize,
    /// Held-out evaluation, absent when the test split was empty.
    pub evaluation: Option<Evaluation>,
}

/// Fitted model plus the exact ordered list of encoded feature columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    pub model: ModelSpec,
    pub features: Vec<String>,
    #[serde(default)]
    pub training: Option<TrainingSummary>,
}

fn default_format_version() -> u32 {
    ARTIFACT_FORMAT_VERSION
}

impl Artifact {
    pub fn new(model: ModelSpec, features: Vec<String>) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            model,
            features,
            training: None,
        }
    }

    /// Validate structural invariants between the model and the feature list.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::Invalid(format!(
                "unsupported format_version {} (expected {ARTIFACT_FORMAT_VERSION})",
                self.format_version
            )));
        }
        if self.features.is_empty() {
            return Err(ArtifactError::Invalid("feature list is empty".to_string()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.features.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(ArtifactError::Invalid(format!("duplicate feature '{dup}'")));
        }
        match &self.model {
            ModelSpec::RandomForest(forest) => {
                forest.validate().map_err(ArtifactError::Invalid)?;
                if forest.n_features != self.features.len() {
                    return Err(ArtifactError::Invalid(format!(
                        "model expects {} features but the list has {}",
                        forest.n_features,
                        self.features.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Load and validate an artifact from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let bytes = std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ArtifactError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ArtifactError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let parse_err = |source| ArtifactError::Parse {
            path: path.to_path_buf(),
            source,
        };
        let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(parse_err)?;
        for key in REQUIRED_KEYS {
            if value.get(key).is_none() {
                return Err(ArtifactError::MissingKey {
                    path: path.to_path_buf(),
                    key,
                });
            }
        }
        let artifact: Self = serde_json::from_value(value).map_err(parse_err)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Write the artifact as pretty JSON, replacing `path` atomically.
    pub fn save(&self, path: &Path) -> Result<(), ArtifactError> {
        let write_err = |source| ArtifactError::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(write_err)?;
        let bytes = serde_json::to_vec_pretty(self).map_err(ArtifactError::Serialize)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|err| write_err(err.error))?;
        Ok(())
    }
}
