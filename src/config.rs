//! TOML configuration shared by the trainer and the prediction service.
//!
//! Settings live in `heartrisk.toml` inside the application directory unless a
//! path is passed explicitly. A missing default file means defaults; every
//! field may be omitted.
//!
//! ```toml
//! [server]
//! listen_addr = "0.0.0.0:5000"
//!
//! [trainer]
//! data_path = "heart_disease_uci.csv"
//! n_estimators = 200
//!
//! [logging]
//! level = "heartrisk=debug,info"
//! max_files = 5
//! dir = "/var/log/heartrisk"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::app_dirs;
use crate::ml::forest::ForestOptions;
use crate::train::TrainOptions;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "heartrisk.toml";

const DEFAULT_ARTIFACT_PATH: &str = "heart_disease_model.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("No config directory found; pass --config or set {}", app_dirs::CONFIG_HOME_ENV)]
    NoConfigDir,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub trainer: TrainerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the prediction service binds to.
    pub listen_addr: String,
    /// Artifact loaded at startup.
    pub artifact_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5000".to_string(),
            artifact_path: PathBuf::from(DEFAULT_ARTIFACT_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub data_path: PathBuf,
    pub model_out: PathBuf,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
    pub test_fraction: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        let forest = ForestOptions::default();
        let train = TrainOptions::default();
        Self {
            data_path: train.data_path,
            model_out: PathBuf::from(DEFAULT_ARTIFACT_PATH),
            n_estimators: forest.n_estimators,
            max_depth: forest.max_depth,
            min_samples_split: forest.min_samples_split,
            seed: forest.seed,
            test_fraction: train.test_fraction,
        }
    }
}

impl TrainerConfig {
    /// Training options for this configuration; one seed drives both the
    /// split and the forest.
    pub fn train_options(&self) -> TrainOptions {
        TrainOptions {
            data_path: self.data_path.clone(),
            test_fraction: self.test_fraction,
            split_seed: self.seed,
            forest: ForestOptions {
                n_estimators: self.n_estimators,
                max_depth: self.max_depth,
                min_samples_split: self.min_samples_split,
                seed: self.seed,
                ..ForestOptions::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directives used when `RUST_LOG` is unset.
    pub level: String,
    /// Per-launch log files kept; older ones are pruned at startup.
    pub max_files: usize,
    /// Log directory. Defaults to `logs` inside the application directory.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            max_files: 10,
            dir: None,
        }
    }
}

/// Resolve the default configuration file path inside the application directory.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root().ok_or(ConfigError::NoConfigDir)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from `explicit`, or from the default location.
///
/// An explicit path must exist; a missing default file yields defaults.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            load_from(path)
        }
        None => load_or_default(&config_path()?),
    }
}

/// Parse `path` if it exists, otherwise return defaults.
pub fn load_or_default(path: &Path) -> Result<AppConfig, ConfigError> {
    if path.exists() {
        load_from(path)
    } else {
        Ok(AppConfig::default())
    }
}

/// Parse a configuration file.
pub fn load_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}
