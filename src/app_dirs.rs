//! Where heartrisk keeps its config file and logs.
//!
//! Both live in a `.heartrisk` folder under the OS config directory, or under
//! `HEARTRISK_CONFIG_HOME` when that variable is set and non-empty.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the config base.
pub const APP_DIR_NAME: &str = ".heartrisk";

/// Environment variable overriding the config base directory.
pub const CONFIG_HOME_ENV: &str = "HEARTRISK_CONFIG_HOME";

const LOGS_DIR_NAME: &str = "logs";

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No config directory available; set {}", CONFIG_HOME_ENV)]
    NoBaseDir,
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Location of the `.heartrisk` folder. Nothing is created.
pub fn app_root() -> Option<PathBuf> {
    root_under(
        std::env::var_os(CONFIG_HOME_ENV),
        BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()),
    )
}

/// Log directory, created if needed.
///
/// `configured` comes from the `[logging]` config section; without it logs go
/// to `logs` inside the `.heartrisk` folder.
pub fn logs_dir(configured: Option<&Path>) -> Result<PathBuf, AppDirError> {
    let dir = match configured {
        Some(path) => path.to_path_buf(),
        None => app_root().ok_or(AppDirError::NoBaseDir)?.join(LOGS_DIR_NAME),
    };
    std::fs::create_dir_all(&dir).map_err(|source| AppDirError::CreateDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

fn root_under(config_home: Option<OsString>, os_config: Option<PathBuf>) -> Option<PathBuf> {
    config_home
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or(os_config)
        .map(|base| base.join(APP_DIR_NAME))
}
