//! Tracing setup for both binaries.
//!
//! Each launch logs to stdout and to its own `heartrisk_<timestamp>.log`.
//! The `[logging]` config section picks the filter, the directory and how many
//! launch files survive; `RUST_LOG` still overrides the filter.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, filter::ParseError, fmt, prelude::*};

use crate::app_dirs::{self, AppDirError};
use crate::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "heartrisk";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log level '{level}': {source}")]
    InvalidLevel { level: String, source: ParseError },
    #[error(transparent)]
    Dir(#[from] AppDirError),
    #[error("Failed to read log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to remove old log file {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to create log file {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log file name: {0}")]
    FormatTime(time::error::Format),
    #[error("Failed to install tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
}

/// Install the stdout and file subscriber described by `config`.
///
/// Returns the path of this launch's log file. Later calls are no-ops.
pub fn init(config: &LoggingConfig) -> Result<Option<PathBuf>, LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(None);
    }
    let filter = build_env_filter(&config.level)?;
    let (dir, file_name) = open_launch_log(config, now_local_or_utc())?;
    let log_path = dir.join(&file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(&dir, file_name));

    let timer = build_timer();
    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_timer(timer.clone()).with_writer(std::io::stdout))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(file_writer),
        );
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
    let _ = LOG_GUARD.set(guard);

    tracing::info!(
        path = %log_path.display(),
        keep = config.max_files,
        "Logging initialized"
    );
    Ok(Some(log_path))
}

/// [`init`], degrading to stdout-only logging when the file side fails.
///
/// A read-only log directory or a typo in `level` never blocks startup.
pub fn init_or_stdout(config: &LoggingConfig) {
    if let Err(err) = init(config) {
        eprintln!("Logging to file disabled: {err}");
        let filter = build_env_filter(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(build_timer())
            .try_init();
    }
}

/// Create this launch's log file and prune older ones down to `max_files`.
fn open_launch_log(
    config: &LoggingConfig,
    now: OffsetDateTime,
) -> Result<(PathBuf, String), LoggingError> {
    let dir = app_dirs::logs_dir(config.dir.as_deref())?;
    let file_name = format_log_file_name(now)?;
    let path = dir.join(&file_name);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| LoggingError::CreateLogFile {
            path: path.clone(),
            source,
        })?;
    // The file just created is the newest, so at least it survives.
    prune_old_logs(&dir, config.max_files.max(1))?;
    Ok((dir, file_name))
}

fn prune_old_logs(dir: &Path, max_files: usize) -> Result<(), LoggingError> {
    let mut logs = fs::read_dir(dir)
        .map_err(|source| LoggingError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_file()))
        .map(|entry| entry.path())
        .filter(|path| is_launch_log(path))
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect::<Vec<_>>();

    logs.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, path) in logs.into_iter().skip(max_files) {
        fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile { path, source })?;
    }
    Ok(())
}

fn is_launch_log(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "log")
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX))
}

fn format_log_file_name(now: OffsetDateTime) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let stamp = now.format(NAME_FORMAT).map_err(LoggingError::FormatTime)?;
    Ok(format!("{LOG_FILE_PREFIX}_{stamp}.log"))
}

fn build_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn build_env_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => parse_level(level),
    }
}

fn parse_level(level: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(level).map_err(|source| LoggingError::InvalidLevel {
        level: level.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};
    use tempfile::tempdir;

    fn config_in(dir: &Path, max_files: usize) -> LoggingConfig {
        LoggingConfig {
            max_files,
            dir: Some(dir.to_path_buf()),
            ..LoggingConfig::default()
        }
    }

    #[test]
    fn log_filename_has_timestamp_and_prefix() {
        let fixed = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let name = format_log_file_name(fixed).unwrap();
        assert_eq!(name, "heartrisk_2023-11-14_22-13-20.log");
    }

    #[test]
    fn launch_log_lands_in_configured_dir_and_prunes() {
        let base = tempdir().unwrap();
        let dir = base.path().join("logs");
        fs::create_dir_all(&dir).unwrap();
        for idx in 0..4 {
            fs::write(dir.join(format!("heartrisk_old{idx}.log")), "").unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        fs::write(dir.join("other.log"), "keep").unwrap();

        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let (log_dir, name) = open_launch_log(&config_in(&dir, 2), now).unwrap();
        assert_eq!(log_dir, dir);
        assert_eq!(name, "heartrisk_2023-11-14_22-13-20.log");
        assert!(dir.join(&name).exists());
        assert!(dir.join("heartrisk_old3.log").exists());
        assert!(!dir.join("heartrisk_old2.log").exists());
        assert!(!dir.join("heartrisk_old0.log").exists());
        assert!(dir.join("other.log").exists());
    }

    #[test]
    fn zero_max_files_keeps_the_current_launch() {
        let base = tempdir().unwrap();
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let (dir, name) = open_launch_log(&config_in(base.path(), 0), now).unwrap();
        assert!(dir.join(name).exists());
    }

    #[test]
    fn level_directives_are_validated() {
        assert!(parse_level("heartrisk=debug,tower_http=warn,info").is_ok());
        let err = parse_level("heartrisk=loud").unwrap_err();
        assert!(matches!(
            err,
            LoggingError::InvalidLevel { ref level, .. } if level == "heartrisk=loud"
        ));
    }
}
