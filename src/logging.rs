use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::{HookError, Result};

const DEFAULT_LOG_FILTER: &str = "info";

pub struct FileLogger {
    log_directory: PathBuf,
    file_name: String,
}

impl FileLogger {
    /// `log_file` is the full path of the file to append to.
    pub fn new(log_file: impl AsRef<Path>) -> Result<Self> {
        let log_file = log_file.as_ref();
        let file_name = log_file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                HookError::LoggingSetupFailed(format!(
                    "'{}' does not name a log file",
                    log_file.display()
                ))
            })?
            .to_string();
        let log_directory = match log_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self {
            log_directory,
            file_name,
        })
    }

    pub fn log_directory(&self) -> &Path {
        &self.log_directory
    }

    pub fn file_path(&self) -> PathBuf {
        self.log_directory.join(&self.file_name)
    }

    /// Creates the log directory and a non-blocking writer appending to the file.
    /// The guard must be held until shutdown or buffered lines are lost.
    pub fn setup_file_logging(&self) -> Result<(NonBlocking, WorkerGuard)> {
        std::fs::create_dir_all(&self.log_directory).map_err(|e| {
            HookError::LoggingSetupFailed(format!(
                "Failed to create log directory '{}': {}",
                self.log_directory.display(),
                e
            ))
        })?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(&self.file_name)
            .build(&self.log_directory)
            .map_err(|e| {
                HookError::LoggingSetupFailed(format!(
                    "Failed to open log file '{}': {}",
                    self.file_path().display(),
                    e
                ))
            })?;

        Ok(tracing_appender::non_blocking(file_appender))
    }
}

/// Installs the global subscriber: log file always, stdout when `console` is set.
/// `RUST_LOG` overrides the default `info` filter.
pub fn setup_logging(file_logger: &FileLogger, console: bool) -> Result<WorkerGuard> {
    let (file_writer, guard) = file_logger.setup_file_logging()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_layer = console.then(fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false) // Disable ANSI colors for file logs
                .with_target(false),
        )
        .with(console_layer)
        .try_init()
        .map_err(|e| HookError::LoggingSetupFailed(e.to_string()))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_log_path_into_directory_and_file() {
        let logger = FileLogger::new("/var/log/hook/webhook.log").unwrap();
        assert_eq!(logger.log_directory(), Path::new("/var/log/hook"));
        assert_eq!(logger.file_path(), PathBuf::from("/var/log/hook/webhook.log"));
    }

    #[test]
    fn bare_file_name_logs_to_current_directory() {
        let logger = FileLogger::new("webhook.log").unwrap();
        assert_eq!(logger.log_directory(), Path::new("."));
    }

    #[test]
    fn path_without_file_name_is_rejected() {
        assert!(matches!(
            FileLogger::new("/"),
            Err(HookError::LoggingSetupFailed(_))
        ));
    }

    #[test]
    fn creates_missing_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_file = dir.path().join("nested").join("logs").join("webhook.log");
        let logger = FileLogger::new(&log_file).unwrap();

        let (_writer, guard) = logger.setup_file_logging().unwrap();
        assert!(log_file.parent().unwrap().is_dir());
        drop(guard);
    }

    #[cfg(unix)]
    #[test]
    fn unwritable_log_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file cannot be used as a directory component
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let logger = FileLogger::new(blocker.join("webhook.log")).unwrap();

        assert!(matches!(
            logger.setup_file_logging(),
            Err(HookError::LoggingSetupFailed(_))
        ));
    }
}
