//! Logging setup for the command line tool

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log file path: {0:?}")]
    InvalidPath(PathBuf),

    #[error("Failed to create log directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Write logs to this file instead of stderr
    pub file: Option<PathBuf>,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for the
/// lifetime of the program.
pub fn init_logging(options: &LogOptions) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (writer, guard) = match &options.file {
        Some(path) => {
            let (dir, file_name) = split_log_path(path)?;
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(options.file.is_none());

    let result = if options.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(guard)
}

fn split_log_path(path: &Path) -> Result<(PathBuf, PathBuf), LoggingError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| LoggingError::InvalidPath(path.to_path_buf()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, PathBuf::from(file_name)))
}
