//! Log writer module
//!
//! Installs the global `tracing` subscriber. Info-level events (including the
//! access log) go to stdout or the access log file, warnings and errors to
//! stderr or the error log file.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::filter::{filter_fn, LevelFilter};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Log output target
enum LogTarget {
    Stdout,
    Stderr,
    File(File),
}

impl LogTarget {
    fn open(path: Option<&str>, fallback: Self) -> io::Result<Self> {
        match path {
            Some(p) => open_log_file(p).map(Self::File),
            None => Ok(fallback),
        }
    }

    fn into_make_writer(self) -> BoxMakeWriter {
        match self {
            Self::Stdout => BoxMakeWriter::new(io::stdout),
            Self::Stderr => BoxMakeWriter::new(io::stderr),
            Self::File(file) => BoxMakeWriter::new(Mutex::new(file)),
        }
    }

    const fn is_terminal_stream(&self) -> bool {
        !matches!(self, Self::File(_))
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize the global subscriber
///
/// This should be called once at application startup.
/// Returns error if log files cannot be opened or a subscriber is already set.
pub fn init(config: &LoggingConfig) -> io::Result<()> {
    let level = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let info = LogTarget::open(config.access_log_file.as_deref(), LogTarget::Stdout)?;
    let error = LogTarget::open(config.error_log_file.as_deref(), LogTarget::Stderr)?;

    let info_layer = tracing_subscriber::fmt::layer()
        .with_ansi(info.is_terminal_stream())
        .with_writer(info.into_make_writer())
        .with_filter(filter_fn(|meta| *meta.level() > Level::WARN));

    let error_layer = tracing_subscriber::fmt::layer()
        .with_ansi(error.is_terminal_stream())
        .with_writer(error.into_make_writer())
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(level)
        .with(info_layer)
        .with(error_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_log_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/logs/access.log");
        let file = open_log_file(path.to_str().unwrap());
        assert!(file.is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_target_fallback() {
        let target = LogTarget::open(None, LogTarget::Stderr).unwrap();
        assert!(target.is_terminal_stream());
    }
}
