//! Error types
//!
//! `ServeError` covers everything that ends a single request with an error page,
//! `BuildError` the watcher lifecycle, `ConfigError` startup configuration.

use hyper::StatusCode;
use std::io;
use thiserror::Error;

/// Errors that terminate a single request with an HTML error page
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("request path contains a null byte")]
    NullByte,

    #[error("malicious path \"{0}\"")]
    Traversal(String),

    #[error("precondition failed")]
    PreconditionFailed,

    #[error("range not satisfiable for {size} byte artifact")]
    RangeNotSatisfiable { size: u64 },

    #[error("artifact unavailable: {0}")]
    NotFound(#[source] io::Error),

    #[error("failed to read artifact: {0}")]
    Stream(#[source] io::Error),
}

impl ServeError {
    /// Status code answered for this error
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NullByte => StatusCode::BAD_REQUEST,
            Self::Traversal(_) => StatusCode::FORBIDDEN,
            Self::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            Self::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Stream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Translate a filesystem error raised while opening or reading an artifact.
    ///
    /// Missing files, over-long names and non-directory path components mean
    /// the artifact vanished between resolution and reading (404); anything
    /// else is an internal failure (500).
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound
            | io::ErrorKind::NotADirectory
            | io::ErrorKind::InvalidFilename => Self::NotFound(err),
            _ => Self::Stream(err),
        }
    }
}

/// Errors from the compiler watch session
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("watch session already closed")]
    Closed,

    #[error("failed to start watching: {0}")]
    Watch(String),
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid address: {0}")]
    Address(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ServeError::NullByte.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServeError::Traversal("/../etc".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServeError::RangeNotSatisfiable { size: 10 }.status(),
            StatusCode::RANGE_NOT_SATISFIABLE
        );
    }

    #[test]
    fn test_io_translation() {
        let missing = io::Error::from(io::ErrorKind::NotFound);
        assert!(matches!(ServeError::from_io(missing), ServeError::NotFound(_)));

        let not_dir = io::Error::from(io::ErrorKind::NotADirectory);
        assert_eq!(ServeError::from_io(not_dir).status(), StatusCode::NOT_FOUND);

        let other = io::Error::other("test");
        assert!(matches!(ServeError::from_io(other), ServeError::Stream(_)));

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(
            ServeError::from_io(denied).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
