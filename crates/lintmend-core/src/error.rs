//! Error types for Lintmend.
//!
//! A single crate-wide error enum keeps the CLI and the library surfaces on
//! one `Result` alias. Variants carry the path or remote location they refer
//! to so failures in a deep lookup stay diagnosable.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Lintmend operations.
#[derive(Debug, Error)]
pub enum LintmendError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Checkstyle errors
    #[error("Checkstyle invocation failed: {message}")]
    CheckstyleFailed { message: String },

    #[error("Malformed checkstyle report: {message}")]
    MalformedReport { message: String },

    // Remote store errors
    #[error("Remote store error: {message}")]
    Remote {
        message: String,
        #[source]
        source: Option<ssh2::Error>,
    },

    #[error("Remote path not found: {0}")]
    RemoteNotFound(String),

    // Cache errors
    #[error("Incomplete release {release}: expected {expected} files, found {found}")]
    IncompleteRelease {
        release: u64,
        expected: usize,
        found: usize,
    },

    // Training errors
    #[error("Training failed for {project}: {message}")]
    TrainingFailed { project: String, message: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid project slug: {0}")]
    InvalidProjectSlug(String),

    #[error("Unknown protocol: {0}")]
    UnknownProtocol(String),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Lintmend operations.
pub type Result<T> = std::result::Result<T, LintmendError>;

// Conversion implementations for common error types

impl From<std::io::Error> for LintmendError {
    fn from(err: std::io::Error) -> Self {
        LintmendError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for LintmendError {
    fn from(err: serde_json::Error) -> Self {
        LintmendError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<ssh2::Error> for LintmendError {
    fn from(err: ssh2::Error) -> Self {
        LintmendError::Remote {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl LintmendError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        LintmendError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }
}
