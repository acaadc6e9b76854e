//! Error types for the instance state file.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for state file operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while reading or writing the state file.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("state file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
