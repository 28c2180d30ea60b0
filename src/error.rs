//! Error types shared by the whole crate.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NetError>;

/// Everything that can go wrong while building, training or persisting a network.
#[derive(Error, Debug)]
pub enum NetError {
    /// The topology text describes an impossible network.
    #[error("invalid topology (line {line}): {message}")]
    Topology { line: usize, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The parameter stream ended before every bias and weight was read.
    #[error("parameter stream truncated: expected {expected} values, read {read}")]
    TruncatedParameters { expected: usize, read: usize },

    #[error("invalid dataset: {0}")]
    Dataset(String),

    #[error("shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("malformed log line: {0}")]
    Log(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NetError {
    pub(crate) fn topology(line: usize, message: impl Into<String>) -> Self {
        NetError::Topology {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        NetError::Config(message.into())
    }

    pub(crate) fn dataset(message: impl Into<String>) -> Self {
        NetError::Dataset(message.into())
    }
}
