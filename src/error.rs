//! Error types for the trawl crate.

use thiserror::Error;

/// Errors surfaced by indexing, persistence, and query evaluation.
///
/// Invariant violations inside the index data model (size drift between a
/// container and its posting-list set, duplicate doc ids on a complete-entry
/// insert) are not represented here; those abort the process with a
/// diagnostic.
#[derive(Error, Debug)]
pub enum TrawlError {
    /// I/O error from the filesystem or a socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// On-disk index data that cannot be parsed back.
    #[error("corrupt index data: {0}")]
    Corrupt(String),

    /// A caller supplied something unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A filter name with no registered factory.
    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    /// A ranking engine name with no registered implementation.
    #[error("unknown ranking engine: {0}")]
    UnknownEngine(String),
}

impl TrawlError {
    /// Create a corrupt-data error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        TrawlError::Corrupt(msg.into())
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        TrawlError::InvalidArgument(msg.into())
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TrawlError>;
