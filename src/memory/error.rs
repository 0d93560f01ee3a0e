//! Error type for node store operations.

use thiserror::Error;

/// Errors reported by the memory store and its backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid node path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("node not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
