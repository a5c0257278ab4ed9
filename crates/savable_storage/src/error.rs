//! Error types for storage operations.

use savable_codec::CodecError;
use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while translating or executing a query.
///
/// Every engine reports its driver failures through this one type so that
/// callers never need to know which engine they talk to. Nothing in this
/// crate retries on error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The SQLite driver reported an error.
    #[error("sql error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The document store reported an error.
    #[error("document store error: {0}")]
    Document(#[from] sled::Error),

    /// A stored document could not be (de)serialized.
    #[error("document encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// Persisted data could not be parsed.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// The query cannot be executed as built.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A value could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl StorageError {
    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }

    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }
}
