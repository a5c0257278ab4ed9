//! Error types for the Savable core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the object layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A storage engine failed. Never retried by the core.
    #[error("storage error: {0}")]
    Storage(#[from] savable_storage::StorageError),

    /// A stored value or list could not be decoded.
    #[error("codec error: {0}")]
    Codec(#[from] savable_codec::CodecError),

    /// I/O error outside of a storage engine.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A savable is missing required keys after setup.
    #[error("object {id} is missing required keys: {missing:?}")]
    Initialization {
        /// The object id.
        id: String,
        /// Keys that were required but absent.
        missing: Vec<String>,
    },

    /// A list listener rejected a mutation.
    #[error("list listener failed: {message}")]
    Listener {
        /// Description of the failure.
        message: String,
    },

    /// The object has been deleted.
    #[error("object {id} has been deleted")]
    ObjectDeleted {
        /// The object id.
        id: String,
    },

    /// Operation not permitted with these arguments or in this state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// Configuration could not be read or is inconsistent.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates a listener error.
    pub fn listener(message: impl Into<String>) -> Self {
        Self::Listener {
            message: message.into(),
        }
    }

    /// Creates an object deleted error.
    pub fn object_deleted(id: impl Into<String>) -> Self {
        Self::ObjectDeleted { id: id.into() }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
