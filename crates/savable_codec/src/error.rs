//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding stored values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The stored type name is not present in the registry.
    ///
    /// This is recoverable: readers skip the affected cell instead of
    /// failing the whole result set.
    #[error("unknown value type: {type_name}")]
    UnknownType {
        /// The unresolved type name.
        type_name: String,
    },

    /// The payload could not be parsed as the named type.
    #[error("invalid {type_name} payload {payload:?}: {message}")]
    InvalidPayload {
        /// Type the payload claimed to be.
        type_name: String,
        /// The raw payload.
        payload: String,
        /// Parser message.
        message: String,
    },

    /// A tagged value reuses the name of a built-in type.
    #[error("type name {type_name} is reserved for built-in values")]
    ReservedType {
        /// The clashing type name.
        type_name: String,
    },

    /// A list value is not in `[a, b, c]` form.
    #[error("malformed list: {text:?}")]
    MalformedList {
        /// The offending text.
        text: String,
    },
}

impl CodecError {
    /// Create an unknown type error.
    pub fn unknown_type(type_name: impl Into<String>) -> Self {
        Self::UnknownType {
            type_name: type_name.into(),
        }
    }

    /// Create an invalid payload error.
    pub fn invalid_payload(
        type_name: impl Into<String>,
        payload: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self::InvalidPayload {
            type_name: type_name.into(),
            payload: payload.into(),
            message: message.to_string(),
        }
    }

    /// Create a reserved type error.
    pub fn reserved_type(type_name: impl Into<String>) -> Self {
        Self::ReservedType {
            type_name: type_name.into(),
        }
    }

    /// Create a malformed list error.
    pub fn malformed_list(text: impl Into<String>) -> Self {
        Self::MalformedList { text: text.into() }
    }

    /// Returns true if this error only concerns a single stored cell and
    /// the surrounding read may continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnknownType { .. } | Self::InvalidPayload { .. })
    }
}
