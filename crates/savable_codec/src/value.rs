//! Dynamic value type stored in the VALUE slot of a row.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Type name of [`Value::Text`].
pub const TYPE_STRING: &str = "string";
/// Type name of [`Value::Integer`].
pub const TYPE_INT: &str = "int";
/// Type name of [`Value::Float`].
pub const TYPE_FLOAT: &str = "float";
/// Type name of [`Value::Bool`].
pub const TYPE_BOOL: &str = "bool";
/// Type name of [`Value::Uuid`].
pub const TYPE_UUID: &str = "uuid";

/// A typed value that can live in the VALUE slot of a row.
///
/// Every variant has a stable type name and a textual payload, see
/// [`crate::ValueCodec`]. Values of types registered at runtime travel as
/// [`Value::Tagged`] so that they survive a read/write cycle untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// UTF-8 text.
    Text(String),
    /// Signed integer (full i64 range).
    Integer(i64),
    /// Double precision float.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// UUID, stored hyphenated.
    Uuid(Uuid),
    /// A value of a type registered by the embedding application.
    Tagged {
        /// Registered type name.
        type_name: String,
        /// Opaque payload.
        payload: String,
    },
}

impl Value {
    /// Create a value of an application-registered type.
    pub fn tagged(type_name: impl Into<String>, payload: impl Into<String>) -> Self {
        Value::Tagged {
            type_name: type_name.into(),
            payload: payload.into(),
        }
    }

    /// The stable type name written next to the payload.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Text(_) => TYPE_STRING,
            Value::Integer(_) => TYPE_INT,
            Value::Float(_) => TYPE_FLOAT,
            Value::Bool(_) => TYPE_BOOL,
            Value::Uuid(_) => TYPE_UUID,
            Value::Tagged { type_name, .. } => type_name,
        }
    }

    /// The textual payload of this value.
    pub fn payload(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Uuid(u) => u.hyphenated().to_string(),
            Value::Tagged { payload, .. } => payload.clone(),
        }
    }

    /// Get this value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a float, if it is one.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as a UUID, if it is one.
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Consumes the value and returns its text, if it is text.
    pub fn into_text(self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.payload())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Text(s.clone())
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}
