//! Type registry mapping stored type names to decoders.

use crate::error::{CodecError, CodecResult};
use crate::value::{Value, TYPE_BOOL, TYPE_FLOAT, TYPE_INT, TYPE_STRING, TYPE_UUID};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

const BUILTIN_TYPES: [&str; 5] = [TYPE_STRING, TYPE_INT, TYPE_FLOAT, TYPE_BOOL, TYPE_UUID];

/// Decodes a payload into a [`Value`].
pub type Decoder = Arc<dyn Fn(&str) -> CodecResult<Value> + Send + Sync>;

/// Bidirectional mapping between a [`Value`] and a `(type name, payload)`
/// pair.
///
/// The registry is built once (usually via [`ValueCodec::standard`]) and
/// then shared by every backend. Decoding a type name that is not
/// registered yields [`CodecError::UnknownType`], which readers treat as a
/// per-cell, recoverable failure.
///
/// # Example
///
/// ```
/// use savable_codec::{Value, ValueCodec};
///
/// let codec = ValueCodec::standard();
/// let (type_name, payload) = codec.serialize(&Value::Integer(42)).unwrap();
/// assert_eq!((type_name.as_str(), payload.as_str()), ("int", "42"));
/// assert_eq!(codec.deserialize(&type_name, &payload).unwrap(), Value::Integer(42));
/// ```
#[derive(Clone)]
pub struct ValueCodec {
    decoders: HashMap<String, Decoder>,
}

impl ValueCodec {
    /// Creates an empty registry. Nothing decodes until types are registered.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Creates a registry with the built-in types: `string`, `int`,
    /// `float`, `bool` and `uuid`.
    #[must_use]
    pub fn standard() -> Self {
        let mut codec = Self::empty();
        codec.register_decoder(TYPE_STRING, |payload| Ok(Value::Text(payload.to_string())));
        codec.register_decoder(TYPE_INT, |payload| {
            payload
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| CodecError::invalid_payload(TYPE_INT, payload, e))
        });
        codec.register_decoder(TYPE_FLOAT, |payload| {
            payload
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| CodecError::invalid_payload(TYPE_FLOAT, payload, e))
        });
        codec.register_decoder(TYPE_BOOL, |payload| match payload {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(CodecError::invalid_payload(
                TYPE_BOOL,
                payload,
                "expected true or false",
            )),
        });
        codec.register_decoder(TYPE_UUID, |payload| {
            Uuid::parse_str(payload)
                .map(Value::Uuid)
                .map_err(|e| CodecError::invalid_payload(TYPE_UUID, payload, e))
        });
        codec
    }

    /// Registers an application type whose values are carried as
    /// [`Value::Tagged`] with the payload kept verbatim.
    pub fn register(&mut self, type_name: &str) {
        let name = type_name.to_string();
        self.register_decoder(type_name, move |payload| {
            Ok(Value::tagged(name.clone(), payload))
        });
    }

    /// Registers a custom decoder for `type_name`, replacing any previous one.
    pub fn register_decoder<F>(&mut self, type_name: &str, decoder: F)
    where
        F: Fn(&str) -> CodecResult<Value> + Send + Sync + 'static,
    {
        self.decoders.insert(type_name.to_string(), Arc::new(decoder));
    }

    /// Removes a type from the registry. Returns true if it was registered.
    pub fn unregister(&mut self, type_name: &str) -> bool {
        self.decoders.remove(type_name).is_some()
    }

    /// Returns true if `type_name` can be decoded.
    pub fn is_registered(&self, type_name: &str) -> bool {
        self.decoders.contains_key(type_name)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Serializes a value into its `(type name, payload)` pair.
    ///
    /// Only values this registry can read back are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownType`] if the value's type is not
    /// registered and [`CodecError::ReservedType`] if a [`Value::Tagged`]
    /// carries the name of a built-in type.
    pub fn serialize(&self, value: &Value) -> CodecResult<(String, String)> {
        let type_name = value.type_name();
        if matches!(value, Value::Tagged { .. }) && BUILTIN_TYPES.contains(&type_name) {
            return Err(CodecError::reserved_type(type_name));
        }
        if !self.is_registered(type_name) {
            return Err(CodecError::unknown_type(type_name));
        }
        Ok((type_name.to_string(), value.payload()))
    }

    /// Deserializes a `(type name, payload)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownType`] if the type is not registered and
    /// [`CodecError::InvalidPayload`] if the payload does not parse.
    pub fn deserialize(&self, type_name: &str, payload: &str) -> CodecResult<Value> {
        let decoder = self
            .decoders
            .get(type_name)
            .ok_or_else(|| CodecError::unknown_type(type_name))?;
        decoder(payload)
    }
}

impl Default for ValueCodec {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for ValueCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCodec")
            .field("types", &self.type_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip(value: Value) {
        let codec = ValueCodec::standard();
        let (type_name, payload) = codec.serialize(&value).unwrap();
        assert_eq!(codec.deserialize(&type_name, &payload).unwrap(), value);
    }

    #[test]
    fn roundtrip_string() {
        roundtrip(Value::Text("hello world".to_string()));
        roundtrip(Value::Text(String::new()));
        roundtrip(Value::Text("[a, b]:.".to_string()));
    }

    #[test]
    fn roundtrip_integer() {
        roundtrip(Value::Integer(42));
        roundtrip(Value::Integer(-100));
        roundtrip(Value::Integer(i64::MIN));
        roundtrip(Value::Integer(i64::MAX));
    }

    #[test]
    fn roundtrip_bool() {
        roundtrip(Value::Bool(true));
        roundtrip(Value::Bool(false));
    }

    #[test]
    fn roundtrip_float_and_uuid() {
        roundtrip(Value::Float(0.1));
        roundtrip(Value::Float(-1.0e300));
        roundtrip(Value::Uuid(Uuid::new_v4()));
    }

    #[test]
    fn roundtrip_registered_tag() {
        let mut codec = ValueCodec::standard();
        codec.register("rank");
        let value = Value::tagged("rank", "moderator");
        let (type_name, payload) = codec.serialize(&value).unwrap();
        assert_eq!(type_name, "rank");
        assert_eq!(codec.deserialize(&type_name, &payload).unwrap(), value);
    }

    #[test]
    fn unknown_type_is_recoverable() {
        let mut codec = ValueCodec::standard();
        codec.register("rank");
        assert!(codec.unregister("rank"));

        let err = codec.deserialize("rank", "admin").unwrap_err();
        assert_eq!(err, CodecError::unknown_type("rank"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn serialize_rejects_unreadable_values() {
        let mut codec = ValueCodec::standard();
        assert_eq!(
            codec.serialize(&Value::tagged("rank", "admin")),
            Err(CodecError::unknown_type("rank"))
        );
        assert_eq!(
            codec.serialize(&Value::tagged("int", "admin")),
            Err(CodecError::reserved_type("int"))
        );

        codec.register("rank");
        assert!(codec.serialize(&Value::tagged("rank", "admin")).is_ok());
        assert!(ValueCodec::empty().serialize(&Value::Integer(1)).is_err());
    }

    #[test]
    fn invalid_payloads() {
        let codec = ValueCodec::standard();
        assert!(matches!(
            codec.deserialize("int", "forty"),
            Err(CodecError::InvalidPayload { .. })
        ));
        assert!(matches!(
            codec.deserialize("bool", "yes"),
            Err(CodecError::InvalidPayload { .. })
        ));
        assert!(matches!(
            codec.deserialize("uuid", "not-a-uuid"),
            Err(CodecError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn empty_registry_decodes_nothing() {
        let codec = ValueCodec::empty();
        assert!(codec.type_names().is_empty());
        assert!(codec.deserialize("string", "x").is_err());
    }

    #[test]
    fn standard_type_names() {
        let codec = ValueCodec::standard();
        assert_eq!(
            codec.type_names(),
            vec!["bool", "float", "int", "string", "uuid"]
        );
    }

    proptest! {
        #[test]
        fn prop_roundtrip_text(s in ".*") {
            roundtrip(Value::Text(s));
        }

        #[test]
        fn prop_roundtrip_integer(n in any::<i64>()) {
            roundtrip(Value::Integer(n));
        }

        #[test]
        fn prop_roundtrip_finite_float(f in any::<f64>().prop_filter("finite", |f| f.is_finite())) {
            roundtrip(Value::Float(f));
        }
    }
}
