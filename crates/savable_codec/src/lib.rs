//! # Savable Codec
//!
//! Typed value codec for the Savable persistence layer.
//!
//! A single VALUE slot holds values of different types. Every value is
//! stored as a `(type name, payload)` pair of strings:
//!
//! - Built-in types: `string`, `int`, `float`, `bool`, `uuid`
//! - Application types are registered by name and carried as
//!   [`Value::Tagged`]
//! - Unknown type names decode to a recoverable [`CodecError::UnknownType`]
//!
//! List-valued keys use a separate textual encoding, `[a, b, c]`, see
//! [`encode_list`] and [`decode_list`].
//!
//! ## Usage
//!
//! ```
//! use savable_codec::{Value, ValueCodec};
//!
//! let codec = ValueCodec::standard();
//! let (type_name, payload) = codec.serialize(&Value::Bool(true)).unwrap();
//! let decoded = codec.deserialize(&type_name, &payload).unwrap();
//! assert_eq!(decoded, Value::Bool(true));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod list;
mod registry;
mod value;

pub use error::{CodecError, CodecResult};
pub use list::{decode_list, encode_list};
pub use registry::{Decoder, ValueCodec};
pub use value::{Value, TYPE_BOOL, TYPE_FLOAT, TYPE_INT, TYPE_STRING, TYPE_UUID};
