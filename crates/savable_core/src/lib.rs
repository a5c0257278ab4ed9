//! # Savable Core
//!
//! Persisted objects over any Savable storage engine.
//!
//! - [`ObjectMeta`] reads and writes whole objects, single fields and lists
//! - [`SavableMap`] holds one object's scalars and lists in memory
//! - [`Savable`] binds a map to an id: create-or-load, write-through
//!   mutation, delete
//! - [`ObservableList`] reports each mutation to a listener and rolls back
//!   when the listener fails
//! - [`ObjectCache`] keeps non-persistent per-object values
//! - [`Config`] opens an engine from code or JSON
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use savable_codec::ValueCodec;
//! use savable_core::{Config, ObjectCache, ObjectMeta, Savable, SavableKind, SavableMap};
//!
//! struct Users;
//!
//! impl SavableKind for Users {
//!     fn save_id(&self) -> &str {
//!         "user-"
//!     }
//!
//!     fn default_data(&self, _raw_id: &str) -> SavableMap {
//!         SavableMap::new().with("level", "1")
//!     }
//! }
//!
//! let backend = Config::new().open(ValueCodec::standard()).unwrap();
//! let meta = Arc::new(ObjectMeta::new(backend));
//! let cache = Arc::new(ObjectCache::new());
//!
//! let mut user = Savable::setup(Arc::new(Users), meta.clone(), cache, "123", None).unwrap();
//! user.set("level", "2").unwrap();
//! user.put_list("tags", ["a", "b"]).unwrap();
//!
//! let stored = meta.get_data("user-123").unwrap().unwrap();
//! assert_eq!(stored.get("level"), Some("2"));
//! assert_eq!(stored.get("id"), Some("123"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod list;
mod map;
mod meta;
mod savable;

pub use cache::ObjectCache;
pub use config::{BackendConfig, Config};
pub use error::{CoreError, CoreResult};
pub use list::{ListAction, ListChange, ListMutation, ObservableList};
pub use map::{is_valid_key, list_storage_key, SavableMap, ID_KEY, LIST_PREFIX};
pub use meta::ObjectMeta;
pub use savable::{Savable, SavableKind, SavableState};

// Re-export the layers below for convenience.
pub use savable_codec::{CodecError, Value, ValueCodec};
pub use savable_storage::{Meta, StorageError};
