//! # Savable Storage
//!
//! The filter/query DSL and the storage engines behind Savable.
//!
//! Every engine stores rows of the shape `(object_id, key, value)` and
//! executes the same filter chains with the same results:
//!
//! - [`FlatFileBackend`] - one `<objectId>.<key>:<value>` line per row
//! - [`SqlBackend`] - SQLite, filters compiled to parameterized `WHERE`
//!   clauses
//! - [`DocumentBackend`] - sled tree of JSON documents, filters compiled to
//!   `$or`-of-`$and` document filters
//!
//! ## Filter semantics
//!
//! A chain is split into conjunction groups at every `Or` filter; a row
//! matches when it satisfies all filters of some group. `ExactMatch`,
//! `StartsWith` and `EndsWith` compare bytes. VALUE filters compare the
//! stored payload.
//!
//! ## Example
//!
//! ```rust
//! use savable_codec::{Value, ValueCodec};
//! use savable_storage::{Column, FilterType, Meta, QuerySelect, Row, SqlBackend};
//!
//! let backend = SqlBackend::open_in_memory("objects", ValueCodec::standard()).unwrap();
//! backend.insert(&[Row::new("user-1", "level", 3i64)]).unwrap();
//!
//! let query = QuerySelect::new()
//!     .column(Column::Value)
//!     .and(Column::RowId, FilterType::StartsWith, "user-")
//!     .and(Column::Key, FilterType::ExactMatch, "level");
//! let result = backend.select(&query).unwrap();
//! assert_eq!(result.rows, vec![vec![Value::Integer(3)]]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod document;
mod error;
mod flat_file;
pub mod query;
pub mod sql;

pub use backend::{project, Meta, QueryResult, Row, SkippedRow, StoredRow};
pub use document::{Condition, DocumentBackend, DocumentFilter, DEFAULT_TREE};
pub use error::{StorageError, StorageResult};
pub use flat_file::{format_line, parse_line, FlatFileBackend};
pub use query::{
    Assignment, Column, FilterChain, FilterOperator, FilterQuery, FilterType, QuerySelect,
    QueryUpdate, RowView,
};
pub use sql::{SqlBackend, DEFAULT_TABLE};
