//! The filter/query DSL shared by every engine.
//!
//! - [`filter`]: columns, filter kinds, operators and the grouping rule
//! - [`select`]: projections
//! - [`update`]: column assignments

pub mod filter;
pub mod select;
pub mod update;

pub use filter::{Column, FilterChain, FilterOperator, FilterQuery, FilterType, RowView};
pub use select::QuerySelect;
pub use update::{Assignment, QueryUpdate};
