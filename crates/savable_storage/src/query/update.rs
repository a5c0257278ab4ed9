//! Update queries.

use super::filter::{Column, FilterChain, FilterQuery, FilterType};
use crate::error::{StorageError, StorageResult};
use savable_codec::{Value, ValueCodec};

/// Column assignments applied to every row matching a filter chain.
///
/// `RowId` and `Key` only take text; a `Value` assignment may hold any
/// [`Value`] and is serialized through the engine's codec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryUpdate {
    assignments: Vec<(Column, Value)>,
    filters: FilterChain,
}

/// A validated assignment with its value already in stored form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Target column.
    pub column: Column,
    /// New stored text (the payload for `Value`).
    pub text: String,
    /// New type name, only for `Value` assignments.
    pub type_name: Option<String>,
}

impl QueryUpdate {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an assignment.
    #[must_use]
    pub fn set(mut self, column: Column, value: impl Into<Value>) -> Self {
        self.assignments.push((column, value.into()));
        self
    }

    /// Appends a filter as given.
    #[must_use]
    pub fn filter(mut self, filter: FilterQuery) -> Self {
        self.filters.push(filter);
        self
    }

    /// Appends a filter joined with `And`.
    #[must_use]
    pub fn and(mut self, column: Column, filter_type: FilterType, value: impl Into<String>) -> Self {
        self.filters.push_and(column, filter_type, value);
        self
    }

    /// Appends a filter joined with `Or`.
    #[must_use]
    pub fn or(mut self, column: Column, filter_type: FilterType, value: impl Into<String>) -> Self {
        self.filters.push_or(column, filter_type, value);
        self
    }

    /// Replaces the filter chain.
    #[must_use]
    pub fn with_filters(mut self, filters: FilterChain) -> Self {
        self.filters = filters;
        self
    }

    /// The raw assignments.
    pub fn assignments(&self) -> &[(Column, Value)] {
        &self.assignments
    }

    /// The filter chain.
    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// Validates the assignments and encodes them into stored form.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidQuery`] if there are no assignments or
    /// a non-text value is assigned to `RowId` or `Key`, and
    /// [`StorageError::Codec`] if a value cannot be serialized.
    pub fn encode(&self, codec: &ValueCodec) -> StorageResult<Vec<Assignment>> {
        if self.assignments.is_empty() {
            return Err(StorageError::invalid_query("update without assignments"));
        }

        self.assignments
            .iter()
            .map(|(column, value)| match column {
                Column::Value => {
                    let (type_name, payload) = codec.serialize(value)?;
                    Ok(Assignment {
                        column: Column::Value,
                        text: payload,
                        type_name: Some(type_name),
                    })
                }
                Column::RowId | Column::Key => match value {
                    Value::Text(text) => Ok(Assignment {
                        column: *column,
                        text: text.clone(),
                        type_name: None,
                    }),
                    other => Err(StorageError::invalid_query(format!(
                        "column {column} only takes text, got {}",
                        other.type_name()
                    ))),
                },
            })
            .collect()
    }
}
