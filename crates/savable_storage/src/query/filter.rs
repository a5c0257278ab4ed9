//! Filter primitives and the AND/OR grouping rule.

use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The logical slot of a row a filter or projection addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    /// The object id the row belongs to.
    RowId,
    /// The field name within the object.
    Key,
    /// The (typed) field value.
    Value,
}

impl Column {
    /// All columns in storage order.
    pub const ALL: [Column; 3] = [Column::RowId, Column::Key, Column::Value];

    /// Stable lowercase name, also used as the SQL column and document field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Column::RowId => "row_id",
            Column::Key => "key",
            Column::Value => "value",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Column {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "row_id" | "rowid" | "id" => Ok(Column::RowId),
            "key" => Ok(Column::Key),
            "value" => Ok(Column::Value),
            other => Err(StorageError::invalid_query(format!("unknown column {other:?}"))),
        }
    }
}

/// How a stored string is compared with a filter operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterType {
    /// Stored value begins with the operand.
    StartsWith,
    /// Stored value equals the operand.
    ExactMatch,
    /// Stored value ends with the operand.
    EndsWith,
}

impl FilterType {
    /// Reference predicate. All engines must agree with this byte for byte.
    pub fn matches(self, stored: &str, operand: &str) -> bool {
        match self {
            FilterType::StartsWith => stored.as_bytes().starts_with(operand.as_bytes()),
            FilterType::ExactMatch => stored.as_bytes() == operand.as_bytes(),
            FilterType::EndsWith => stored.as_bytes().ends_with(operand.as_bytes()),
        }
    }
}

impl FromStr for FilterType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "starts_with" | "prefix" => Ok(FilterType::StartsWith),
            "exact_match" | "exact" | "eq" => Ok(FilterType::ExactMatch),
            "ends_with" | "suffix" => Ok(FilterType::EndsWith),
            other => Err(StorageError::invalid_query(format!(
                "unknown filter type {other:?}"
            ))),
        }
    }
}

/// How a filter joins the filters before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Extends the current conjunction group.
    And,
    /// Closes the current group and starts a new one.
    Or,
    /// Starts the first group.
    Init,
}

/// One comparison of a row column against a string operand.
///
/// The operand is always the string form of the value; non-string operands
/// are stringified by the caller before the filter is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterQuery {
    /// Column being compared.
    pub column: Column,
    /// Operand, already in stored string form.
    pub value: String,
    /// Comparison kind.
    pub filter_type: FilterType,
    /// How this filter joins the previous ones.
    pub operator: FilterOperator,
}

impl FilterQuery {
    /// Creates a filter.
    pub fn new(
        column: Column,
        value: impl Into<String>,
        filter_type: FilterType,
        operator: FilterOperator,
    ) -> Self {
        Self {
            column,
            value: value.into(),
            filter_type,
            operator,
        }
    }

    /// An `Init` exact-match filter.
    pub fn exact(column: Column, value: impl Into<String>) -> Self {
        Self::new(column, value, FilterType::ExactMatch, FilterOperator::Init)
    }

    /// An `Init` prefix filter.
    pub fn starts_with(column: Column, value: impl Into<String>) -> Self {
        Self::new(column, value, FilterType::StartsWith, FilterOperator::Init)
    }

    /// An `Init` suffix filter.
    pub fn ends_with(column: Column, value: impl Into<String>) -> Self {
        Self::new(column, value, FilterType::EndsWith, FilterOperator::Init)
    }

    /// Returns the filter with a different operator.
    #[must_use]
    pub fn with_operator(mut self, operator: FilterOperator) -> Self {
        self.operator = operator;
        self
    }

    /// Evaluates this single filter against a row.
    pub fn matches<R: RowView + ?Sized>(&self, row: &R) -> bool {
        self.filter_type.matches(row.column(self.column), &self.value)
    }
}

/// Read access to the three logical columns of a stored row.
///
/// For [`Column::Value`] this is the stored payload string.
pub trait RowView {
    /// Returns the stored string for `column`.
    fn column(&self, column: Column) -> &str;
}

/// An ordered filter chain.
///
/// Grouping rule: the first filter starts a conjunction group, every `And`
/// filter extends the current group, every `Or` filter closes it and starts
/// a new one. A row matches when it matches every filter of at least one
/// group. The empty chain matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterChain {
    filters: Vec<FilterQuery>,
}

impl FilterChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter as given.
    pub fn push(&mut self, filter: FilterQuery) {
        self.filters.push(filter);
    }

    /// Appends a filter joined with `And` (`Init` if the chain is empty).
    pub fn push_and(&mut self, column: Column, filter_type: FilterType, value: impl Into<String>) {
        let operator = self.next_operator(FilterOperator::And);
        self.push(FilterQuery::new(column, value, filter_type, operator));
    }

    /// Appends a filter joined with `Or` (`Init` if the chain is empty).
    pub fn push_or(&mut self, column: Column, filter_type: FilterType, value: impl Into<String>) {
        let operator = self.next_operator(FilterOperator::Or);
        self.push(FilterQuery::new(column, value, filter_type, operator));
    }

    fn next_operator(&self, wanted: FilterOperator) -> FilterOperator {
        if self.filters.is_empty() {
            FilterOperator::Init
        } else {
            wanted
        }
    }

    /// Builder form of [`push_and`](Self::push_and).
    #[must_use]
    pub fn and(mut self, column: Column, filter_type: FilterType, value: impl Into<String>) -> Self {
        self.push_and(column, filter_type, value);
        self
    }

    /// Builder form of [`push_or`](Self::push_or).
    #[must_use]
    pub fn or(mut self, column: Column, filter_type: FilterType, value: impl Into<String>) -> Self {
        self.push_or(column, filter_type, value);
        self
    }

    /// Chain selecting every row of one object.
    #[must_use]
    pub fn object(object_id: &str) -> Self {
        Self::new().and(Column::RowId, FilterType::ExactMatch, object_id)
    }

    /// Chain selecting a single `(object_id, key)` row.
    #[must_use]
    pub fn object_key(object_id: &str, key: &str) -> Self {
        Self::object(object_id).and(Column::Key, FilterType::ExactMatch, key)
    }

    /// Returns true if the chain has no filters.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// The filters in order.
    pub fn filters(&self) -> &[FilterQuery] {
        &self.filters
    }

    /// Splits the chain into its conjunction groups.
    ///
    /// A filter carrying `Or` at the head of the chain behaves like `Init`,
    /// so no empty group is ever produced.
    pub fn groups(&self) -> Vec<Vec<&FilterQuery>> {
        let mut groups: Vec<Vec<&FilterQuery>> = Vec::new();
        let mut current: Vec<&FilterQuery> = Vec::new();

        for filter in &self.filters {
            if filter.operator == FilterOperator::Or && !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
            current.push(filter);
        }
        if !current.is_empty() {
            groups.push(current);
        }
        groups
    }

    /// Evaluates the whole chain against a row.
    pub fn matches<R: RowView + ?Sized>(&self, row: &R) -> bool {
        if self.filters.is_empty() {
            return true;
        }
        self.groups()
            .iter()
            .any(|group| group.iter().all(|filter| filter.matches(row)))
    }
}

impl From<Vec<FilterQuery>> for FilterChain {
    fn from(filters: Vec<FilterQuery>) -> Self {
        Self { filters }
    }
}

impl FromIterator<FilterQuery> for FilterChain {
    fn from_iter<I: IntoIterator<Item = FilterQuery>>(iter: I) -> Self {
        Self {
            filters: iter.into_iter().collect(),
        }
    }
}
