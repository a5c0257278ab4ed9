//! Projection queries.

use super::filter::{Column, FilterChain, FilterQuery, FilterType};

/// A projection of some columns over the rows matching a filter chain.
///
/// ```
/// use savable_storage::{Column, FilterType, QuerySelect};
///
/// let query = QuerySelect::new()
///     .column(Column::Key)
///     .column(Column::Value)
///     .and(Column::RowId, FilterType::ExactMatch, "user-1");
/// assert_eq!(query.projection(), &[Column::Key, Column::Value]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySelect {
    columns: Vec<Column>,
    filters: FilterChain,
}

impl QuerySelect {
    /// Creates an empty select. With no columns requested, all three are
    /// projected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects all three columns in storage order.
    #[must_use]
    pub fn all() -> Self {
        Self::new().columns(Column::ALL)
    }

    /// Adds a projected column.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds several projected columns.
    #[must_use]
    pub fn columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.columns.extend(columns);
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

    /// The columns each result row carries, in order.
    pub fn projection(&self) -> &[Column] {
        if self.columns.is_empty() {
            &Column::ALL
        } else {
            &self.columns
        }
    }

    /// The filter chain.
    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FilterOperator;

    #[test]
    fn default_projection_is_all_columns() {
        assert_eq!(QuerySelect::new().projection(), &Column::ALL);
        assert_eq!(QuerySelect::all().projection(), &Column::ALL);
    }

    #[test]
    fn requested_order_is_kept() {
        let query = QuerySelect::new().column(Column::Value).column(Column::RowId);
        assert_eq!(query.projection(), &[Column::Value, Column::RowId]);
    }

    #[test]
    fn first_filter_is_init() {
        let query = QuerySelect::all()
            .or(Column::RowId, FilterType::StartsWith, "a")
            .and(Column::Key, FilterType::ExactMatch, "k");
        let filters = query.filters().filters();
        assert_eq!(filters[0].operator, FilterOperator::Init);
        assert_eq!(filters[1].operator, FilterOperator::And);
    }
}
