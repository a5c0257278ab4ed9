//! Property-based test generators using proptest.
//!
//! Alphabets are kept tiny so that generated filters hit generated rows
//! often, and free of the characters the flat file cannot store (`.` in
//! ids, `:` in keys, line breaks anywhere).

use proptest::prelude::*;
use savable_storage::{Column, FilterChain, FilterOperator, FilterQuery, FilterType, Row};
use std::collections::BTreeMap;

/// Strategy for object ids.
pub fn object_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ab][ab1]{0,2}").expect("Invalid regex")
}

/// Strategy for field names, list keys included.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("_?[kx]{1,2}").expect("Invalid regex")
}

/// Strategy for text payloads. Payloads may contain `.` and `:`.
pub fn payload_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ab.:]{0,3}").expect("Invalid regex")
}

/// Strategy for one text row.
pub fn row_strategy() -> impl Strategy<Value = Row> {
    (object_id_strategy(), key_strategy(), payload_strategy())
        .prop_map(|(object_id, key, payload)| Row::new(object_id, key, payload))
}

/// Strategy for a set of rows with distinct `(object_id, key)` identities,
/// in a stable order.
pub fn rows_strategy(max: usize) -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(row_strategy(), 0..=max).prop_map(|rows| {
        let unique: BTreeMap<(String, String), Row> = rows
            .into_iter()
            .map(|row| ((row.object_id.clone(), row.key.clone()), row))
            .collect();
        unique.into_values().collect()
    })
}

/// Strategy for a column.
pub fn column_strategy() -> impl Strategy<Value = Column> {
    prop_oneof![Just(Column::RowId), Just(Column::Key), Just(Column::Value)]
}

/// Strategy for a filter type.
pub fn filter_type_strategy() -> impl Strategy<Value = FilterType> {
    prop_oneof![
        Just(FilterType::StartsWith),
        Just(FilterType::ExactMatch),
        Just(FilterType::EndsWith),
    ]
}

/// Strategy for one filter. The operand alphabet covers every generated
/// id, key and payload, plus SQL pattern metacharacters.
pub fn filter_query_strategy() -> impl Strategy<Value = FilterQuery> {
    let operand = prop::string::string_regex("[abkx1_.:%]{0,2}").expect("Invalid regex");
    let operator = prop_oneof![
        Just(FilterOperator::And),
        Just(FilterOperator::Or),
        Just(FilterOperator::Init),
    ];
    (column_strategy(), operand, filter_type_strategy(), operator).prop_map(
        |(column, value, filter_type, operator)| FilterQuery::new(column, value, filter_type, operator),
    )
}

/// Strategy for filter chains of up to `max` filters. The first filter is
/// always `Init`; later filters may carry any operator.
pub fn filter_chain_strategy(max: usize) -> impl Strategy<Value = FilterChain> {
    prop::collection::vec(filter_query_strategy(), 0..=max).prop_map(|filters| {
        filters
            .into_iter()
            .enumerate()
            .map(|(i, filter)| {
                if i == 0 {
                    filter.with_operator(FilterOperator::Init)
                } else {
                    filter
                }
            })
            .collect()
    })
}
