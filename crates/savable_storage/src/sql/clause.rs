//! Compiles filter chains into parameterized SQL.

use super::pattern::to_pattern;
use crate::query::{Assignment, Column, FilterChain};

/// A SQL fragment with its positional parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clause {
    /// SQL text using `?` placeholders.
    pub sql: String,
    /// Parameters, in placeholder order.
    pub params: Vec<String>,
}

/// Quoted SQL identifier of a column.
pub fn column_sql(column: Column) -> &'static str {
    match column {
        Column::RowId => "\"row_id\"",
        Column::Key => "\"key\"",
        Column::Value => "\"value\"",
    }
}

/// Builds ` WHERE (a AND b) OR (c)`; empty for an empty chain.
pub fn where_clause(filters: &FilterChain) -> Clause {
    let groups = filters.groups();
    if groups.is_empty() {
        return Clause::default();
    }

    let mut params = Vec::with_capacity(filters.len());
    let disjuncts: Vec<String> = groups
        .iter()
        .map(|group| {
            let conjuncts: Vec<String> = group
                .iter()
                .map(|filter| {
                    params.push(to_pattern(filter.filter_type, &filter.value));
                    format!("{} REGEXP ?", column_sql(filter.column))
                })
                .collect();
            format!("({})", conjuncts.join(" AND "))
        })
        .collect();

    Clause {
        sql: format!(" WHERE {}", disjuncts.join(" OR ")),
        params,
    }
}

/// Builds `"value" = ?, "type" = ?, …` for an update.
pub fn set_clause(assignments: &[Assignment]) -> Clause {
    let mut parts = Vec::with_capacity(assignments.len() + 1);
    let mut params = Vec::with_capacity(assignments.len() + 1);
    for assignment in assignments {
        parts.push(format!("{} = ?", column_sql(assignment.column)));
        params.push(assignment.text.clone());
        if let Some(type_name) = &assignment.type_name {
            parts.push("\"type\" = ?".to_string());
            params.push(type_name.clone());
        }
    }
    Clause {
        sql: parts.join(", "),
        params,
    }
}
