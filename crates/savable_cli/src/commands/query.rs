//! Query command implementation.

use savable_storage::{Column, FilterChain, FilterType, Meta, QueryResult, QuerySelect};
use serde::Serialize;
use std::error::Error;

/// Query output.
#[derive(Debug, Serialize)]
pub struct QueryOutput {
    /// Returned columns.
    pub columns: Vec<String>,
    /// One cell per column, in stored text form.
    pub rows: Vec<Vec<String>>,
    /// Rows left out because their value could not be decoded.
    pub skipped: Vec<SkippedOutput>,
}

/// A row left out of the output.
#[derive(Debug, Serialize)]
pub struct SkippedOutput {
    /// Object id.
    pub object_id: String,
    /// Field name.
    pub key: String,
    /// Why the value could not be decoded.
    pub error: String,
}

impl From<QueryResult> for QueryOutput {
    fn from(result: QueryResult) -> Self {
        Self {
            columns: result.columns.iter().map(ToString::to_string).collect(),
            rows: result
                .rows
                .iter()
                .map(|cells| cells.iter().map(|cell| cell.payload()).collect())
                .collect(),
            skipped: result
                .skipped
                .into_iter()
                .map(|row| SkippedOutput {
                    object_id: row.object_id,
                    key: row.key,
                    error: row.error.to_string(),
                })
                .collect(),
        }
    }
}

/// Parses `[and:|or:]column:type:value` and appends it to `chain`.
///
/// The value is everything after the third separator, so it may itself
/// contain `:`.
pub fn push_filter(chain: &mut FilterChain, spec: &str) -> Result<(), Box<dyn Error>> {
    let (or, rest) = match spec.split_once(':') {
        Some(("or", rest)) => (true, rest),
        Some(("and", rest)) => (false, rest),
        _ => (false, spec),
    };

    let mut parts = rest.splitn(3, ':');
    let (Some(column), Some(filter_type), Some(value)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("Filter {spec:?} is not of the form column:type:value").into());
    };
    let column: Column = column.parse()?;
    let filter_type: FilterType = filter_type.parse()?;

    if or {
        chain.push_or(column, filter_type, value);
    } else {
        chain.push_and(column, filter_type, value);
    }
    Ok(())
}

/// Builds the select statement from command-line arguments.
pub fn build(filters: &[String], columns: &[String]) -> Result<QuerySelect, Box<dyn Error>> {
    let mut chain = FilterChain::new();
    for spec in filters {
        push_filter(&mut chain, spec)?;
    }
    let columns = columns
        .iter()
        .map(|name| name.parse::<Column>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(QuerySelect::new().columns(columns).with_filters(chain))
}

/// Runs the query command.
pub fn run(
    backend: &dyn Meta,
    filters: &[String],
    columns: &[String],
    format: &str,
) -> Result<(), Box<dyn Error>> {
    let query = build(filters, columns)?;
    let output = QueryOutput::from(backend.select(&query)?);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!("{}", output.columns.join("\t"));
            for row in &output.rows {
                println!("{}", row.join("\t"));
            }
            for skipped in &output.skipped {
                eprintln!("skipped {}.{}: {}", skipped.object_id, skipped.key, skipped.error);
            }
        }
    }

    Ok(())
}
