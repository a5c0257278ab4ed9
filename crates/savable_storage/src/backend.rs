//! The engine-neutral query contract.

use crate::error::{StorageError, StorageResult};
use crate::query::{Assignment, Column, FilterChain, QuerySelect, QueryUpdate, RowView};
use savable_codec::{CodecError, Value, ValueCodec, TYPE_STRING};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A logical row: one field of one object.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Object the field belongs to.
    pub object_id: String,
    /// Field name.
    pub key: String,
    /// Field value.
    pub value: Value,
}

impl Row {
    /// Creates a row.
    pub fn new(object_id: impl Into<String>, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            object_id: object_id.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A row as an engine stores it: the value split into type name and payload.
///
/// This is also the document shape of [`crate::DocumentBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRow {
    /// Object id.
    #[serde(rename = "row_id")]
    pub object_id: String,
    /// Field name.
    pub key: String,
    /// Registered type name of the value.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Serialized value.
    #[serde(rename = "value")]
    pub payload: String,
}

impl StoredRow {
    /// Creates a stored row holding a plain string.
    pub fn text(object_id: impl Into<String>, key: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            key: key.into(),
            type_name: TYPE_STRING.to_string(),
            payload: payload.into(),
        }
    }

    /// Serializes a logical row.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Codec`] if the value's type cannot be read
    /// back by `codec`.
    pub fn encode(codec: &ValueCodec, row: &Row) -> StorageResult<Self> {
        let (type_name, payload) = codec.serialize(&row.value)?;
        Ok(Self {
            object_id: row.object_id.clone(),
            key: row.key.clone(),
            type_name,
            payload,
        })
    }

    /// Applies validated assignments in order.
    pub fn apply(&mut self, assignments: &[Assignment]) {
        for assignment in assignments {
            match assignment.column {
                Column::RowId => self.object_id.clone_from(&assignment.text),
                Column::Key => self.key.clone_from(&assignment.text),
                Column::Value => {
                    self.payload.clone_from(&assignment.text);
                    if let Some(type_name) = &assignment.type_name {
                        self.type_name.clone_from(type_name);
                    }
                }
            }
        }
    }

    /// Returns true if both rows address the same `(object_id, key)`.
    pub fn same_identity(&self, other: &StoredRow) -> bool {
        self.object_id == other.object_id && self.key == other.key
    }
}

impl RowView for StoredRow {
    fn column(&self, column: Column) -> &str {
        match column {
            Column::RowId => &self.object_id,
            Column::Key => &self.key,
            Column::Value => &self.payload,
        }
    }
}

/// A matched row left out of a result because its value could not be
/// decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// Object id of the row.
    pub object_id: String,
    /// Field name of the row.
    pub key: String,
    /// The stored type name.
    pub type_name: String,
    /// Why decoding failed.
    pub error: CodecError,
}

/// Result of a [`QuerySelect`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Columns of every row, in requested order.
    pub columns: Vec<Column>,
    /// One cell per requested column. `RowId` and `Key` cells are text.
    pub rows: Vec<Vec<Value>>,
    /// Matched rows whose value could not be decoded.
    pub skipped: Vec<SkippedRow>,
}

impl QueryResult {
    /// Number of returned rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no rows were returned.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns true if every matched row was returned.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Cells of one column across all rows, or `None` if it was not projected.
    pub fn column_values(&self, column: Column) -> Option<Vec<&Value>> {
        let index = self.columns.iter().position(|c| *c == column)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }
}

/// Builds a [`QueryResult`] from matched rows.
///
/// VALUE cells are decoded through `codec`; a row whose value cannot be
/// decoded is recorded in [`QueryResult::skipped`] and logged, the rest of
/// the result is unaffected.
pub fn project(codec: &ValueCodec, columns: &[Column], rows: Vec<StoredRow>) -> QueryResult {
    let decode_values = columns.contains(&Column::Value);
    let mut result = QueryResult {
        columns: columns.to_vec(),
        rows: Vec::with_capacity(rows.len()),
        skipped: Vec::new(),
    };

    for row in rows {
        let value = if decode_values {
            match codec.deserialize(&row.type_name, &row.payload) {
                Ok(value) => Some(value),
                Err(error) => {
                    warn!(
                        object_id = %row.object_id,
                        key = %row.key,
                        type_name = %row.type_name,
                        %error,
                        "skipping row with undecodable value"
                    );
                    result.skipped.push(SkippedRow {
                        object_id: row.object_id,
                        key: row.key,
                        type_name: row.type_name,
                        error,
                    });
                    continue;
                }
            }
        } else {
            None
        };

        let cells = columns
            .iter()
            .map(|column| match column {
                Column::RowId => Value::Text(row.object_id.clone()),
                Column::Key => Value::Text(row.key.clone()),
                Column::Value => value
                    .clone()
                    .unwrap_or_else(|| Value::Text(row.payload.clone())),
            })
            .collect();
        result.rows.push(cells);
    }

    result
}

/// A storage engine speaking the shared query contract.
///
/// Rows are `(object_id, key, value)` triples identified by
/// `(object_id, key)`: inserting a row whose identity already exists
/// replaces it. All operations block the calling thread and surface every
/// driver failure as a [`StorageError`]; nothing is retried.
///
/// # Implementors
///
/// - [`crate::FlatFileBackend`] - line-oriented text file
/// - [`crate::SqlBackend`] - SQLite through prepared statements
/// - [`crate::DocumentBackend`] - sled tree of JSON documents
pub trait Meta: Send + Sync {
    /// Short engine name for logs.
    fn backend_name(&self) -> &'static str;

    /// The codec used for the VALUE column.
    fn codec(&self) -> &ValueCodec;

    /// Returns every stored row matching the chain, undecoded.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to execute the query.
    fn fetch(&self, filters: &FilterChain) -> StorageResult<Vec<StoredRow>>;

    /// Applies `query` to every matching row and returns how many rows
    /// matched.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidQuery`] for malformed assignments, or
    /// an engine error.
    fn update(&self, query: &QueryUpdate) -> StorageResult<usize>;

    /// Inserts rows, replacing rows with the same `(object_id, key)`.
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to write.
    fn insert(&self, rows: &[Row]) -> StorageResult<usize>;

    /// Deletes every row matching the chain and returns how many were
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to write.
    fn delete(&self, filters: &FilterChain) -> StorageResult<usize>;

    /// Runs a projection query.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails; undecodable values are not
    /// errors, see [`QueryResult::skipped`].
    fn select(&self, query: &QuerySelect) -> StorageResult<QueryResult> {
        let rows = self.fetch(query.filters())?;
        Ok(project(self.codec(), query.projection(), rows))
    }

    /// Number of rows matching the chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    fn count(&self, filters: &FilterChain) -> StorageResult<usize> {
        Ok(self.fetch(filters)?.len())
    }

    /// Reads one field of one object.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Codec`] if the stored value cannot be decoded.
    fn get_value(&self, object_id: &str, key: &str) -> StorageResult<Option<Value>> {
        let query = QuerySelect::new()
            .column(Column::Value)
            .with_filters(FilterChain::object_key(object_id, key));
        let mut result = self.select(&query)?;
        if let Some(skipped) = result.skipped.pop() {
            return Err(StorageError::Codec(skipped.error));
        }
        Ok(result.rows.pop().and_then(|mut cells| cells.pop()))
    }

    /// Writes one field of one object, updating it in place or inserting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    fn set_value(&self, object_id: &str, key: &str, value: &Value) -> StorageResult<()> {
        let update = QueryUpdate::new()
            .set(Column::Value, value.clone())
            .with_filters(FilterChain::object_key(object_id, key));
        if self.update(&update)? == 0 {
            self.insert(&[Row::new(object_id, key, value.clone())])?;
        }
        Ok(())
    }

    /// Removes one field of one object. Returns true if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    fn remove_key(&self, object_id: &str, key: &str) -> StorageResult<bool> {
        Ok(self.delete(&FilterChain::object_key(object_id, key))? > 0)
    }

    /// Removes every field of one object. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    fn purge(&self, object_id: &str) -> StorageResult<usize> {
        self.delete(&FilterChain::object(object_id))
    }
}
