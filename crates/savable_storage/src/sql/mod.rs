//! Relational engine on SQLite.
//!
//! - [`clause`]: filter chain to `WHERE` compilation
//! - [`pattern`]: the `REGEXP` pattern language and its SQL function

pub mod clause;
pub mod pattern;

use crate::backend::{Meta, Row, StoredRow};
use crate::error::{StorageError, StorageResult};
use crate::query::{FilterChain, QueryUpdate};
use clause::{set_clause, where_clause};
use parking_lot::Mutex;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, params_from_iter, Connection};
use savable_codec::ValueCodec;
use std::path::Path;
use tracing::debug;

/// Default table name.
pub const DEFAULT_TABLE: &str = "savable";

/// A SQLite engine storing rows in one table.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE <table> (
///     row_id TEXT NOT NULL,
///     key    TEXT NOT NULL,
///     type   TEXT NOT NULL DEFAULT 'string',
///     value  TEXT NOT NULL,
///     PRIMARY KEY (row_id, key)
/// )
/// ```
///
/// Filters compile to `col REGEXP ?` predicates, `AND`-joined inside a
/// group and `OR`-joined across groups. Every statement is prepared through
/// the connection's statement cache and all operands are bound, never
/// interpolated.
///
/// # Thread Safety
///
/// The connection sits behind a mutex; SQLite does the rest.
pub struct SqlBackend {
    conn: Mutex<Connection>,
    table: String,
    codec: ValueCodec,
}

impl SqlBackend {
    /// Opens or creates a database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened, the table name is
    /// invalid, or the schema cannot be created.
    pub fn open(path: &Path, table: &str, codec: ValueCodec) -> StorageResult<Self> {
        Self::with_connection(Connection::open(path)?, table, codec)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory(table: &str, codec: ValueCodec) -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, table, codec)
    }

    /// Wraps an existing connection, creating the table if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the table name is invalid or the schema cannot be
    /// created.
    pub fn with_connection(conn: Connection, table: &str, codec: ValueCodec) -> StorageResult<Self> {
        validate_table_name(table)?;
        conn.create_scalar_function(
            "regexp",
            2,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            pattern::regexp,
        )?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                \"row_id\" TEXT NOT NULL,
                \"key\" TEXT NOT NULL,
                \"type\" TEXT NOT NULL DEFAULT 'string',
                \"value\" TEXT NOT NULL,
                PRIMARY KEY (\"row_id\", \"key\")
            )"
        ))?;

        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
            codec,
        })
    }

    /// The table rows are stored in.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }
}

fn validate_table_name(table: &str) -> StorageResult<()> {
    let mut chars = table.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::invalid_query(format!(
            "invalid table name {table:?}"
        )))
    }
}

impl Meta for SqlBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    fn fetch(&self, filters: &FilterChain) -> StorageResult<Vec<StoredRow>> {
        let clause = where_clause(filters);
        let sql = format!(
            "SELECT \"row_id\", \"key\", \"type\", \"value\" FROM {}{}",
            self.table, clause.sql
        );
        debug!(%sql, params = ?clause.params, "sql select");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params_from_iter(clause.params.iter()), |row| {
            Ok(StoredRow {
                object_id: row.get(0)?,
                key: row.get(1)?,
                type_name: row.get(2)?,
                payload: row.get(3)?,
            })
        })?;
        let rows = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn update(&self, query: &QueryUpdate) -> StorageResult<usize> {
        let assignments = query.encode(&self.codec)?;
        let set = set_clause(&assignments);
        let filter = where_clause(query.filters());
        // OR REPLACE: an updated row replaces any row that now shares its key.
        let sql = format!("UPDATE OR REPLACE {} SET {}{}", self.table, set.sql, filter.sql);
        debug!(%sql, "sql update");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&sql)?;
        let matched = stmt.execute(params_from_iter(set.params.iter().chain(filter.params.iter())))?;
        Ok(matched)
    }

    fn insert(&self, rows: &[Row]) -> StorageResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "INSERT OR REPLACE INTO {} (\"row_id\", \"key\", \"type\", \"value\") VALUES (?1, ?2, ?3, ?4)",
            self.table
        );

        let encoded = rows
            .iter()
            .map(|row| StoredRow::encode(&self.codec, row))
            .collect::<StorageResult<Vec<_>>>()?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&sql)?;
            for stored in encoded {
                stmt.execute(params![
                    stored.object_id,
                    stored.key,
                    stored.type_name,
                    stored.payload
                ])?;
            }
        }
        tx.commit()?;
        debug!(table = %self.table, count = rows.len(), "sql insert");
        Ok(rows.len())
    }

    fn delete(&self, filters: &FilterChain) -> StorageResult<usize> {
        let clause = where_clause(filters);
        let sql = format!("DELETE FROM {}{}", self.table, clause.sql);
        debug!(%sql, "sql delete");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&sql)?;
        let removed = stmt.execute(params_from_iter(clause.params.iter()))?;
        Ok(removed)
    }
}

impl std::fmt::Debug for SqlBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlBackend")
            .field("table", &self.table)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}
