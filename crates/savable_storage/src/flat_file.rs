//! Line-oriented flat-file engine.

use crate::backend::{Meta, Row, StoredRow};
use crate::error::{StorageError, StorageResult};
use crate::query::{FilterChain, QueryUpdate};
use parking_lot::Mutex;
use savable_codec::ValueCodec;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A flat-file engine storing one fact per line.
///
/// # Format
///
/// Each line is `<objectId>.<key>:<value>`. A line is split at its first
/// `.` and then at the first `:` after it, so values may contain any
/// character except a line break. No escaping is done: object ids
/// containing `.`, keys containing `:` and anything containing a line break
/// are rejected on write instead of being silently corrupted.
///
/// Only the payload is stored. Every value reads back as a `string`,
/// whatever type it was written with.
///
/// # Thread Safety
///
/// All operations serialize on one file handle. Each operation reads the
/// whole file; mutations rewrite it with truncate-and-rewrite followed by
/// `sync_all`.
///
/// # Example
///
/// ```no_run
/// use savable_codec::ValueCodec;
/// use savable_storage::{FlatFileBackend, Meta, Row};
/// use std::path::Path;
///
/// let backend = FlatFileBackend::open(Path::new("data.txt"), ValueCodec::standard()).unwrap();
/// backend.insert(&[Row::new("user-1", "name", "bob")]).unwrap();
/// ```
#[derive(Debug)]
pub struct FlatFileBackend {
    path: PathBuf,
    file: Mutex<File>,
    codec: ValueCodec,
}

impl FlatFileBackend {
    /// Opens or creates a flat file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path, codec: ValueCodec) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            codec,
        })
    }

    /// Opens or creates a flat file, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the file cannot
    /// be opened.
    pub fn open_with_create_dirs(path: &Path, codec: ValueCodec) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path, codec)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_rows(file: &mut File) -> StorageResult<Vec<StoredRow>> {
        file.seek(SeekFrom::Start(0))?;
        let mut text = String::new();
        file.read_to_string(&mut text)?;

        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(number, line)| parse_line(line).map_err(|e| annotate(e, number + 1)))
            .collect()
    }

    fn write_rows(file: &mut File, rows: &[StoredRow]) -> StorageResult<()> {
        let mut text = String::new();
        for row in rows {
            text.push_str(&format_line(row));
            text.push('\n');
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }
}

/// Renders one row as a line, without the trailing newline.
pub fn format_line(row: &StoredRow) -> String {
    format!("{}.{}:{}", row.object_id, row.key, row.payload)
}

/// Parses one line.
///
/// # Errors
///
/// Returns [`StorageError::Corrupted`] if the line lacks a `.` or a `:`
/// after it.
pub fn parse_line(line: &str) -> StorageResult<StoredRow> {
    let (object_id, rest) = line
        .split_once('.')
        .ok_or_else(|| StorageError::corrupted(format!("missing '.' in line {line:?}")))?;
    let (key, payload) = rest
        .split_once(':')
        .ok_or_else(|| StorageError::corrupted(format!("missing ':' in line {line:?}")))?;
    Ok(StoredRow::text(object_id, key, payload))
}

fn annotate(error: StorageError, line: usize) -> StorageError {
    match error {
        StorageError::Corrupted(message) => {
            StorageError::Corrupted(format!("line {line}: {message}"))
        }
        other => other,
    }
}

fn check_writable(row: &StoredRow) -> StorageResult<()> {
    let breaks = |s: &str| s.contains('\n') || s.contains('\r');
    if row.object_id.contains('.') || breaks(&row.object_id) {
        return Err(StorageError::invalid_query(format!(
            "object id {:?} cannot be stored in a flat file",
            row.object_id
        )));
    }
    if row.key.contains(':') || breaks(&row.key) {
        return Err(StorageError::invalid_query(format!(
            "key {:?} cannot be stored in a flat file",
            row.key
        )));
    }
    if breaks(&row.payload) {
        return Err(StorageError::invalid_query(format!(
            "value of {}.{} contains a line break",
            row.object_id, row.key
        )));
    }
    Ok(())
}

impl Meta for FlatFileBackend {
    fn backend_name(&self) -> &'static str {
        "flat-file"
    }

    fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    fn fetch(&self, filters: &FilterChain) -> StorageResult<Vec<StoredRow>> {
        let mut file = self.file.lock();
        let rows = Self::read_rows(&mut file)?;
        Ok(rows.into_iter().filter(|row| filters.matches(row)).collect())
    }

    fn update(&self, query: &QueryUpdate) -> StorageResult<usize> {
        let assignments = query.encode(&self.codec)?;
        let mut file = self.file.lock();
        let rows = Self::read_rows(&mut file)?;

        let mut kept = Vec::with_capacity(rows.len());
        let mut updated = Vec::new();
        for row in rows {
            if query.filters().matches(&row) {
                let mut row = row;
                row.apply(&assignments);
                check_writable(&row)?;
                updated.push(row);
            } else {
                kept.push(row);
            }
        }

        let matched = updated.len();
        if matched == 0 {
            return Ok(0);
        }

        // An updated row replaces any other row that now has its identity.
        kept.retain(|row| !updated.iter().any(|u| u.same_identity(row)));
        let mut deduped: Vec<StoredRow> = Vec::with_capacity(updated.len());
        for row in updated {
            deduped.retain(|u| !u.same_identity(&row));
            deduped.push(row);
        }
        kept.extend(deduped);

        Self::write_rows(&mut file, &kept)?;
        debug!(path = %self.path.display(), matched, "flat-file update");
        Ok(matched)
    }

    fn insert(&self, rows: &[Row]) -> StorageResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let new_rows: Vec<StoredRow> = rows
            .iter()
            .map(|row| StoredRow::encode(&self.codec, row))
            .collect::<StorageResult<_>>()?;
        for row in &new_rows {
            check_writable(row)?;
        }

        let mut file = self.file.lock();
        let mut stored = Self::read_rows(&mut file)?;
        for row in new_rows {
            stored.retain(|existing| !existing.same_identity(&row));
            stored.push(row);
        }
        Self::write_rows(&mut file, &stored)?;
        debug!(path = %self.path.display(), count = rows.len(), "flat-file insert");
        Ok(rows.len())
    }

    fn delete(&self, filters: &FilterChain) -> StorageResult<usize> {
        let mut file = self.file.lock();
        let rows = Self::read_rows(&mut file)?;
        let before = rows.len();
        let kept: Vec<StoredRow> = rows.into_iter().filter(|row| !filters.matches(row)).collect();
        let removed = before - kept.len();
        if removed > 0 {
            Self::write_rows(&mut file, &kept)?;
        }
        debug!(path = %self.path.display(), removed, "flat-file delete");
        Ok(removed)
    }
}
