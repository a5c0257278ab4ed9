//! Document-store engine on sled.

use crate::backend::{Meta, Row, StoredRow};
use crate::error::{StorageError, StorageResult};
use crate::query::{Column, FilterChain, FilterType, QueryUpdate, RowView};
use savable_codec::ValueCodec;
use std::path::Path;
use tracing::debug;

/// Default tree name.
pub const DEFAULT_TREE: &str = "savable";

/// A condition on one document field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Field equals the operand.
    Eq(String),
    /// Field begins with the operand.
    Prefix(String),
    /// Field ends with the operand.
    Suffix(String),
}

impl Condition {
    fn holds(&self, field: &str) -> bool {
        match self {
            Condition::Eq(operand) => FilterType::ExactMatch.matches(field, operand),
            Condition::Prefix(operand) => FilterType::StartsWith.matches(field, operand),
            Condition::Suffix(operand) => FilterType::EndsWith.matches(field, operand),
        }
    }
}

/// A document filter in `$or` of `$and` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFilter {
    /// Matches every document.
    All,
    /// Matches if any branch matches.
    Or(Vec<DocumentFilter>),
    /// Matches if every branch matches.
    And(Vec<DocumentFilter>),
    /// A condition on one field.
    Field {
        /// Field name, see [`Column::as_str`].
        field: Column,
        /// The condition.
        condition: Condition,
    },
}

impl DocumentFilter {
    /// Compiles a filter chain: one `And` per group under a single `Or`.
    pub fn compile(filters: &FilterChain) -> Self {
        let groups = filters.groups();
        if groups.is_empty() {
            return DocumentFilter::All;
        }
        DocumentFilter::Or(
            groups
                .into_iter()
                .map(|group| {
                    DocumentFilter::And(
                        group
                            .into_iter()
                            .map(|filter| DocumentFilter::Field {
                                field: filter.column,
                                condition: match filter.filter_type {
                                    FilterType::ExactMatch => Condition::Eq(filter.value.clone()),
                                    FilterType::StartsWith => {
                                        Condition::Prefix(filter.value.clone())
                                    }
                                    FilterType::EndsWith => Condition::Suffix(filter.value.clone()),
                                },
                            })
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    /// Evaluates the filter against a document.
    pub fn matches(&self, document: &StoredRow) -> bool {
        match self {
            DocumentFilter::All => true,
            DocumentFilter::Or(branches) => branches.iter().any(|b| b.matches(document)),
            DocumentFilter::And(branches) => branches.iter().all(|b| b.matches(document)),
            DocumentFilter::Field { field, condition } => condition.holds(document.column(*field)),
        }
    }
}

/// A document-store engine keeping one JSON document per `(object_id, key)`.
///
/// Documents have the shape
/// `{"row_id": .., "key": .., "type": .., "value": ..}` and are keyed by
/// `len(row_id) row_id key` inside one sled tree, the length being a
/// big-endian `u32`. An object's documents are contiguous, so a prefix scan
/// finds them, and no two `(row_id, key)` pairs share a document key.
///
/// # Thread Safety
///
/// sled trees are internally synchronized; no extra locking is done.
pub struct DocumentBackend {
    db: sled::Db,
    tree: sled::Tree,
    codec: ValueCodec,
}

impl DocumentBackend {
    /// Opens or creates a store directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or tree cannot be opened.
    pub fn open(path: &Path, tree: &str, codec: ValueCodec) -> StorageResult<Self> {
        Self::with_db(sled::open(path)?, tree, codec)
    }

    /// Opens a temporary store removed when dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be created.
    pub fn temporary(tree: &str, codec: ValueCodec) -> StorageResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::with_db(db, tree, codec)
    }

    /// Wraps an open sled database.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be opened.
    pub fn with_db(db: sled::Db, tree: &str, codec: ValueCodec) -> StorageResult<Self> {
        let tree = db.open_tree(tree)?;
        Ok(Self { db, tree, codec })
    }

    /// Name of the tree documents live in.
    #[must_use]
    pub fn tree_name(&self) -> String {
        String::from_utf8_lossy(&self.tree.name()).into_owned()
    }

    fn object_prefix(object_id: &str) -> StorageResult<Vec<u8>> {
        let len = u32::try_from(object_id.len()).map_err(|_| {
            StorageError::invalid_query(format!("object id of {} bytes is too long", object_id.len()))
        })?;
        let mut prefix = Vec::with_capacity(object_id.len() + 4);
        prefix.extend_from_slice(&len.to_be_bytes());
        prefix.extend_from_slice(object_id.as_bytes());
        Ok(prefix)
    }

    fn document_key(object_id: &str, key: &str) -> StorageResult<Vec<u8>> {
        let mut id = Self::object_prefix(object_id)?;
        id.extend_from_slice(key.as_bytes());
        Ok(id)
    }

    /// Scans the tree, narrowing to a key prefix when every group pins the
    /// same exact object id.
    fn scan(&self, filter: &DocumentFilter) -> StorageResult<Vec<(sled::IVec, StoredRow)>> {
        let iter = match pinned_object(filter) {
            Some(object_id) => self.tree.scan_prefix(Self::object_prefix(object_id)?),
            None => self.tree.iter(),
        };

        let mut matched = Vec::new();
        for entry in iter {
            let (id, bytes) = entry?;
            let document: StoredRow = serde_json::from_slice(&bytes)?;
            if filter.matches(&document) {
                matched.push((id, document));
            }
        }
        Ok(matched)
    }

    fn put(batch: &mut sled::Batch, document: &StoredRow) -> StorageResult<()> {
        let id = Self::document_key(&document.object_id, &document.key)?;
        batch.insert(id, serde_json::to_vec(document)?);
        Ok(())
    }
}

/// Returns the object id every branch of `filter` requires by exact match,
/// if there is one.
fn pinned_object(filter: &DocumentFilter) -> Option<&str> {
    let DocumentFilter::Or(groups) = filter else {
        return None;
    };
    let mut pinned: Option<&str> = None;
    for group in groups {
        let DocumentFilter::And(fields) = group else {
            return None;
        };
        let exact = fields.iter().find_map(|f| match f {
            DocumentFilter::Field {
                field: Column::RowId,
                condition: Condition::Eq(object_id),
            } => Some(object_id.as_str()),
            _ => None,
        })?;
        match pinned {
            Some(previous) if previous != exact => return None,
            _ => pinned = Some(exact),
        }
    }
    pinned
}

impl Meta for DocumentBackend {
    fn backend_name(&self) -> &'static str {
        "document"
    }

    fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    fn fetch(&self, filters: &FilterChain) -> StorageResult<Vec<StoredRow>> {
        let filter = DocumentFilter::compile(filters);
        Ok(self.scan(&filter)?.into_iter().map(|(_, doc)| doc).collect())
    }

    fn update(&self, query: &QueryUpdate) -> StorageResult<usize> {
        let assignments = query.encode(&self.codec)?;
        let filter = DocumentFilter::compile(query.filters());
        let matched = self.scan(&filter)?;

        // Removes come first so that updated documents can move onto each
        // other's ids; the batch applies atomically.
        let mut batch = sled::Batch::default();
        for (id, _) in &matched {
            batch.remove(id.clone());
        }
        for (_, mut document) in matched.iter().cloned() {
            document.apply(&assignments);
            Self::put(&mut batch, &document)?;
        }
        self.tree.apply_batch(batch)?;
        self.tree.flush()?;

        debug!(tree = %self.tree_name(), matched = matched.len(), "document update");
        Ok(matched.len())
    }

    fn insert(&self, rows: &[Row]) -> StorageResult<usize> {
        let mut batch = sled::Batch::default();
        for row in rows {
            Self::put(&mut batch, &StoredRow::encode(&self.codec, row)?)?;
        }
        self.tree.apply_batch(batch)?;
        self.tree.flush()?;
        debug!(tree = %self.tree_name(), count = rows.len(), "document insert");
        Ok(rows.len())
    }

    fn delete(&self, filters: &FilterChain) -> StorageResult<usize> {
        let filter = DocumentFilter::compile(filters);
        let matched = self.scan(&filter)?;
        for (id, _) in &matched {
            self.tree.remove(id)?;
        }
        if !matched.is_empty() {
            self.tree.flush()?;
        }
        debug!(tree = %self.tree_name(), removed = matched.len(), "document delete");
        Ok(matched.len())
    }
}

impl std::fmt::Debug for DocumentBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentBackend")
            .field("tree", &self.tree_name())
            .field("documents", &self.tree.len())
            .field("trees", &self.db.tree_names().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QuerySelect;
    use savable_codec::Value;
    use tempfile::tempdir;

    fn backend() -> DocumentBackend {
        DocumentBackend::temporary(DEFAULT_TREE, ValueCodec::standard()).unwrap()
    }

    #[test]
    fn compile_shape() {
        let chain = FilterChain::new()
            .and(Column::RowId, FilterType::ExactMatch, "u")
            .or(Column::Key, FilterType::StartsWith, "_");
        assert_eq!(
            DocumentFilter::compile(&chain),
            DocumentFilter::Or(vec![
                DocumentFilter::And(vec![DocumentFilter::Field {
                    field: Column::RowId,
                    condition: Condition::Eq("u".to_string()),
                }]),
                DocumentFilter::And(vec![DocumentFilter::Field {
                    field: Column::Key,
                    condition: Condition::Prefix("_".to_string()),
                }]),
            ])
        );
        assert_eq!(DocumentFilter::compile(&FilterChain::new()), DocumentFilter::All);
    }

    #[test]
    fn pinned_object_detection() {
        let pinned = DocumentFilter::compile(&FilterChain::object_key("u", "k"));
        assert_eq!(pinned_object(&pinned), Some("u"));

        let split = DocumentFilter::compile(
            &FilterChain::object("a").or(Column::RowId, FilterType::ExactMatch, "b"),
        );
        assert_eq!(pinned_object(&split), None);

        let loose = DocumentFilter::compile(
            &FilterChain::new().and(Column::RowId, FilterType::StartsWith, "u"),
        );
        assert_eq!(pinned_object(&loose), None);
    }

    #[test]
    fn pinned_scan_does_not_leak_into_longer_ids() {
        let backend = backend();
        backend
            .insert(&[Row::new("u", "k", "1"), Row::new("u2", "k", "2")])
            .unwrap();
        let rows = backend.fetch(&FilterChain::object("u")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].payload, "1");
    }

    #[test]
    fn document_keys_never_merge_distinct_rows() {
        let backend = backend();
        backend
            .insert(&[Row::new("a\0b", "c", "1"), Row::new("a", "b\0c", "2")])
            .unwrap();
        assert_eq!(backend.count(&FilterChain::new()).unwrap(), 2);
        assert_eq!(backend.get_value("a\0b", "c").unwrap(), Some(Value::from("1")));
        assert_eq!(backend.get_value("a", "b\0c").unwrap(), Some(Value::from("2")));
        assert_eq!(backend.fetch(&FilterChain::object("a")).unwrap().len(), 1);
    }

    #[test]
    fn document_update_swaps_keys_in_one_batch() {
        let backend = backend();
        backend
            .insert(&[Row::new("u", "a", "1"), Row::new("u", "b", "2"), Row::new("v", "a", "3")])
            .unwrap();
        let update = QueryUpdate::new()
            .set(Column::RowId, "w")
            .with_filters(FilterChain::new().and(Column::RowId, FilterType::ExactMatch, "u"));
        assert_eq!(backend.update(&update).unwrap(), 2);
        assert_eq!(backend.count(&FilterChain::object("u")).unwrap(), 0);
        assert_eq!(backend.count(&FilterChain::object("w")).unwrap(), 2);
        assert_eq!(backend.get_value("v", "a").unwrap(), Some(Value::from("3")));
    }

    #[test]
    fn document_rejected_update_keeps_rows() {
        let backend = backend();
        backend.insert(&[Row::new("u", "a", "1")]).unwrap();
        let update = QueryUpdate::new()
            .set(Column::Value, Value::tagged("rank", "admin"))
            .with_filters(FilterChain::object("u"));
        assert!(matches!(backend.update(&update), Err(StorageError::Codec(_))));
        assert_eq!(backend.get_value("u", "a").unwrap(), Some(Value::from("1")));
    }

    #[test]
    fn document_typed_values_roundtrip() {
        let backend = backend();
        backend
            .insert(&[Row::new("u", "level", 3i64), Row::new("u", "ratio", 0.5)])
            .unwrap();
        assert_eq!(backend.get_value("u", "level").unwrap(), Some(Value::Integer(3)));
        assert_eq!(backend.get_value("u", "ratio").unwrap(), Some(Value::Float(0.5)));
    }

    #[test]
    fn document_update_moves_key() {
        let backend = backend();
        backend
            .insert(&[Row::new("u", "old", "1"), Row::new("u", "new", "2")])
            .unwrap();
        let update = QueryUpdate::new()
            .set(Column::Key, "new")
            .with_filters(FilterChain::object_key("u", "old"));
        assert_eq!(backend.update(&update).unwrap(), 1);
        assert_eq!(backend.count(&FilterChain::new()).unwrap(), 1);
        assert_eq!(backend.get_value("u", "new").unwrap(), Some(Value::from("1")));
    }

    #[test]
    fn document_select_projection() {
        let backend = backend();
        backend
            .insert(&[Row::new("guild-1", "name", "red"), Row::new("user-1", "name", "bob")])
            .unwrap();
        let query = QuerySelect::new()
            .column(Column::Value)
            .and(Column::RowId, FilterType::StartsWith, "guild-");
        let result = backend.select(&query).unwrap();
        assert_eq!(result.rows, vec![vec![Value::from("red")]]);
    }

    #[test]
    fn document_persistence() {
        let dir = tempdir().unwrap();
        {
            let backend = DocumentBackend::open(dir.path(), "players", ValueCodec::standard()).unwrap();
            backend.insert(&[Row::new("u", "name", "bob")]).unwrap();
            assert_eq!(backend.tree_name(), "players");
        }
        let backend = DocumentBackend::open(dir.path(), "players", ValueCodec::standard()).unwrap();
        assert_eq!(backend.get_value("u", "name").unwrap(), Some(Value::from("bob")));
    }

    #[test]
    fn document_delete_and_purge() {
        let backend = backend();
        backend
            .insert(&[Row::new("u", "a", "1"), Row::new("u", "b", "2"), Row::new("v", "a", "3")])
            .unwrap();
        assert!(backend.remove_key("u", "a").unwrap());
        assert!(!backend.remove_key("u", "a").unwrap());
        assert_eq!(backend.purge("u").unwrap(), 1);
        assert_eq!(backend.count(&FilterChain::new()).unwrap(), 1);
    }
}
