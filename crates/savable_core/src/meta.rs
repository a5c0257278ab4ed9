//! Object-level access to a storage engine.
//!
//! [`ObjectMeta`] turns the row-oriented [`Meta`] contract into whole
//! objects: it groups rows by object id into [`SavableMap`]s, decodes
//! `_`-prefixed rows as lists, and writes single fields or lists back.

use crate::error::{CoreError, CoreResult};
use crate::list::ObservableList;
use crate::map::{is_valid_key, list_storage_key, SavableMap, LIST_PREFIX};
use savable_codec::{decode_list, encode_list, Value};
use savable_storage::{Column, FilterChain, FilterType, Meta, QuerySelect};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Object-level facade over one engine.
#[derive(Clone)]
pub struct ObjectMeta {
    backend: Arc<dyn Meta>,
}

impl ObjectMeta {
    /// Wraps an engine.
    pub fn new(backend: Arc<dyn Meta>) -> Self {
        Self { backend }
    }

    /// The wrapped engine.
    pub fn backend(&self) -> &Arc<dyn Meta> {
        &self.backend
    }

    /// Loads every field of one object, or `None` if it has no rows.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if the engine fails.
    pub fn get_data(&self, object_id: &str) -> CoreResult<Option<SavableMap>> {
        let mut objects = self.load(FilterChain::object(object_id))?;
        Ok(objects.remove(object_id))
    }

    /// Loads every object whose id starts with `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if the engine fails.
    pub fn get_all(&self, namespace: &str) -> CoreResult<BTreeMap<String, SavableMap>> {
        self.load(FilterChain::new().and(Column::RowId, FilterType::StartsWith, namespace))
    }

    fn load(&self, filters: FilterChain) -> CoreResult<BTreeMap<String, SavableMap>> {
        let query = QuerySelect::all().with_filters(filters);
        let result = self.backend.select(&query)?;
        if !result.is_complete() {
            debug!(skipped = result.skipped.len(), "loaded objects with undecodable rows left out");
        }

        let mut objects: BTreeMap<String, SavableMap> = BTreeMap::new();
        for cells in result.rows {
            let mut cells = cells.into_iter();
            let (Some(object_id), Some(key), Some(value)) = (cells.next(), cells.next(), cells.next())
            else {
                continue;
            };
            let object_id = object_id.payload();
            let key = key.payload();
            absorb(objects.entry(object_id.clone()).or_default(), &object_id, &key, &value);
        }
        Ok(objects)
    }

    /// Inserts every field of a new object.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if the engine fails.
    pub fn add(&self, object_id: &str, data: &SavableMap) -> CoreResult<()> {
        let rows = data.to_rows(object_id);
        let written = self.backend.insert(&rows)?;
        debug!(backend = self.backend.backend_name(), object_id, rows = written, "added object");
        Ok(())
    }

    /// Reads one scalar field as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails or the value cannot be decoded.
    pub fn get_value(&self, object_id: &str, key: &str) -> CoreResult<Option<String>> {
        Ok(self
            .backend
            .get_value(object_id, key)?
            .map(|value| value.payload()))
    }

    /// Writes one scalar field.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] for keys that would read back
    /// as a list, or [`CoreError::Storage`] if the engine fails.
    pub fn set_value(&self, object_id: &str, key: &str, value: &str) -> CoreResult<()> {
        check_key(key)?;
        self.backend
            .set_value(object_id, key, &Value::Text(value.to_string()))?;
        Ok(())
    }

    /// Removes one scalar field. Returns true if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if the engine fails.
    pub fn remove_key(&self, object_id: &str, key: &str) -> CoreResult<bool> {
        check_key(key)?;
        Ok(self.backend.remove_key(object_id, key)?)
    }

    /// Reads one list.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Codec`] if the stored text is not a list.
    pub fn get_list(&self, object_id: &str, key: &str) -> CoreResult<Option<Vec<String>>> {
        let text = self.get_value(object_id, &list_storage_key(key))?;
        text.map(|text| decode_list(&text).map_err(CoreError::from))
            .transpose()
    }

    /// Writes one list.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if the engine fails.
    pub fn set_list<S: AsRef<str>>(&self, object_id: &str, key: &str, items: &[S]) -> CoreResult<()> {
        check_key(key)?;
        self.backend.set_value(
            object_id,
            &list_storage_key(key),
            &Value::Text(encode_list(items)),
        )?;
        Ok(())
    }

    /// Removes one list. Returns true if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if the engine fails.
    pub fn remove_list(&self, object_id: &str, key: &str) -> CoreResult<bool> {
        check_key(key)?;
        Ok(self.backend.remove_key(object_id, &list_storage_key(key))?)
    }

    /// Returns true if the object has any rows.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if the engine fails.
    pub fn exists(&self, object_id: &str) -> CoreResult<bool> {
        Ok(self.backend.count(&FilterChain::object(object_id))? > 0)
    }

    /// Removes every row of one object and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if the engine fails.
    pub fn delete(&self, object_id: &str) -> CoreResult<usize> {
        let removed = self.backend.purge(object_id)?;
        debug!(backend = self.backend.backend_name(), object_id, removed, "deleted object");
        Ok(removed)
    }
}

impl fmt::Debug for ObjectMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectMeta")
            .field("backend", &self.backend.backend_name())
            .finish()
    }
}

pub(crate) fn check_key(key: &str) -> CoreResult<()> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(CoreError::invalid_operation(format!(
            "key {key:?} must be non-empty and must not start with {LIST_PREFIX:?}"
        )))
    }
}

/// Adds one stored row to an object's map. A list wins over a scalar of
/// the same name regardless of row order.
fn absorb(map: &mut SavableMap, object_id: &str, key: &str, value: &Value) {
    match key.strip_prefix(LIST_PREFIX) {
        Some(name) => {
            let text = value.payload();
            let items = match decode_list(&text) {
                Ok(items) => items,
                Err(error) => {
                    warn!(object_id, key, %error, "skipping malformed list");
                    return;
                }
            };
            if map.contains_key(name) {
                warn!(object_id, key = name, "scalar and list share a name, keeping the list");
            }
            map.put_list(name, ObservableList::from_vec(items));
        }
        None => {
            if map.has_list(key) {
                warn!(object_id, key, "scalar and list share a name, keeping the list");
                return;
            }
            map.set(key, value.payload());
        }
    }
}
