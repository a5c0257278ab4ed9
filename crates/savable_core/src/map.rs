//! In-memory mirror of one object's fields.

use crate::list::ObservableList;
use savable_codec::{encode_list, Value};
use savable_storage::Row;
use std::collections::BTreeMap;

/// Prefix marking a stored key as holding a list.
pub const LIST_PREFIX: char = '_';

/// Housekeeping field holding the object's raw id.
pub const ID_KEY: &str = "id";

/// Stored key for the list named `key`.
pub fn list_storage_key(key: &str) -> String {
    format!("{LIST_PREFIX}{key}")
}

/// Returns true if `key` can name a scalar field or a list.
///
/// Keys must be non-empty and must not begin with the list prefix, which
/// would make a scalar indistinguishable from a list once stored.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.starts_with(LIST_PREFIX)
}

/// An object's scalar fields and lists.
///
/// Scalars and lists share one key space: setting a scalar removes a list
/// of the same name and vice versa. Lists are stored under `_<key>` as
/// `[a, b, c]`, see [`SavableMap::to_rows`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavableMap {
    values: BTreeMap<String, String>,
    lists: BTreeMap<String, ObservableList<String>>,
}

impl SavableMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`SavableMap::set`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Builder form of [`SavableMap::put_list`].
    #[must_use]
    pub fn with_list<I, S>(mut self, key: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.put_list(key, ObservableList::from_vec(items.into_iter().map(Into::into).collect()));
        self
    }

    /// Scalar value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Sets a scalar, dropping any list of the same name. Returns the
    /// previous scalar.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        self.lists.remove(&key);
        self.values.insert(key, value.into())
    }

    /// Removes a scalar.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Returns true if a scalar named `key` exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns true if a list named `key` exists.
    pub fn has_list(&self, key: &str) -> bool {
        self.lists.contains_key(key)
    }

    /// Returns true if `key` names a scalar or a list.
    pub fn has(&self, key: &str) -> bool {
        self.contains_key(key) || self.has_list(key)
    }

    /// The list named `key`.
    pub fn get_list(&self, key: &str) -> Option<&ObservableList<String>> {
        self.lists.get(key)
    }

    /// Mutable access to the list named `key`.
    pub fn list_mut(&mut self, key: &str) -> Option<&mut ObservableList<String>> {
        self.lists.get_mut(key)
    }

    /// Installs a list, dropping any scalar of the same name.
    pub fn put_list(
        &mut self,
        key: impl Into<String>,
        list: ObservableList<String>,
    ) -> Option<ObservableList<String>> {
        let key = key.into();
        self.values.remove(&key);
        self.lists.insert(key, list)
    }

    /// Removes a list.
    pub fn remove_list(&mut self, key: &str) -> Option<ObservableList<String>> {
        self.lists.remove(key)
    }

    /// All scalars.
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Names of all lists.
    pub fn list_keys(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(String::as_str)
    }

    pub(crate) fn lists_mut(&mut self) -> impl Iterator<Item = (&String, &mut ObservableList<String>)> {
        self.lists.iter_mut()
    }

    /// Number of scalars plus lists.
    pub fn len(&self) -> usize {
        self.values.len() + self.lists.len()
    }

    /// Returns true if there are no scalars and no lists.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.lists.is_empty()
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.values.clear();
        self.lists.clear();
    }

    /// The rows that persist this map under `object_id`.
    pub fn to_rows(&self, object_id: &str) -> Vec<Row> {
        let scalars = self
            .values
            .iter()
            .map(|(key, value)| Row::new(object_id, key.as_str(), Value::Text(value.clone())));
        let lists = self.lists.iter().map(|(key, list)| {
            Row::new(object_id, list_storage_key(key), Value::Text(encode_list(list.as_slice())))
        });
        scalars.chain(lists).collect()
    }
}
