//! Ephemeral per-object state that is never persisted.
//!
//! The cache maps object ids to named, type-erased values. It lives for as
//! long as the owner keeps it and is shared by handing out an
//! `Arc<ObjectCache>`; deleting a [`crate::Savable`] drops its entry.

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Entry = Arc<dyn Any + Send + Sync>;

/// Thread-safe store of non-persistent per-object values.
#[derive(Default)]
pub struct ObjectCache {
    objects: RwLock<HashMap<String, HashMap<String, Entry>>>,
}

impl ObjectCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `(object_id, key)`. Returns true if an earlier
    /// value was replaced.
    pub fn put<T: Any + Send + Sync>(&self, object_id: &str, key: &str, value: T) -> bool {
        self.objects
            .write()
            .entry(object_id.to_string())
            .or_default()
            .insert(key.to_string(), Arc::new(value))
            .is_some()
    }

    /// Returns the value under `(object_id, key)` if it exists and has type
    /// `T`.
    pub fn get<T: Any + Send + Sync>(&self, object_id: &str, key: &str) -> Option<Arc<T>> {
        let entry = self.objects.read().get(object_id)?.get(key)?.clone();
        entry.downcast::<T>().ok()
    }

    /// Returns true if a value exists under `(object_id, key)`.
    pub fn contains(&self, object_id: &str, key: &str) -> bool {
        self.objects
            .read()
            .get(object_id)
            .is_some_and(|entries| entries.contains_key(key))
    }

    /// Removes one value. Returns true if it existed.
    pub fn remove(&self, object_id: &str, key: &str) -> bool {
        let mut objects = self.objects.write();
        let Some(entries) = objects.get_mut(object_id) else {
            return false;
        };
        let removed = entries.remove(key).is_some();
        if entries.is_empty() {
            objects.remove(object_id);
        }
        removed
    }

    /// Removes every value of one object. Returns true if any existed.
    pub fn drop_object(&self, object_id: &str) -> bool {
        self.objects.write().remove(object_id).is_some()
    }

    /// Number of objects with cached values.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Removes everything.
    pub fn clear(&self) {
        self.objects.write().clear();
    }
}

impl fmt::Debug for ObjectCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCache")
            .field("objects", &self.len())
            .finish()
    }
}
