//! Persisted objects with write-through mutation.
//!
//! A [`Savable`] is a [`SavableMap`] bound to an id in some engine. Every
//! mutation goes to the engine first and only then to memory, so a failed
//! write leaves the in-memory state as it was. Lists carry a listener that
//! writes the whole list through after each change; a failed write rolls
//! the list back.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized --setup--> Loaded --delete/soft_delete--> Deleted
//! ```
//!
//! Mutations on a deleted object fail with [`CoreError::ObjectDeleted`].

use crate::cache::ObjectCache;
use crate::error::{CoreError, CoreResult};
use crate::list::{ListAction, ListChange, ObservableList};
use crate::map::{SavableMap, ID_KEY};
use crate::meta::{check_key, ObjectMeta};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Describes one kind of persisted object.
///
/// Implementors name the namespace their objects live under and the data a
/// brand-new object starts with.
pub trait SavableKind: Send + Sync + 'static {
    /// Namespace prefixed to every raw id, e.g. `"user-"`.
    fn save_id(&self) -> &str;

    /// Initial fields of a new object.
    fn default_data(&self, raw_id: &str) -> SavableMap;

    /// Fields every loaded object must have.
    fn required_keys(&self) -> &[&str] {
        &[]
    }
}

/// Lifecycle state of a [`Savable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavableState {
    /// Constructed, not yet loaded.
    Uninitialized,
    /// Loaded or created; mutations write through.
    Loaded,
    /// Deleted; terminal.
    Deleted,
}

/// A persisted object.
pub struct Savable<K: SavableKind> {
    kind: Arc<K>,
    meta: Arc<ObjectMeta>,
    cache: Arc<ObjectCache>,
    raw_id: String,
    id: String,
    state: SavableState,
    data: SavableMap,
}

impl<K: SavableKind> Savable<K> {
    /// Loads the object `kind.save_id() + raw_id`, creating it from
    /// [`SavableKind::default_data`] if the engine has no rows for it.
    ///
    /// With `seed`, the given data is used as-is instead of loading; an
    /// absent `id` field is stamped and written through.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Initialization`] if required keys are missing,
    /// or an engine error.
    pub fn setup(
        kind: Arc<K>,
        meta: Arc<ObjectMeta>,
        cache: Arc<ObjectCache>,
        raw_id: &str,
        seed: Option<SavableMap>,
    ) -> CoreResult<Self> {
        let id = format!("{}{raw_id}", kind.save_id());
        let mut savable = Self {
            kind,
            meta,
            cache,
            raw_id: raw_id.to_string(),
            id,
            state: SavableState::Uninitialized,
            data: SavableMap::new(),
        };

        let data = match seed {
            Some(seed) => savable.adopt(seed)?,
            None => match savable.meta.get_data(&savable.id)? {
                Some(data) => data,
                None => savable.create()?,
            },
        };
        savable.check_required(&data)?;

        savable.data = data;
        savable.attach_listeners();
        savable.state = SavableState::Loaded;
        debug!(id = %savable.id, "savable loaded");
        Ok(savable)
    }

    /// Loads every stored object of `kind`.
    ///
    /// # Errors
    ///
    /// Returns the first setup error, see [`Savable::setup`].
    pub fn load_all(
        kind: Arc<K>,
        meta: Arc<ObjectMeta>,
        cache: Arc<ObjectCache>,
    ) -> CoreResult<Vec<Self>> {
        let objects = meta.get_all(kind.save_id())?;
        objects
            .into_iter()
            .map(|(id, data)| {
                let raw_id = match data.get(ID_KEY) {
                    Some(raw_id) => raw_id.to_string(),
                    None => id.strip_prefix(kind.save_id()).unwrap_or(&id).to_string(),
                };
                Self::setup(Arc::clone(&kind), Arc::clone(&meta), Arc::clone(&cache), &raw_id, Some(data))
            })
            .collect()
    }

    fn adopt(&self, mut seed: SavableMap) -> CoreResult<SavableMap> {
        if seed.contains_key(ID_KEY) {
            return Ok(seed);
        }
        seed.set(ID_KEY, self.raw_id.as_str());
        self.check_required(&seed)?;
        self.meta.set_value(&self.id, ID_KEY, &self.raw_id)?;
        Ok(seed)
    }

    fn create(&self) -> CoreResult<SavableMap> {
        let mut data = self.kind.default_data(&self.raw_id);
        if !data.contains_key(ID_KEY) {
            data.set(ID_KEY, self.raw_id.as_str());
        }
        self.check_required(&data)?;
        self.meta.add(&self.id, &data)?;
        debug!(id = %self.id, "savable created");
        Ok(data)
    }

    fn check_required(&self, data: &SavableMap) -> CoreResult<()> {
        let missing: Vec<String> = self
            .kind
            .required_keys()
            .iter()
            .filter(|key| !data.has(key))
            .map(|key| (*key).to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Initialization {
                id: self.id.clone(),
                missing,
            })
        }
    }

    fn attach_listeners(&mut self) {
        for (key, list) in self.data.lists_mut() {
            list.set_listener(write_through(Arc::clone(&self.meta), self.id.clone(), key.clone()));
        }
    }

    fn ensure_loaded(&self) -> CoreResult<()> {
        match self.state {
            SavableState::Loaded => Ok(()),
            SavableState::Deleted => Err(CoreError::object_deleted(&self.id)),
            SavableState::Uninitialized => Err(CoreError::invalid_operation(format!(
                "object {} is not loaded",
                self.id
            ))),
        }
    }

    /// The object id, `save_id + raw_id`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The id within the kind's namespace.
    pub fn raw_id(&self) -> &str {
        &self.raw_id
    }

    /// The kind's namespace.
    pub fn save_id(&self) -> &str {
        self.kind.save_id()
    }

    /// The object kind.
    pub fn kind(&self) -> &Arc<K> {
        &self.kind
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SavableState {
        self.state
    }

    /// Returns true once the object has been deleted.
    pub fn is_deleted(&self) -> bool {
        self.state == SavableState::Deleted
    }

    /// The in-memory fields.
    pub fn data(&self) -> &SavableMap {
        &self.data
    }

    /// Scalar value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key)
    }

    /// Scalar value of `key` parsed as an integer.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key)?.parse().ok()
    }

    /// Scalar value of `key` parsed as a boolean.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.parse().ok()
    }

    /// Contents of the list named `key`.
    pub fn get_list(&self, key: &str) -> Option<&[String]> {
        self.data.get_list(key).map(ObservableList::as_slice)
    }

    /// Sets a scalar field, writing it through first. A list of the same
    /// name is removed.
    ///
    /// # Errors
    ///
    /// Returns an engine error, in which case memory is unchanged.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> CoreResult<()> {
        self.ensure_loaded()?;
        check_key(key)?;
        let value = value.into();

        self.meta.set_value(&self.id, key, &value)?;
        if self.data.has_list(key) {
            if let Err(error) = self.meta.remove_list(&self.id, key) {
                if let Err(undo) = self.meta.remove_key(&self.id, key) {
                    warn!(id = %self.id, key, error = %undo, "could not undo scalar write");
                }
                return Err(error);
            }
        }
        self.data.set(key, value);
        Ok(())
    }

    /// Removes a scalar field. Returns true if it existed.
    ///
    /// # Errors
    ///
    /// Returns an engine error, in which case memory is unchanged.
    pub fn remove(&mut self, key: &str) -> CoreResult<bool> {
        self.ensure_loaded()?;
        check_key(key)?;
        self.meta.remove_key(&self.id, key)?;
        Ok(self.data.remove(key).is_some())
    }

    /// Installs a list, writing it through first. A scalar of the same name
    /// is removed.
    ///
    /// # Errors
    ///
    /// Returns an engine error, in which case memory is unchanged.
    pub fn put_list<I, S>(&mut self, key: &str, items: I) -> CoreResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_loaded()?;
        check_key(key)?;
        let items: Vec<String> = items.into_iter().map(Into::into).collect();

        self.meta.set_list(&self.id, key, &items)?;
        if self.data.contains_key(key) {
            if let Err(error) = self.meta.remove_key(&self.id, key) {
                if let Err(undo) = self.meta.remove_list(&self.id, key) {
                    warn!(id = %self.id, key, error = %undo, "could not undo list write");
                }
                return Err(error);
            }
        }
        let listener = write_through(Arc::clone(&self.meta), self.id.clone(), key.to_string());
        self.data.put_list(key, ObservableList::with_listener(items, listener));
        Ok(())
    }

    /// Removes a list. Returns true if it existed.
    ///
    /// # Errors
    ///
    /// Returns an engine error, in which case memory is unchanged.
    pub fn remove_list(&mut self, key: &str) -> CoreResult<bool> {
        self.ensure_loaded()?;
        check_key(key)?;
        self.meta.remove_list(&self.id, key)?;
        Ok(self.data.remove_list(key).is_some())
    }

    /// Mutable access to a list. Every mutation is written through and
    /// rolled back if the write fails.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ObjectDeleted`] after deletion.
    pub fn list_mut(&mut self, key: &str) -> CoreResult<Option<&mut ObservableList<String>>> {
        self.ensure_loaded()?;
        Ok(self.data.list_mut(key))
    }

    /// Stores a non-persistent value for this object in the shared cache.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ObjectDeleted`] after deletion.
    pub fn cache_put<T: Any + Send + Sync>(&self, key: &str, value: T) -> CoreResult<()> {
        self.ensure_loaded()?;
        self.cache.put(&self.id, key, value);
        Ok(())
    }

    /// Reads a non-persistent value for this object from the shared cache.
    pub fn cache_get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.cache.get(&self.id, key)
    }

    /// Purges every stored row of this object, drops its cache entry and
    /// clears memory.
    ///
    /// # Errors
    ///
    /// Returns an engine error, in which case the object stays loaded.
    pub fn delete(&mut self) -> CoreResult<()> {
        self.purge()?;
        self.data.clear();
        Ok(())
    }

    /// Like [`Savable::delete`], but the last in-memory fields stay readable.
    ///
    /// # Errors
    ///
    /// Returns an engine error, in which case the object stays loaded.
    pub fn soft_delete(&mut self) -> CoreResult<()> {
        self.purge()?;
        for (_, list) in self.data.lists_mut() {
            list.clear_listener();
        }
        Ok(())
    }

    fn purge(&mut self) -> CoreResult<()> {
        self.ensure_loaded()?;
        self.meta.delete(&self.id)?;
        self.cache.drop_object(&self.id);
        self.state = SavableState::Deleted;
        debug!(id = %self.id, "savable deleted");
        Ok(())
    }
}

impl<K: SavableKind> fmt::Debug for Savable<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Savable")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("data", &self.data)
            .finish()
    }
}

fn write_through(meta: Arc<ObjectMeta>, id: String, key: String) -> ListAction<String> {
    Box::new(move |change: &ListChange<'_, String>| meta.set_list(&id, &key, change.after))
}

#[cfg(test)]
mod tests {
    use super::*;
    use savable_codec::ValueCodec;
    use savable_storage::SqlBackend;

    struct Users;

    impl SavableKind for Users {
        fn save_id(&self) -> &str {
            "user-"
        }

        fn default_data(&self, _raw_id: &str) -> SavableMap {
            SavableMap::new().with("level", "1").with_list("tags", ["new"])
        }

        fn required_keys(&self) -> &[&str] {
            &["level"]
        }
    }

    struct Strict;

    impl SavableKind for Strict {
        fn save_id(&self) -> &str {
            "strict-"
        }

        fn default_data(&self, _raw_id: &str) -> SavableMap {
            SavableMap::new()
        }

        fn required_keys(&self) -> &[&str] {
            &["owner"]
        }
    }

    fn env() -> (Arc<ObjectMeta>, Arc<ObjectCache>) {
        let backend = SqlBackend::open_in_memory("objects", ValueCodec::standard()).unwrap();
        (Arc::new(ObjectMeta::new(Arc::new(backend))), Arc::new(ObjectCache::new()))
    }

    fn user(meta: &Arc<ObjectMeta>, cache: &Arc<ObjectCache>, raw_id: &str) -> Savable<Users> {
        Savable::setup(Arc::new(Users), Arc::clone(meta), Arc::clone(cache), raw_id, None).unwrap()
    }

    #[test]
    fn creates_defaults_with_id() {
        let (meta, cache) = env();
        let savable = user(&meta, &cache, "123");

        assert_eq!(savable.id(), "user-123");
        assert_eq!(savable.state(), SavableState::Loaded);
        assert_eq!(savable.get("id"), Some("123"));
        assert_eq!(savable.get_i64("level"), Some(1));

        let stored = meta.get_data("user-123").unwrap().unwrap();
        assert_eq!(&stored, savable.data());
    }

    #[test]
    fn missing_required_keys_fail_without_writing() {
        let (meta, cache) = env();
        let err = Savable::setup(Arc::new(Strict), Arc::clone(&meta), cache, "1", None).unwrap_err();

        match err {
            CoreError::Initialization { id, missing } => {
                assert_eq!(id, "strict-1");
                assert_eq!(missing, vec!["owner".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!meta.exists("strict-1").unwrap());
    }

    #[test]
    fn seed_gets_id_stamped() {
        let (meta, cache) = env();
        let seed = SavableMap::new().with("level", "5");
        let savable =
            Savable::setup(Arc::new(Users), Arc::clone(&meta), cache, "9", Some(seed)).unwrap();

        assert_eq!(savable.get("id"), Some("9"));
        assert_eq!(meta.get_value("user-9", "id").unwrap().as_deref(), Some("9"));
        assert!(meta.get_value("user-9", "level").unwrap().is_none());
    }

    #[test]
    fn set_replaces_list_of_same_name() {
        let (meta, cache) = env();
        let mut savable = user(&meta, &cache, "1");

        savable.set("tags", "flat").unwrap();
        assert!(savable.get_list("tags").is_none());
        assert!(meta.get_list("user-1", "tags").unwrap().is_none());
        assert_eq!(meta.get_value("user-1", "tags").unwrap().as_deref(), Some("flat"));

        savable.put_list("tags", ["x"]).unwrap();
        assert!(savable.get("tags").is_none());
        assert!(meta.get_value("user-1", "tags").unwrap().is_none());
    }

    #[test]
    fn list_mutations_write_through() {
        let (meta, cache) = env();
        let mut savable = user(&meta, &cache, "1");

        let tags = savable.list_mut("tags").unwrap().unwrap();
        tags.push("vip".to_string()).unwrap();
        tags.remove(&"new".to_string()).unwrap();

        assert_eq!(meta.get_list("user-1", "tags").unwrap(), Some(vec!["vip".to_string()]));
    }

    #[test]
    fn list_prefixed_keys_are_rejected() {
        let (meta, cache) = env();
        let mut savable = user(&meta, &cache, "1");
        assert!(matches!(savable.set("_x", "v"), Err(CoreError::InvalidOperation { .. })));
        assert!(matches!(savable.put_list("", ["v"]), Err(CoreError::InvalidOperation { .. })));
    }

    #[test]
    fn delete_purges_rows_and_cache() {
        let (meta, cache) = env();
        let mut savable = user(&meta, &cache, "1");
        savable.cache_put("session", 7u32).unwrap();
        assert_eq!(cache.len(), 1);

        savable.delete().unwrap();
        assert!(savable.is_deleted());
        assert!(savable.data().is_empty());
        assert!(cache.is_empty());
        assert!(meta.get_data("user-1").unwrap().is_none());

        assert!(matches!(savable.set("level", "2"), Err(CoreError::ObjectDeleted { .. })));
        assert!(matches!(savable.list_mut("tags"), Err(CoreError::ObjectDeleted { .. })));
        assert!(matches!(savable.delete(), Err(CoreError::ObjectDeleted { .. })));
    }

    #[test]
    fn soft_delete_keeps_snapshot() {
        let (meta, cache) = env();
        let mut savable = user(&meta, &cache, "1");

        savable.soft_delete().unwrap();
        assert!(meta.get_data("user-1").unwrap().is_none());
        assert_eq!(savable.get("level"), Some("1"));
        assert_eq!(savable.get_list("tags"), Some(&["new".to_string()][..]));
        assert!(matches!(savable.remove("level"), Err(CoreError::ObjectDeleted { .. })));
    }

    #[test]
    fn load_all_restores_raw_ids() {
        let (meta, cache) = env();
        user(&meta, &cache, "1");
        user(&meta, &cache, "2");

        let all = Savable::load_all(Arc::new(Users), Arc::clone(&meta), cache).unwrap();
        let ids: Vec<_> = all.iter().map(|s| (s.id(), s.raw_id())).collect();
        assert_eq!(ids, vec![("user-1", "1"), ("user-2", "2")]);
        assert!(all.iter().all(|s| s.data().get_list("tags").is_some_and(ObservableList::has_listener)));
    }
}
