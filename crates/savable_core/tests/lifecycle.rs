//! Savable lifecycle on every engine: create, load, write-through, lists,
//! rollback, delete.

use savable_codec::ValueCodec;
use savable_core::{
    CoreError, ObjectCache, ObjectMeta, Savable, SavableKind, SavableMap, SavableState,
};
use savable_storage::{
    FilterChain, FlatFileBackend, Meta, QueryUpdate, Row, StorageError, StorageResult, StoredRow,
};
use savable_testkit::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Users;

impl SavableKind for Users {
    fn save_id(&self) -> &str {
        "user-"
    }

    fn default_data(&self, raw_id: &str) -> SavableMap {
        SavableMap::new()
            .with("name", format!("player {raw_id}"))
            .with("level", "1")
            .with("banned", "false")
    }

    fn required_keys(&self) -> &[&str] {
        &["name", "level"]
    }
}

fn setup(meta: &Arc<ObjectMeta>, cache: &Arc<ObjectCache>, raw_id: &str) -> Savable<Users> {
    Savable::setup(Arc::new(Users), Arc::clone(meta), Arc::clone(cache), raw_id, None)
        .expect("Failed to set up savable")
}

/// Delegates to another engine and fails every write while `failing` is set.
struct Flaky {
    inner: Arc<dyn Meta>,
    failing: AtomicBool,
}

impl Flaky {
    fn new(inner: Arc<dyn Meta>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StorageError::invalid_query("injected write failure"))
        } else {
            Ok(())
        }
    }
}

impl Meta for Flaky {
    fn backend_name(&self) -> &'static str {
        "flaky"
    }

    fn codec(&self) -> &ValueCodec {
        self.inner.codec()
    }

    fn fetch(&self, filters: &FilterChain) -> StorageResult<Vec<StoredRow>> {
        self.inner.fetch(filters)
    }

    fn update(&self, query: &QueryUpdate) -> StorageResult<usize> {
        self.check()?;
        self.inner.update(query)
    }

    fn insert(&self, rows: &[Row]) -> StorageResult<usize> {
        self.check()?;
        self.inner.insert(rows)
    }

    fn delete(&self, filters: &FilterChain) -> StorageResult<usize> {
        self.check()?;
        self.inner.delete(filters)
    }
}

#[test]
fn lifecycle_creates_then_loads() {
    for_each_engine(|store| {
        let (meta, cache) = store.savable_env();

        let created = setup(&meta, &cache, "123");
        assert_eq!(created.state(), SavableState::Loaded);
        assert_eq!(created.get("id"), Some("123"));
        assert_eq!(created.get("name"), Some("player 123"));

        let stored = meta.get_data("user-123").unwrap().expect("object was not created");
        assert_eq!(stored.get("id"), Some("123"), "{}", store.engine);

        let loaded = setup(&meta, &cache, "123");
        assert_eq!(loaded.data(), created.data(), "{}", store.engine);
        assert_eq!(store.count(&FilterChain::object("user-123")).unwrap(), 4);
    });
}

#[test]
fn lifecycle_write_through() {
    for_each_engine(|store| {
        let (meta, cache) = store.savable_env();
        let mut user = setup(&meta, &cache, "1");

        user.set("level", "7").unwrap();
        user.set("title", "knight").unwrap();
        assert_eq!(user.get_i64("level"), Some(7));
        assert_eq!(user.get_bool("banned"), Some(false));

        let fresh = ObjectMeta::new(Arc::clone(&store.backend));
        assert_eq!(fresh.get_value("user-1", "level").unwrap().as_deref(), Some("7"));
        assert_eq!(fresh.get_value("user-1", "title").unwrap().as_deref(), Some("knight"));

        assert!(user.remove("title").unwrap());
        assert!(fresh.get_value("user-1", "title").unwrap().is_none(), "{}", store.engine);
    });
}

#[test]
fn lifecycle_list_round_trip() {
    for_each_engine(|store| {
        let (meta, cache) = store.savable_env();
        let mut user = setup(&meta, &cache, "1");

        user.put_list("tags", ["a", "b"]).unwrap();
        let stored = meta.get_data("user-1").unwrap().unwrap();
        assert_eq!(stored.get_list("tags").unwrap().as_slice(), &["a", "b"]);

        let tags = user.list_mut("tags").unwrap().unwrap();
        tags.push("c".to_string()).unwrap();
        tags.remove_at(0).unwrap();

        let reloaded = setup(&meta, &cache, "1");
        assert_eq!(
            reloaded.get_list("tags"),
            Some(&["b".to_string(), "c".to_string()][..]),
            "{}",
            store.engine
        );
    });
}

#[test]
fn lifecycle_delete() {
    for_each_engine(|store| {
        let (meta, cache) = store.savable_env();
        let mut user = setup(&meta, &cache, "1");
        let other = setup(&meta, &cache, "2");
        user.cache_put("last_seen", 1_700_000_000u64).unwrap();

        user.delete().unwrap();
        assert!(meta.get_data("user-1").unwrap().is_none(), "{}", store.engine);
        assert!(cache.get::<u64>("user-1", "last_seen").is_none());
        assert!(matches!(user.set("level", "2"), Err(CoreError::ObjectDeleted { .. })));

        assert!(meta.get_data(other.id()).unwrap().is_some());
    });
}

#[test]
fn lifecycle_load_all() {
    for_each_engine(|store| {
        let (meta, cache) = store.savable_env();
        for raw_id in ["3", "1", "2"] {
            setup(&meta, &cache, raw_id);
        }
        meta.set_value("group-1", "name", "ops").unwrap();

        let users = Savable::load_all(Arc::new(Users), meta, cache).unwrap();
        let ids: Vec<_> = users.iter().map(Savable::raw_id).collect();
        assert_eq!(ids, vec!["1", "2", "3"], "{}", store.engine);
    });
}

#[test]
fn list_rolls_back_when_write_fails() {
    let store = TestStore::sqlite();
    let flaky = Arc::new(Flaky::new(Arc::clone(&store.backend)));
    let meta = Arc::new(ObjectMeta::new(flaky.clone()));
    let cache = Arc::new(ObjectCache::new());

    let mut user = setup(&meta, &cache, "1");
    user.put_list("tags", ["a"]).unwrap();

    flaky.fail_writes(true);
    let tags = user.list_mut("tags").unwrap().unwrap();
    let err = tags.push("b".to_string()).unwrap_err();
    assert!(matches!(err, CoreError::Storage(StorageError::InvalidQuery(_))));
    assert_eq!(tags.as_slice(), &["a"]);
    assert!(tags.clear().is_err());
    assert_eq!(tags.as_slice(), &["a"]);

    flaky.fail_writes(false);
    let tags = user.list_mut("tags").unwrap().unwrap();
    tags.push("b".to_string()).unwrap();
    assert_eq!(
        meta.get_list("user-1", "tags").unwrap(),
        Some(vec!["a".to_string(), "b".to_string()])
    );
}

#[test]
fn failed_set_leaves_memory_unchanged() {
    let store = TestStore::document();
    let flaky = Arc::new(Flaky::new(Arc::clone(&store.backend)));
    let meta = Arc::new(ObjectMeta::new(flaky.clone()));
    let cache = Arc::new(ObjectCache::new());
    let mut user = setup(&meta, &cache, "1");
    user.put_list("roles", ["admin"]).unwrap();

    flaky.fail_writes(true);
    assert!(user.set("level", "9").is_err());
    assert!(user.put_list("tags", ["x"]).is_err());
    assert!(user.set("roles", "none").is_err());
    assert!(user.put_list("level", ["2"]).is_err());
    assert!(user.delete().is_err());

    assert_eq!(user.get("level"), Some("1"));
    assert!(user.get_list("tags").is_none());
    assert_eq!(user.get_list("roles"), Some(&["admin".to_string()][..]));
    assert!(user.get("roles").is_none());
    assert!(user.get_list("level").is_none());
    assert_eq!(user.state(), SavableState::Loaded);

    let stored = meta.get_data("user-1").unwrap().unwrap();
    assert_eq!(stored.get("level"), Some("1"));
    assert_eq!(stored.get_list("roles").map(|l| l.to_vec()), Some(vec!["admin".to_string()]));
}

#[test]
fn rejected_write_keeps_the_other_kind_of_value() {
    let store = TestStore::flat_file();
    let (meta, cache) = store.savable_env();
    let mut user = setup(&meta, &cache, "1");
    user.put_list("tags", ["a", "b"]).unwrap();

    assert!(user.set("tags", "x\ny").is_err());
    assert_eq!(user.get_list("tags"), Some(&["a".to_string(), "b".to_string()][..]));
    assert_eq!(
        meta.get_list("user-1", "tags").unwrap(),
        Some(vec!["a".to_string(), "b".to_string()])
    );

    assert!(user.put_list("level", ["bad\nitem"]).is_err());
    assert_eq!(user.get("level"), Some("1"));
    assert_eq!(meta.get_value("user-1", "level").unwrap(), Some("1".to_string()));
    assert!(meta.get_list("user-1", "level").unwrap().is_none());
}

#[test]
fn replacing_the_other_kind_of_value_removes_it() {
    for_each_engine(|store| {
        let (meta, cache) = store.savable_env();
        let mut user = setup(&meta, &cache, "1");
        user.put_list("tags", ["a"]).unwrap();

        user.set("tags", "plain").unwrap();
        user.put_list("level", ["1", "2"]).unwrap();

        let stored = meta.get_data("user-1").unwrap().unwrap();
        assert_eq!(stored.get("tags"), Some("plain"), "{}", store.engine);
        assert!(!stored.has_list("tags"));
        assert!(!stored.contains_key("level"));
        assert_eq!(meta.get_list("user-1", "level").unwrap().map(|l| l.len()), Some(2));
    });
}

#[test]
fn seed_missing_required_keys_writes_nothing() {
    for_each_engine(|store| {
        let (meta, cache) = store.savable_env();
        let seed = SavableMap::new().with("name", "x");
        let result = Savable::setup(Arc::new(Users), Arc::clone(&meta), cache, "9", Some(seed));

        match result {
            Err(CoreError::Initialization { missing, .. }) => {
                assert_eq!(missing, vec!["level".to_string()]);
            }
            other => panic!("expected an initialization error, got {other:?}"),
        }
        assert!(meta.get_data("user-9").unwrap().is_none(), "{}", store.engine);
    });
}

#[test]
fn creation_failure_is_reported() {
    let store = TestStore::sqlite();
    let flaky = Arc::new(Flaky::new(Arc::clone(&store.backend)));
    flaky.fail_writes(true);
    let meta = Arc::new(ObjectMeta::new(flaky));

    let result = Savable::setup(Arc::new(Users), meta, Arc::new(ObjectCache::new()), "1", None);
    assert!(matches!(result, Err(CoreError::Storage(_))));
}

#[test]
fn flat_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("objects.txt");

    {
        let backend = FlatFileBackend::open(&path, ValueCodec::standard()).unwrap();
        let meta = Arc::new(ObjectMeta::new(Arc::new(backend)));
        let mut user = setup(&meta, &Arc::new(ObjectCache::new()), "1");
        user.set("level", "4").unwrap();
        user.put_list("tags", ["x", "y"]).unwrap();
    }

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.lines().any(|line| line == "user-1._tags:[x, y]"));

    let backend = FlatFileBackend::open(&path, ValueCodec::standard()).unwrap();
    let meta = Arc::new(ObjectMeta::new(Arc::new(backend)));
    let user = setup(&meta, &Arc::new(ObjectCache::new()), "1");
    assert_eq!(user.get("level"), Some("4"));
    assert_eq!(user.get_list("tags"), Some(&["x".to_string(), "y".to_string()][..]));
}

#[test]
fn typed_values_keep_their_type_where_supported() {
    for_each_engine(|store| {
        store
            .insert(&[Row::new("o", "n", 42i64), Row::new("o", "b", true)])
            .unwrap();
        let n = store.get_value("o", "n").unwrap().unwrap();
        if store.preserves_types() {
            assert_eq!(n.as_integer(), Some(42), "{}", store.engine);
        } else {
            assert_eq!(n.as_text(), Some("42"));
        }

        let meta = store.object_meta();
        let data = meta.get_data("o").unwrap().unwrap();
        assert_eq!(data.get("n"), Some("42"));
        assert_eq!(data.get("b"), Some("true"));
    });
}
