//! Test fixtures: one throwaway store per engine.

use savable_codec::ValueCodec;
use savable_core::{ObjectCache, ObjectMeta};
use savable_storage::{DocumentBackend, FlatFileBackend, Meta, SqlBackend};
use std::fmt;
use std::sync::Arc;
use tempfile::TempDir;

/// The storage engines under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    /// [`FlatFileBackend`] in a temporary directory.
    FlatFile,
    /// [`SqlBackend`] in memory.
    Sqlite,
    /// [`SqlBackend`] on a temporary file.
    SqliteFile,
    /// [`DocumentBackend`] in a temporary directory.
    Document,
}

impl Engine {
    /// Every engine.
    pub const ALL: [Engine; 4] = [
        Engine::FlatFile,
        Engine::Sqlite,
        Engine::SqliteFile,
        Engine::Document,
    ];
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Engine::FlatFile => "flat-file",
            Engine::Sqlite => "sqlite",
            Engine::SqliteFile => "sqlite-file",
            Engine::Document => "document",
        };
        f.write_str(name)
    }
}

/// A store with automatic cleanup.
pub struct TestStore {
    /// Which engine backs the store.
    pub engine: Engine,
    /// The engine instance.
    pub backend: Arc<dyn Meta>,
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Opens a fresh store of the given engine with the standard codec.
    pub fn open(engine: Engine) -> Self {
        Self::with_codec(engine, ValueCodec::standard())
    }

    /// Opens a fresh store of the given engine.
    pub fn with_codec(engine: Engine, codec: ValueCodec) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let backend: Arc<dyn Meta> = match engine {
            Engine::FlatFile => Arc::new(
                FlatFileBackend::open(&temp_dir.path().join("rows.txt"), codec)
                    .expect("Failed to open flat file"),
            ),
            Engine::Sqlite => Arc::new(
                SqlBackend::open_in_memory("savable", codec).expect("Failed to open SQLite"),
            ),
            Engine::SqliteFile => Arc::new(
                SqlBackend::open(&temp_dir.path().join("rows.db"), "savable", codec)
                    .expect("Failed to open SQLite file"),
            ),
            Engine::Document => Arc::new(
                DocumentBackend::open(&temp_dir.path().join("docs"), "savable", codec)
                    .expect("Failed to open document store"),
            ),
        };

        Self {
            engine,
            backend,
            _temp_dir: Some(temp_dir),
        }
    }

    /// A flat-file store.
    pub fn flat_file() -> Self {
        Self::open(Engine::FlatFile)
    }

    /// An in-memory SQLite store.
    pub fn sqlite() -> Self {
        Self::open(Engine::Sqlite)
    }

    /// A sled document store.
    pub fn document() -> Self {
        Self::open(Engine::Document)
    }

    /// Returns true if values read back with their original type.
    ///
    /// The flat file keeps payload text only.
    pub fn preserves_types(&self) -> bool {
        self.engine != Engine::FlatFile
    }

    /// Object-level access to the store.
    pub fn object_meta(&self) -> Arc<ObjectMeta> {
        Arc::new(ObjectMeta::new(Arc::clone(&self.backend)))
    }

    /// Everything a `Savable` needs: object access plus a fresh cache.
    pub fn savable_env(&self) -> (Arc<ObjectMeta>, Arc<ObjectCache>) {
        (self.object_meta(), Arc::new(ObjectCache::new()))
    }
}

impl std::ops::Deref for TestStore {
    type Target = dyn Meta;

    fn deref(&self) -> &Self::Target {
        self.backend.as_ref()
    }
}

impl fmt::Debug for TestStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestStore")
            .field("engine", &self.engine)
            .finish()
    }
}

/// One fresh store per engine.
pub fn all_engines() -> Vec<TestStore> {
    Engine::ALL.into_iter().map(TestStore::open).collect()
}

/// Runs `f` once against a fresh store of every engine.
///
/// # Example
///
/// ```rust
/// use savable_storage::{Meta, Row};
/// use savable_testkit::for_each_engine;
///
/// for_each_engine(|store| {
///     store.insert(&[Row::new("o", "k", "v")]).unwrap();
///     assert_eq!(store.get_value("o", "k").unwrap(), Some("v".into()));
/// });
/// ```
pub fn for_each_engine<F>(mut f: F)
where
    F: FnMut(&TestStore),
{
    for store in all_engines() {
        f(&store);
    }
}
