//! Engine configuration.

use crate::error::{CoreError, CoreResult};
use savable_codec::ValueCodec;
use savable_storage::{
    DocumentBackend, FlatFileBackend, Meta, SqlBackend, DEFAULT_TABLE, DEFAULT_TREE,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Which engine to open, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "engine", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Line-oriented text file.
    FlatFile {
        /// File holding the rows.
        path: PathBuf,
    },
    /// SQLite database.
    Sqlite {
        /// Database file; in-memory when absent.
        #[serde(default)]
        path: Option<PathBuf>,
        /// Table holding the rows.
        #[serde(default = "default_table")]
        table: String,
    },
    /// sled document store.
    Document {
        /// Database directory; temporary when absent.
        #[serde(default)]
        path: Option<PathBuf>,
        /// Tree holding the documents.
        #[serde(default = "default_tree")]
        tree: String,
    },
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_tree() -> String {
    DEFAULT_TREE.to_string()
}

const fn default_create_dirs() -> bool {
    true
}

impl BackendConfig {
    /// Short engine name, matching [`Meta::backend_name`].
    pub fn engine_name(&self) -> &'static str {
        match self {
            Self::FlatFile { .. } => "flat-file",
            Self::Sqlite { .. } => "sqlite",
            Self::Document { .. } => "document",
        }
    }

    fn path(&self) -> Option<&Path> {
        match self {
            Self::FlatFile { path } => Some(path.as_path()),
            Self::Sqlite { path, .. } | Self::Document { path, .. } => path.as_deref(),
        }
    }
}

/// Configuration for opening a storage engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// The engine to open.
    pub backend: BackendConfig,

    /// Whether to create missing parent directories of the engine's path.
    #[serde(default = "default_create_dirs")]
    pub create_dirs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::Sqlite {
                path: None,
                table: default_table(),
            },
            create_dirs: true,
        }
    }
}

impl Config {
    /// Creates a configuration for an in-memory SQLite engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flat file at `path`.
    #[must_use]
    pub fn flat_file(path: impl Into<PathBuf>) -> Self {
        Self::new().backend(BackendConfig::FlatFile { path: path.into() })
    }

    /// SQLite database at `path`.
    #[must_use]
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self::new().backend(BackendConfig::Sqlite {
            path: Some(path.into()),
            table: default_table(),
        })
    }

    /// sled database at `path`.
    #[must_use]
    pub fn document(path: impl Into<PathBuf>) -> Self {
        Self::new().backend(BackendConfig::Document {
            path: Some(path.into()),
            tree: default_tree(),
        })
    }

    /// Sets the engine.
    #[must_use]
    pub fn backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    /// Sets whether to create missing parent directories.
    #[must_use]
    pub fn create_dirs(mut self, value: bool) -> Self {
        self.create_dirs = value;
        self
    }

    /// Parses a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if the text is not a valid configuration.
    pub fn from_json(text: &str) -> CoreResult<Self> {
        serde_json::from_str(text).map_err(|e| CoreError::config(e.to_string()))
    }

    /// Reads a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the file cannot be read, or
    /// [`CoreError::Config`] if it is not a valid configuration.
    pub fn from_json_file(path: &Path) -> CoreResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Opens the configured engine with `codec`.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the engine fails
    /// to open.
    pub fn open(&self, codec: ValueCodec) -> CoreResult<Arc<dyn Meta>> {
        if self.create_dirs {
            if let Some(parent) = self.backend.path().and_then(Path::parent) {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
        }

        let backend: Arc<dyn Meta> = match &self.backend {
            BackendConfig::FlatFile { path } => Arc::new(FlatFileBackend::open(path, codec)?),
            BackendConfig::Sqlite {
                path: Some(path),
                table,
            } => Arc::new(SqlBackend::open(path, table, codec)?),
            BackendConfig::Sqlite { path: None, table } => {
                Arc::new(SqlBackend::open_in_memory(table, codec)?)
            }
            BackendConfig::Document {
                path: Some(path),
                tree,
            } => Arc::new(DocumentBackend::open(path, tree, codec)?),
            BackendConfig::Document { path: None, tree } => {
                Arc::new(DocumentBackend::temporary(tree, codec)?)
            }
        };
        info!(engine = backend.backend_name(), "opened storage engine");
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use savable_storage::Row;
    use tempfile::tempdir;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_dirs);
        assert_eq!(
            config.backend,
            BackendConfig::Sqlite {
                path: None,
                table: "savable".to_string()
            }
        );
    }

    #[test]
    fn builder_pattern() {
        let config = Config::flat_file("data/objects.txt").create_dirs(false);
        assert!(!config.create_dirs);
        assert_eq!(config.backend.engine_name(), "flat-file");
    }

    #[test]
    fn parses_json_with_defaults() {
        let config = Config::from_json(r#"{"backend": {"engine": "document"}}"#).unwrap();
        assert!(config.create_dirs);
        assert_eq!(
            config.backend,
            BackendConfig::Document {
                path: None,
                tree: "savable".to_string()
            }
        );

        let config =
            Config::from_json(r#"{"backend": {"engine": "sqlite", "table": "users"}, "create_dirs": false}"#)
                .unwrap();
        assert!(!config.create_dirs);
        assert!(matches!(config.backend, BackendConfig::Sqlite { ref table, .. } if table == "users"));
    }

    #[test]
    fn rejects_unknown_engine() {
        let err = Config::from_json(r#"{"backend": {"engine": "mongo"}}"#).unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }

    #[test]
    fn opens_every_engine() {
        let dir = tempdir().unwrap();
        let configs = [
            Config::flat_file(dir.path().join("nested/rows.txt")),
            Config::sqlite(dir.path().join("nested/rows.db")),
            Config::document(dir.path().join("docs")),
            Config::new(),
        ];

        for config in configs {
            let backend = config.open(ValueCodec::standard()).unwrap();
            assert_eq!(backend.backend_name(), config.backend.engine_name());
            backend.insert(&[Row::new("o", "k", "v")]).unwrap();
            assert_eq!(backend.get_value("o", "k").unwrap(), Some("v".into()));
        }
    }
}
