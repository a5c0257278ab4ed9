//! CLI command implementations.

pub mod inspect;
pub mod object;
pub mod query;

use savable_codec::ValueCodec;
use savable_core::{BackendConfig, Config};
use savable_storage::{Meta, DEFAULT_TABLE, DEFAULT_TREE};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

/// Where the store lives.
#[derive(Debug, Default)]
pub struct StoreArgs {
    /// JSON configuration file; takes precedence over the other options.
    pub config: Option<PathBuf>,
    /// Engine name.
    pub engine: Option<String>,
    /// Store path.
    pub path: Option<PathBuf>,
}

impl StoreArgs {
    /// Resolves the options into a configuration.
    pub fn config(&self) -> Result<Config, Box<dyn Error>> {
        if let Some(file) = &self.config {
            return Ok(Config::from_json_file(file)?);
        }

        let engine = self.engine.as_deref().unwrap_or("sqlite");
        let backend = match engine {
            "flat-file" | "flat_file" | "file" => BackendConfig::FlatFile {
                path: self
                    .path
                    .clone()
                    .ok_or("Store path required for the flat-file engine")?,
            },
            "sqlite" | "sql" => BackendConfig::Sqlite {
                path: self.path.clone(),
                table: DEFAULT_TABLE.to_string(),
            },
            "document" | "sled" => BackendConfig::Document {
                path: self.path.clone(),
                tree: DEFAULT_TREE.to_string(),
            },
            other => return Err(format!("Unknown engine {other:?}").into()),
        };
        Ok(Config::new().backend(backend))
    }

    /// Opens the store with the standard codec.
    pub fn open(&self) -> Result<Arc<dyn Meta>, Box<dyn Error>> {
        Ok(self.config()?.open(ValueCodec::standard())?)
    }
}
