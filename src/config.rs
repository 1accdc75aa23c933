//! Records Configuration
//!
//! Host-side settings, read from a JSON file. Every field is optional:
//! - `schema_dir`: directory with `kinds.json` / `symmetry.json` replacing the bundled documents
//! - `blob_root`: directory for the filesystem blob store (in-memory when absent)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{install_schema_provider, BundledSchemas, SchemaLoader, SchemaResult};
use crate::store::{BlobStore, LocalBlobStore, MemoryBlobStore};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid config '{path}': {reason}")]
    Parse { path: String, reason: String },
}

/// Records configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    /// Directory overriding the bundled schema documents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_dir: Option<PathBuf>,

    /// Root directory of the filesystem blob store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_root: Option<PathBuf>,
}

impl RecordsConfig {
    /// Reads a config file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Installs the schema provider this config selects.
    ///
    /// Must run before the first record is validated.
    pub fn install_schemas(&self) -> SchemaResult<()> {
        match &self.schema_dir {
            Some(dir) => install_schema_provider(SchemaLoader::new(dir)),
            None => install_schema_provider(BundledSchemas),
        }
    }

    /// Blob store this config selects
    pub fn blob_store(&self) -> Box<dyn BlobStore> {
        match &self.blob_root {
            Some(root) => Box::new(LocalBlobStore::new(root)),
            None => Box::new(MemoryBlobStore::new()),
        }
    }
}
