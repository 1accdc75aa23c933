//! # Blob Store
//!
//! Named binary payloads attached to a record, kept apart from the attribute bag.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::errors::{StoreError, StoreResult};
use super::RecordId;

/// Backend trait for per-record blobs
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Write `data` as blob `name`, replacing any previous content
    fn write(&self, record: &RecordId, name: &str, data: &[u8]) -> StoreResult<()>;

    /// Read blob `name`
    fn read(&self, record: &RecordId, name: &str) -> StoreResult<Vec<u8>>;

    /// Check if blob `name` exists
    fn exists(&self, record: &RecordId, name: &str) -> StoreResult<bool>;

    /// Delete blob `name`
    fn delete(&self, record: &RecordId, name: &str) -> StoreResult<()>;

    /// Make every blob of `record` read-only
    fn seal(&self, record: &RecordId) -> StoreResult<()>;

    /// Whether the blobs of `record` are read-only
    fn is_sealed(&self, record: &RecordId) -> StoreResult<bool>;
}

/// Rejects names that could escape the record's namespace.
pub(crate) fn check_name(name: &str) -> StoreResult<()> {
    if name.is_empty() || name.starts_with('.') || name.contains('/') || name.contains('\\') {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn blob_key(record: &RecordId, name: &str) -> String {
    format!("{}/{}", record, name)
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Internal("blob store lock poisoned".into())
}

/// In-memory blob store
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<(RecordId, String), Vec<u8>>>,
    sealed: RwLock<HashSet<RecordId>>,
}

impl MemoryBlobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn check_writable(&self, record: &RecordId) -> StoreResult<()> {
        if self.is_sealed(record)? {
            return Err(StoreError::Immutable(format!("blobs of record {}", record)));
        }
        Ok(())
    }
}

impl BlobStore for MemoryBlobStore {
    fn write(&self, record: &RecordId, name: &str, data: &[u8]) -> StoreResult<()> {
        check_name(name)?;
        self.check_writable(record)?;
        self.blobs
            .write()
            .map_err(poisoned)?
            .insert((*record, name.to_string()), data.to_vec());
        Ok(())
    }

    fn read(&self, record: &RecordId, name: &str) -> StoreResult<Vec<u8>> {
        self.blobs
            .read()
            .map_err(poisoned)?
            .get(&(*record, name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::BlobNotFound(blob_key(record, name)))
    }

    fn exists(&self, record: &RecordId, name: &str) -> StoreResult<bool> {
        Ok(self
            .blobs
            .read()
            .map_err(poisoned)?
            .contains_key(&(*record, name.to_string())))
    }

    fn delete(&self, record: &RecordId, name: &str) -> StoreResult<()> {
        self.check_writable(record)?;
        self.blobs
            .write()
            .map_err(poisoned)?
            .remove(&(*record, name.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::BlobNotFound(blob_key(record, name)))
    }

    fn seal(&self, record: &RecordId) -> StoreResult<()> {
        self.sealed.write().map_err(poisoned)?.insert(*record);
        Ok(())
    }

    fn is_sealed(&self, record: &RecordId) -> StoreResult<bool> {
        Ok(self.sealed.read().map_err(poisoned)?.contains(record))
    }
}
