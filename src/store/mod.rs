//! # Record Stores
//!
//! Host-side persistence used by records:
//! - attribute stores: one small key-value namespace per record
//! - blob stores: named binary payloads per record, shared by many records

pub mod errors;
pub mod attributes;
pub mod blob;
pub mod local;

pub use errors::{StoreError, StoreResult};
pub use attributes::{AttributeStore, Attributes, MemoryAttributes};
pub use blob::{BlobStore, MemoryBlobStore};
pub use local::LocalBlobStore;

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one persisted record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Fresh random identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an identity assigned by the host
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
