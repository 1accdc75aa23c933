//! # Attribute Store
//!
//! The per-record key-value namespace holding scalar and array metadata.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::errors::{StoreError, StoreResult};

/// A record's attribute bag
pub type Attributes = Map<String, Value>;

/// Attribute namespace of a single record.
///
/// Mutations fail with `StoreError::Immutable` once the record is sealed.
pub trait AttributeStore {
    /// Snapshot of every attribute
    fn list(&self) -> StoreResult<Attributes>;

    /// Single attribute, if present
    fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.list()?.remove(key))
    }

    /// Remove every attribute
    fn clear_all(&mut self) -> StoreResult<()>;

    /// Set one attribute, overwriting any previous value
    fn set(&mut self, key: &str, value: Value) -> StoreResult<()>;

    /// Replace the whole bag in one step.
    ///
    /// Returns `None` when the store has no atomic batch primitive; callers
    /// then fall back to `clear_all` followed by `set`.
    fn replace_all(&mut self, _attributes: &Attributes) -> Option<StoreResult<()>> {
        None
    }

    /// Make the namespace read-only
    fn seal(&mut self) -> StoreResult<()>;

    /// Whether the namespace is read-only
    fn is_sealed(&self) -> bool;
}

/// In-memory attribute store
#[derive(Debug, Clone, Default)]
pub struct MemoryAttributes {
    values: Attributes,
    sealed_at: Option<DateTime<Utc>>,
}

impl MemoryAttributes {
    /// Create an empty, unsealed store
    pub fn new() -> Self {
        Self::default()
    }

    /// When the store was sealed
    pub fn sealed_at(&self) -> Option<DateTime<Utc>> {
        self.sealed_at
    }

    fn check_writable(&self) -> StoreResult<()> {
        match self.sealed_at {
            Some(at) => Err(StoreError::Immutable(format!("attributes sealed at {}", at.to_rfc3339()))),
            None => Ok(()),
        }
    }
}

impl AttributeStore for MemoryAttributes {
    fn list(&self) -> StoreResult<Attributes> {
        Ok(self.values.clone())
    }

    fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn clear_all(&mut self) -> StoreResult<()> {
        self.check_writable()?;
        self.values.clear();
        Ok(())
    }

    fn set(&mut self, key: &str, value: Value) -> StoreResult<()> {
        self.check_writable()?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn replace_all(&mut self, attributes: &Attributes) -> Option<StoreResult<()>> {
        Some(self.check_writable().map(|()| {
            self.values = attributes.clone();
        }))
    }

    fn seal(&mut self) -> StoreResult<()> {
        if self.sealed_at.is_none() {
            self.sealed_at = Some(Utc::now());
        }
        Ok(())
    }

    fn is_sealed(&self) -> bool {
        self.sealed_at.is_some()
    }
}
