//! Shared write and validate protocol for schema-checked records
//!
//! `set_data` on every record type follows the same order:
//!
//! 1. validate the new payload completely (nothing is touched on failure)
//! 2. stage the attribute bag in memory
//! 3. swap it into the attribute store with [`replace_attributes`]
//!
//! # Rollback guarantee
//!
//! When the store offers an atomic batch replace, step 3 is a single call and
//! either fully applies or fails without effect.
//!
//! Otherwise the swap is `clear_all` followed by one `set` per key. If that
//! fails part way, the previous bag is restored with the same two calls. When
//! the restore is refused because the record is sealed, the refusal is
//! swallowed and the record may be left empty or partially written. The
//! original write error is returned in every case, so the caller cannot tell
//! a clean restore from an abandoned one.

use serde_json::Value;
use tracing::{debug, info, warn};

use super::errors::{RecordError, RecordResult};
use crate::schema::{schema_for, RecordType, Schema, SchemaValidator};
use crate::store::{AttributeStore, Attributes, RecordId, StoreResult};

/// A record whose attribute bag is checked against a schema.
pub trait ValidatedRecord {
    /// Record type selecting the schema document
    const RECORD_TYPE: RecordType;

    /// Identity of the record in the host stores
    fn id(&self) -> RecordId;

    /// The record type's schema, loaded on first use.
    fn get_schema() -> RecordResult<&'static Schema> {
        Ok(schema_for(Self::RECORD_TYPE)?)
    }

    /// Checks a payload without touching any store.
    fn validate_payload(payload: &Value) -> RecordResult<()> {
        check_schema(Self::RECORD_TYPE, payload)
    }

    /// Replaces the record's data with `payload`.
    fn set_data(&mut self, payload: &Value) -> RecordResult<()>;

    /// Snapshot of the record's data
    fn data(&self) -> RecordResult<Attributes>;

    /// Re-checks the stored state before the host commits the record.
    ///
    /// Fails with `RecordError::Validation` when the record is inconsistent.
    fn validate(&self) -> RecordResult<()>;

    /// Validates the record, then seals it so every later mutation fails with
    /// `RecordError::Immutable`.
    fn store(&mut self) -> RecordResult<()>;
}

/// Checks `payload` against the schema of `record_type`.
pub fn check_schema(record_type: RecordType, payload: &Value) -> RecordResult<()> {
    let schema = schema_for(record_type)?;
    SchemaValidator::new(schema).validate_payload(payload)?;
    Ok(())
}

/// Object form of a payload that already passed schema validation.
pub(crate) fn payload_object(payload: &Value) -> RecordResult<&Attributes> {
    payload
        .as_object()
        .ok_or_else(|| RecordError::ShapeMismatch("payload is not an object".into()))
}

/// Swaps `staged` into `store`, restoring the previous bag on failure when the
/// store has no atomic batch replace.
pub fn replace_attributes<A>(record: &RecordId, store: &mut A, staged: &Attributes) -> RecordResult<()>
where
    A: AttributeStore + ?Sized,
{
    if let Some(result) = store.replace_all(staged) {
        result?;
        debug!(record = %record, keys = staged.len(), atomic = true, "attributes replaced");
        return Ok(());
    }

    let snapshot = store.list()?;

    let primary = match write_all(store, staged) {
        Ok(()) => {
            debug!(record = %record, keys = staged.len(), atomic = false, "attributes replaced");
            return Ok(());
        }
        Err(err) => err,
    };

    warn!(record = %record, error = %primary, "attribute write failed, restoring previous attributes");

    match write_all(store, &snapshot) {
        Ok(()) => info!(record = %record, keys = snapshot.len(), "previous attributes restored"),
        Err(err) if err.is_immutable() => {
            warn!(record = %record, error = %err, "rollback abandoned, record is sealed");
        }
        Err(err) => {
            warn!(record = %record, error = %err, "rollback failed");
        }
    }

    Err(primary.into())
}

fn write_all<A>(store: &mut A, attributes: &Attributes) -> StoreResult<()>
where
    A: AttributeStore + ?Sized,
{
    store.clear_all()?;
    for (key, value) in attributes {
        store.set(key, value.clone())?;
    }
    Ok(())
}
