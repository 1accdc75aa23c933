//! Symmetry of a crystal structure
//!
//! The operations matrix lives in a blob ([`OPERATIONS_BLOB`]); everything
//! else, plus the derived `num_symops`, lives in the attribute bag.
//!
//! `set_data` replaces the attributes first (with the rollback of
//! [`replace_attributes`]) and writes the blob afterwards. The blob write is
//! outside that rollback: if it fails, `num_symops` already describes the new
//! operations while the blob still holds the old ones (or none). `validate`
//! reports that state, so such a record cannot be committed.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use super::base::{check_schema, payload_object, replace_attributes, ValidatedRecord};
use super::errors::{RecordError, RecordResult};
use super::operations::{
    decode_operations, encode_operations, parse_operations, Operations, OperationsDiff,
    OperationsMatrix, OPERATIONS_BLOB,
};
use crate::schema::RecordType;
use crate::store::{AttributeStore, Attributes, BlobStore, MemoryAttributes, RecordId};

/// Payload key of the operations matrix
pub const OPERATIONS: &str = "operations";

/// Attribute caching the number of operations
pub const NUM_SYMOPS: &str = "num_symops";

/// Attribute holding the space group number
pub const SPACE_GROUP: &str = "space_group";

/// Symmetry operations and descriptive attributes of a structure
#[derive(Debug)]
pub struct SymmetryRecord<'b, B: BlobStore + ?Sized, A: AttributeStore = MemoryAttributes> {
    id: RecordId,
    attributes: A,
    blobs: &'b B,
}

impl<'b, B: BlobStore + ?Sized> SymmetryRecord<'b, B, MemoryAttributes> {
    /// Unsaved record with in-memory attributes and blobs in `blobs`
    pub fn in_memory(blobs: &'b B) -> Self {
        Self::new(blobs, MemoryAttributes::new())
    }
}

impl<'b, B: BlobStore + ?Sized, A: AttributeStore> SymmetryRecord<'b, B, A> {
    /// New record with a fresh identity
    pub fn new(blobs: &'b B, attributes: A) -> Self {
        Self::with_id(RecordId::new(), blobs, attributes)
    }

    /// Record with a host-assigned identity
    pub fn with_id(id: RecordId, blobs: &'b B, attributes: A) -> Self {
        Self { id, attributes, blobs }
    }

    pub fn attributes(&self) -> &A {
        &self.attributes
    }

    /// Stored operations as floats.
    ///
    /// Fails with `RecordError::NotSet` when no operations were ever written;
    /// an empty list is returned only if an empty list was set.
    pub fn operations(&self) -> RecordResult<Operations> {
        Ok(self.stored_matrix()?.to_float())
    }

    fn stored_matrix(&self) -> RecordResult<OperationsMatrix> {
        if !self.blobs.exists(&self.id, OPERATIONS_BLOB)? {
            return Err(RecordError::NotSet(format!(
                "symmetry operations not set for record {}",
                self.id
            )));
        }

        let blob = self.blobs.read(&self.id, OPERATIONS_BLOB)?;
        decode_operations(&blob)
    }

    /// Cached operation count of the last successful `set_data`
    pub fn num_symops(&self) -> RecordResult<Option<u64>> {
        Ok(self.attributes.get(NUM_SYMOPS)?.and_then(|v| v.as_u64()))
    }

    /// Space group number, if set and not null
    pub fn space_group(&self) -> RecordResult<Option<i64>> {
        Ok(self.attributes.get(SPACE_GROUP)?.and_then(|v| v.as_i64()))
    }

    /// Attaching arbitrary files is disabled: operations are written only
    /// through `set_data`.
    pub fn add_path(&mut self, _source: &Path, _name: &str) -> RecordResult<()> {
        Err(RecordError::OperationNotAllowed(
            "cannot add files or directories to a symmetry record".into(),
        ))
    }

    /// Compares `candidate` against the stored operations after rounding every
    /// component to `precision` decimal digits.
    pub fn compare_operations(&self, candidate: &[Vec<f64>], precision: u32) -> RecordResult<OperationsDiff> {
        let stored = self.operations()?;
        Ok(OperationsDiff::between(&stored, candidate, precision))
    }

    fn write_operations(&self, operations: &OperationsMatrix) -> RecordResult<()> {
        let blob = encode_operations(operations)?;
        self.blobs.write(&self.id, OPERATIONS_BLOB, &blob)?;
        debug!(record = %self.id, bytes = blob.len(), "operations blob written");
        Ok(())
    }
}

/// Schema check plus the arity check the schema leaves to code.
fn validated_operations(payload: &Value) -> RecordResult<OperationsMatrix> {
    check_schema(RecordType::Symmetry, payload)?;
    let operations = payload_object(payload)?
        .get(OPERATIONS)
        .ok_or_else(|| RecordError::NotSet(OPERATIONS.into()))?;
    parse_operations(operations)
}

impl<'b, B: BlobStore + ?Sized, A: AttributeStore> ValidatedRecord for SymmetryRecord<'b, B, A> {
    const RECORD_TYPE: RecordType = RecordType::Symmetry;

    fn id(&self) -> RecordId {
        self.id
    }

    fn validate_payload(payload: &Value) -> RecordResult<()> {
        validated_operations(payload).map(|_| ())
    }

    fn set_data(&mut self, payload: &Value) -> RecordResult<()> {
        let operations = validated_operations(payload)?;
        let object = payload_object(payload)?;

        let mut staged: Attributes = object
            .iter()
            .filter(|(key, _)| key.as_str() != OPERATIONS)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        staged.insert(NUM_SYMOPS.into(), Value::from(operations.len()));

        replace_attributes(&self.id, &mut self.attributes, &staged)?;
        self.write_operations(&operations)?;

        info!(
            record = %self.id,
            record_type = %Self::RECORD_TYPE,
            num_symops = operations.len(),
            "symmetry data set"
        );
        Ok(())
    }

    /// Attributes without the `num_symops` cache, plus the decoded operations
    /// in the number type they were written with.
    fn data(&self) -> RecordResult<Attributes> {
        let mut data = self.attributes.list()?;
        data.remove(NUM_SYMOPS);
        data.insert(OPERATIONS.into(), self.stored_matrix()?.to_value());
        Ok(data)
    }

    fn validate(&self) -> RecordResult<()> {
        if !self.blobs.exists(&self.id, OPERATIONS_BLOB)? {
            return Err(RecordError::Validation("operations not set".into()));
        }

        let data = self.data().map_err(RecordError::into_validation)?;
        Self::validate_payload(&Value::Object(data)).map_err(RecordError::into_validation)?;

        let stored = self.stored_matrix().map_err(RecordError::into_validation)?.len() as u64;
        match self.num_symops()? {
            Some(count) if count == stored => Ok(()),
            count => Err(RecordError::Validation(format!(
                "num_symops {:?} does not match {} stored operations",
                count, stored
            ))),
        }
    }

    fn store(&mut self) -> RecordResult<()> {
        self.validate()?;
        self.attributes.seal()?;
        self.blobs.seal(&self.id)?;
        info!(record = %self.id, record_type = %Self::RECORD_TYPE, "record sealed");
        Ok(())
    }
}
