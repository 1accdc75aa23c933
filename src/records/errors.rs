//! # Record Errors
//!
//! Validation errors (`SchemaViolation`, `ShapeMismatch`) are always raised
//! before any store is touched. Store errors raised while writing propagate
//! after the rollback attempt, whatever its outcome.

use thiserror::Error;

use crate::schema::{SchemaError, SchemaErrorCode};
use crate::store::StoreError;

/// Result type for record operations
pub type RecordResult<T> = Result<T, RecordError>;

/// Record errors
#[derive(Debug, Clone, Error)]
pub enum RecordError {
    /// Payload does not conform to the record type's schema
    #[error("Schema violation: {0}")]
    SchemaViolation(SchemaError),

    /// Schema document could not be obtained
    #[error("Schema unavailable: {0}")]
    SchemaUnavailable(SchemaError),

    /// Array lengths disagree with the index they are aligned to
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Field was never written
    #[error("Not set: {0}")]
    NotSet(String),

    /// The host sealed the record
    #[error("Record is immutable: {0}")]
    Immutable(String),

    /// Operation disabled for this record type
    #[error("Operation not allowed: {0}")]
    OperationNotAllowed(String),

    /// Stored state is inconsistent and cannot be committed
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Stored blob cannot be decoded
    #[error("Corrupt blob: {0}")]
    CorruptBlob(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl RecordError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            RecordError::SchemaViolation(_) => "RECORD_SCHEMA_VIOLATION",
            RecordError::SchemaUnavailable(_) => "RECORD_SCHEMA_UNAVAILABLE",
            RecordError::ShapeMismatch(_) => "RECORD_SHAPE_MISMATCH",
            RecordError::NotSet(_) => "RECORD_NOT_SET",
            RecordError::Immutable(_) => "RECORD_IMMUTABLE",
            RecordError::OperationNotAllowed(_) => "RECORD_OPERATION_NOT_ALLOWED",
            RecordError::Validation(_) => "RECORD_VALIDATION_FAILED",
            RecordError::CorruptBlob(_) => "RECORD_CORRUPT_BLOB",
            RecordError::Store(_) => "RECORD_STORE_ERROR",
        }
    }

    /// Converts a consistency failure of stored state into `Validation`.
    ///
    /// Store and schema-loading failures are passed through unchanged.
    pub(crate) fn into_validation(self) -> Self {
        match self {
            RecordError::SchemaViolation(_)
            | RecordError::ShapeMismatch(_)
            | RecordError::NotSet(_)
            | RecordError::CorruptBlob(_) => RecordError::Validation(self.to_string()),
            other => other,
        }
    }
}

impl From<SchemaError> for RecordError {
    fn from(err: SchemaError) -> Self {
        match err.code() {
            SchemaErrorCode::StructSchemaValidationFailed => RecordError::SchemaViolation(err),
            _ => RecordError::SchemaUnavailable(err),
        }
    }
}

impl From<StoreError> for RecordError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Immutable(what) => RecordError::Immutable(what),
            other => RecordError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValidationDetails;

    #[test]
    fn test_schema_error_classification() {
        let violation: RecordError =
            SchemaError::validation_failed("kinds", ValidationDetails::missing_field("kind_names")).into();
        assert_eq!(violation.code(), "RECORD_SCHEMA_VIOLATION");

        let unavailable: RecordError = SchemaError::unknown_schema("kinds").into();
        assert_eq!(unavailable.code(), "RECORD_SCHEMA_UNAVAILABLE");
    }

    #[test]
    fn test_store_error_classification() {
        let sealed: RecordError = StoreError::Immutable("attributes".into()).into();
        assert!(matches!(sealed, RecordError::Immutable(_)));

        let io: RecordError = StoreError::IoError("disk full".into()).into();
        assert!(matches!(io, RecordError::Store(_)));
    }

    #[test]
    fn test_into_validation() {
        let err = RecordError::ShapeMismatch("'mass' array length 1 != kind_names length 2".into());
        let converted = err.into_validation();
        assert_eq!(converted.code(), "RECORD_VALIDATION_FAILED");
        assert!(converted.to_string().contains("mass"));

        let store = RecordError::Store(StoreError::IoError("x".into())).into_validation();
        assert_eq!(store.code(), "RECORD_STORE_ERROR");
    }
}
