//! # Store Errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Attribute and blob store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Record is sealed: {0}")]
    Immutable(String),

    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Invalid blob name: {0}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Immutable(_) => "STORE_IMMUTABLE",
            StoreError::BlobNotFound(_) => "STORE_BLOB_NOT_FOUND",
            StoreError::InvalidName(_) => "STORE_INVALID_NAME",
            StoreError::IoError(_) => "STORE_IO_ERROR",
            StoreError::Internal(_) => "STORE_INTERNAL",
        }
    }

    /// Whether the host refused the mutation because the record is sealed
    pub fn is_immutable(&self) -> bool {
        matches!(self, StoreError::Immutable(_))
    }
}
