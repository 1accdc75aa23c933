//! # Records
//!
//! Schema-validated records persisted through host attribute and blob stores:
//! - `KindRecord`: per-kind arrays aligned to `kind_names`
//! - `SymmetryRecord`: symmetry operations (blob) plus descriptive attributes

pub mod base;
pub mod errors;
pub mod kinds;
pub mod operations;
pub mod symmetry;

pub use base::{check_schema, replace_attributes, ValidatedRecord};
pub use errors::{RecordError, RecordResult};
pub use kinds::{KindRecord, NestedView, KIND_NAMES};
pub use operations::{
    decode_operations, encode_operations, Operations, OperationsDiff, OperationsMatrix, RoundedOperation,
    DEFAULT_PRECISION, OPERATIONS_BLOB,
};
pub use symmetry::{SymmetryRecord, NUM_SYMOPS, OPERATIONS, SPACE_GROUP};
