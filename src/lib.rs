//! structdata - schema-validated records for crystal structure workflows
//!
//! Two record types share one write protocol:
//! - `KindRecord`: per-kind metadata arrays aligned to `kind_names`, with row
//!   and column views
//! - `SymmetryRecord`: symmetry operations stored as a blob plus descriptive
//!   attributes, with a tolerant operation comparison
//!
//! Attribute and blob persistence are supplied by the host through the
//! `AttributeStore` and `BlobStore` traits.

pub mod config;
pub mod records;
pub mod schema;
pub mod store;

pub use config::RecordsConfig;
pub use records::{KindRecord, RecordError, RecordResult, SymmetryRecord, ValidatedRecord};
