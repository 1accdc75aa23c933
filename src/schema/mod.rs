//! Schema subsystem
//!
//! Every record payload is checked against the schema document of its record
//! type before anything is written.
//!
//! # Design Principles
//!
//! - Validation happens before any store mutation
//! - One schema per record type, cached process-wide
//! - No defaults or coercion
//! - Deterministic validation

mod errors;
mod loader;
mod registry;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity, ValidationDetails};
pub use loader::{BundledSchemas, SchemaLoader, SchemaProvider};
pub use registry::{install_schema_provider, schema_for};
pub use types::{FieldDef, FieldType, RecordType, Schema};
pub use validator::SchemaValidator;

pub(crate) use validator::json_type_name;
