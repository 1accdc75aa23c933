//! Process-wide schema cache
//!
//! One schema per record type, loaded on first use and never invalidated.
//! The provider can be replaced only before the first lookup.

use once_cell::sync::OnceCell;
use tracing::info;

use super::errors::{SchemaError, SchemaResult};
use super::loader::{BundledSchemas, SchemaProvider};
use super::types::{RecordType, Schema};

static PROVIDER: OnceCell<Box<dyn SchemaProvider>> = OnceCell::new();
static KINDS_SCHEMA: OnceCell<Schema> = OnceCell::new();
static SYMMETRY_SCHEMA: OnceCell<Schema> = OnceCell::new();

/// Installs the provider used for every later schema lookup.
///
/// Fails with `STRUCT_SCHEMA_ALREADY_LOADED` once any schema has been looked up
/// or another provider was installed.
pub fn install_schema_provider(provider: impl SchemaProvider + 'static) -> SchemaResult<()> {
    PROVIDER
        .set(Box::new(provider))
        .map_err(|_| SchemaError::already_loaded())
}

fn provider() -> &'static dyn SchemaProvider {
    PROVIDER.get_or_init(|| Box::new(BundledSchemas) as Box<dyn SchemaProvider>).as_ref()
}

/// Returns the cached schema for `record_type`, loading it on first use.
pub fn schema_for(record_type: RecordType) -> SchemaResult<&'static Schema> {
    let cell = match record_type {
        RecordType::Kinds => &KINDS_SCHEMA,
        RecordType::Symmetry => &SYMMETRY_SCHEMA,
    };

    cell.get_or_try_init(|| {
        let schema = provider().load_schema(record_type)?;
        info!(
            record_type = %record_type,
            schema_version = %schema.schema_version,
            "schema loaded"
        );
        Ok(schema)
    })
}
