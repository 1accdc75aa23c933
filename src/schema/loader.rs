//! Schema documents and where they come from
//!
//! - `BundledSchemas`: the documents compiled into the crate
//! - `SchemaLoader`: documents read from a host directory, one `<type>.json` per record type
//!
//! Both check the document structure before handing it out.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use super::errors::{SchemaError, SchemaResult};
use super::types::{RecordType, Schema};

const KINDS_DOCUMENT: &str = include_str!("documents/kinds.json");
const SYMMETRY_DOCUMENT: &str = include_str!("documents/symmetry.json");

/// Supplies the schema document for a record type.
pub trait SchemaProvider: Send + Sync {
    /// Loads the schema for `record_type`.
    fn load_schema(&self, record_type: RecordType) -> SchemaResult<Schema>;
}

/// Parses and checks a schema document.
fn parse_document(source: &str, content: &str, record_type: RecordType) -> SchemaResult<Schema> {
    let schema: Schema = serde_json::from_str(content)
        .map_err(|e| SchemaError::malformed_schema(source, format!("Invalid JSON: {}", e)))?;

    schema
        .validate_for(record_type)
        .map_err(|e| SchemaError::malformed_schema(source, e))?;

    Ok(schema)
}

/// The schema documents shipped with the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledSchemas;

impl SchemaProvider for BundledSchemas {
    fn load_schema(&self, record_type: RecordType) -> SchemaResult<Schema> {
        let content = match record_type {
            RecordType::Kinds => KINDS_DOCUMENT,
            RecordType::Symmetry => SYMMETRY_DOCUMENT,
        };
        parse_document(&format!("<bundled>/{}", record_type.document_name()), content, record_type)
    }
}

/// Schema loader that reads documents from a directory.
#[derive(Debug, Clone)]
pub struct SchemaLoader {
    /// Directory containing schema files
    schema_dir: PathBuf,
}

impl SchemaLoader {
    /// Creates a loader for documents under `schema_dir`.
    pub fn new(schema_dir: impl Into<PathBuf>) -> Self {
        Self {
            schema_dir: schema_dir.into(),
        }
    }

    /// Path of the document for `record_type`.
    pub fn document_path(&self, record_type: RecordType) -> PathBuf {
        self.schema_dir.join(record_type.document_name())
    }
}

impl SchemaProvider for SchemaLoader {
    fn load_schema(&self, record_type: RecordType) -> SchemaResult<Schema> {
        let path = self.document_path(record_type);

        if !path.exists() {
            return Err(SchemaError::unknown_schema(record_type.name()));
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            SchemaError::malformed_schema(path.display().to_string(), format!("Failed to read file: {}", e))
        })?;

        let schema = parse_document(&path.display().to_string(), &content, record_type)?;
        debug!(record_type = %record_type, path = %path.display(), "schema document read");
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldType, SchemaErrorCode};
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_bundled_documents_parse() {
        let kinds = BundledSchemas.load_schema(RecordType::Kinds).unwrap();
        assert_eq!(kinds.schema_id, "kinds");
        assert!(kinds.additional_fields.is_some());

        let symmetry = BundledSchemas.load_schema(RecordType::Symmetry).unwrap();
        assert_eq!(symmetry.schema_id, "symmetry");
        assert!(symmetry.fields["space_group"].nullable);
        assert!(symmetry.additional_fields.is_none());
    }

    #[test]
    fn test_load_host_document() {
        let temp_dir = TempDir::new().unwrap();
        let loader = SchemaLoader::new(temp_dir.path());

        let mut fields = HashMap::new();
        fields.insert("kind_names".into(), FieldDef::required_array(FieldType::String));
        fields.insert("mass".into(), FieldDef::optional_array(FieldType::Float));
        let schema = Schema::new("kinds", "2", fields);
        fs::write(
            loader.document_path(RecordType::Kinds),
            serde_json::to_string_pretty(&schema).unwrap(),
        )
        .unwrap();

        let loaded = loader.load_schema(RecordType::Kinds).unwrap();
        assert_eq!(loaded, schema);
    }

    #[test]
    fn test_missing_document_is_unknown() {
        let temp_dir = TempDir::new().unwrap();
        let loader = SchemaLoader::new(temp_dir.path());

        let err = loader.load_schema(RecordType::Kinds).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::StructSchemaUnknown);
    }

    #[test]
    fn test_malformed_document() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("kinds.json"), "{ not json").unwrap();
        let loader = SchemaLoader::new(temp_dir.path());

        let err = loader.load_schema(RecordType::Kinds).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::StructSchemaMalformed);
    }

    #[test]
    fn test_document_for_wrong_type_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let loader = SchemaLoader::new(temp_dir.path());
        fs::write(loader.document_path(RecordType::Kinds), SYMMETRY_DOCUMENT).unwrap();

        let err = loader.load_schema(RecordType::Kinds).unwrap_err();
        assert!(err.message().contains("does not match"));
    }
}
