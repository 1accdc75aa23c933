//! Schema type definitions
//!
//! Supported types:
//! - string: UTF-8 string
//! - int: 64-bit signed integer
//! - bool: Boolean
//! - float: 64-bit floating point (integers accepted)
//! - any: any JSON value, including null
//! - object: Nested object with field schema
//! - array: Homogeneous array with element type

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The record types that carry a schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    /// Per-kind columnar metadata
    Kinds,
    /// Symmetry operations and descriptive attributes
    Symmetry,
}

impl RecordType {
    /// Schema identifier, also the document stem on disk
    pub fn name(&self) -> &'static str {
        match self {
            RecordType::Kinds => "kinds",
            RecordType::Symmetry => "symmetry",
        }
    }

    /// File name of the schema document
    pub fn document_name(&self) -> String {
        format!("{}.json", self.name())
    }

    /// Field every schema of this type must declare as required
    pub fn index_field(&self) -> &'static str {
        match self {
            RecordType::Kinds => "kind_names",
            RecordType::Symmetry => "operations",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Supported field types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
    /// Boolean
    Bool,
    /// 64-bit floating point
    Float,
    /// Unconstrained value
    Any,
    /// Nested object with its own field schema
    Object {
        /// Nested field definitions
        fields: HashMap<String, FieldDef>,
    },
    /// Homogeneous array with single element type
    Array {
        /// Element type (boxed to allow recursive types)
        element_type: Box<FieldType>,
    },
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::Float => "float",
            FieldType::Any => "any",
            FieldType::Object { .. } => "object",
            FieldType::Array { .. } => "array",
        }
    }

    /// Array of the given element type
    pub fn array_of(element_type: FieldType) -> Self {
        FieldType::Array {
            element_type: Box::new(element_type),
        }
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field data type
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether field must be present
    #[serde(default)]
    pub required: bool,
    /// Whether an explicit null is accepted
    #[serde(default)]
    pub nullable: bool,
}

impl FieldDef {
    fn with(field_type: FieldType, required: bool) -> Self {
        Self {
            field_type,
            required,
            nullable: false,
        }
    }

    /// Create a required array field
    pub fn required_array(element_type: FieldType) -> Self {
        Self::with(FieldType::array_of(element_type), true)
    }

    /// Create an optional array field
    pub fn optional_array(element_type: FieldType) -> Self {
        Self::with(FieldType::array_of(element_type), false)
    }
}

/// Complete schema definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Unique schema identifier
    pub schema_id: String,
    /// Schema version
    pub schema_version: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Field definitions
    pub fields: HashMap<String, FieldDef>,
    /// Definition applied to every field not listed in `fields`.
    /// When absent, undeclared fields are rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_fields: Option<FieldDef>,
}

impl Schema {
    /// Create a new closed schema
    pub fn new(
        schema_id: impl Into<String>,
        schema_version: impl Into<String>,
        fields: HashMap<String, FieldDef>,
    ) -> Self {
        Self {
            schema_id: schema_id.into(),
            schema_version: schema_version.into(),
            description: None,
            fields,
            additional_fields: None,
        }
    }

    /// Open the schema to undeclared fields of the given definition
    pub fn with_additional_fields(mut self, def: FieldDef) -> Self {
        self.additional_fields = Some(def);
        self
    }

    /// Definition governing `name`, if the schema admits it at all
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name).or(self.additional_fields.as_ref())
    }

    /// Validates the schema structure itself (not a payload)
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.schema_id.is_empty() {
            return Err("Schema must have a non-empty 'schema_id'".into());
        }

        if self.fields.is_empty() {
            return Err("Schema must declare at least one field".into());
        }

        if let Some(extra) = &self.additional_fields {
            if extra.required {
                return Err("'additional_fields' cannot be required".into());
            }
        }

        Ok(())
    }

    /// Validates the structure plus the requirements of a record type
    pub fn validate_for(&self, record_type: RecordType) -> Result<(), String> {
        self.validate_structure()?;

        if self.schema_id != record_type.name() {
            return Err(format!(
                "schema_id '{}' does not match record type '{}'",
                self.schema_id, record_type
            ));
        }

        let index = record_type.index_field();
        match self.fields.get(index) {
            Some(def) if def.required && matches!(def.field_type, FieldType::Array { .. }) => Ok(()),
            _ => Err(format!("'{}' must be declared as a required array", index)),
        }
    }
}
