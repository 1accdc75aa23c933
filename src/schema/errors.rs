//! Schema error types
//!
//! Error codes:
//! - STRUCT_SCHEMA_UNKNOWN (FATAL)
//! - STRUCT_SCHEMA_MALFORMED (FATAL)
//! - STRUCT_SCHEMA_ALREADY_LOADED (REJECT)
//! - STRUCT_SCHEMA_VALIDATION_FAILED (REJECT)

use std::fmt;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Payload or request rejected, nothing was mutated
    Reject,
    /// Schema resources are unusable; no record of this type can be written
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// No schema document exists for the record type
    StructSchemaUnknown,
    /// Schema document could not be read or parsed
    StructSchemaMalformed,
    /// Provider installed after schemas were already loaded
    StructSchemaAlreadyLoaded,
    /// Payload violates schema
    StructSchemaValidationFailed,
}

impl SchemaErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::StructSchemaUnknown => "STRUCT_SCHEMA_UNKNOWN",
            SchemaErrorCode::StructSchemaMalformed => "STRUCT_SCHEMA_MALFORMED",
            SchemaErrorCode::StructSchemaAlreadyLoaded => "STRUCT_SCHEMA_ALREADY_LOADED",
            SchemaErrorCode::StructSchemaValidationFailed => "STRUCT_SCHEMA_VALIDATION_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            SchemaErrorCode::StructSchemaUnknown | SchemaErrorCode::StructSchemaMalformed => {
                Severity::Fatal
            }
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Validation failure details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetails {
    /// Field path (e.g., "operations[3][1]")
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// Actual value or type found
    pub actual: String,
}

impl ValidationDetails {
    pub fn new(field: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(field, "field to be present", "missing")
    }

    pub fn extra_field(field: impl Into<String>) -> Self {
        Self::new(field, "no undeclared fields", "extra field present")
    }

    pub fn type_mismatch(field: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::new(field, expected, actual)
    }

    pub fn null_value(field: impl Into<String>) -> Self {
        Self::new(field, "non-null value", "null")
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}': expected {}, got {}", self.field, self.expected, self.actual)
    }
}

/// Schema error type with full context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    /// Schema ID if applicable
    schema_id: Option<String>,
    /// Validation details if applicable
    details: Option<ValidationDetails>,
}

impl SchemaError {
    /// Create an unknown schema error
    pub fn unknown_schema(schema_id: impl Into<String>) -> Self {
        let id = schema_id.into();
        Self {
            code: SchemaErrorCode::StructSchemaUnknown,
            message: format!("No schema document for record type '{}'", id),
            schema_id: Some(id),
            details: None,
        }
    }

    /// Create an error for a malformed schema document
    pub fn malformed_schema(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::StructSchemaMalformed,
            message: format!("Malformed schema document '{}': {}", source.into(), reason.into()),
            schema_id: None,
            details: None,
        }
    }

    /// Create an error for a provider installed too late
    pub fn already_loaded() -> Self {
        Self {
            code: SchemaErrorCode::StructSchemaAlreadyLoaded,
            message: "Schema provider must be installed before the first schema lookup".into(),
            schema_id: None,
            details: None,
        }
    }

    /// Create a validation failed error
    pub fn validation_failed(schema_id: impl Into<String>, details: ValidationDetails) -> Self {
        Self {
            code: SchemaErrorCode::StructSchemaValidationFailed,
            message: format!("Payload validation failed: {}", details),
            schema_id: Some(schema_id.into()),
            details: Some(details),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the schema ID if applicable
    pub fn schema_id(&self) -> Option<&str> {
        self.schema_id.as_deref()
    }

    /// Returns validation details if applicable
    pub fn details(&self) -> Option<&ValidationDetails> {
        self.details.as_ref()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
