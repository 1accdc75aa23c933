//! Schema validator for record payloads
//!
//! Validation semantics:
//! - All required fields are present
//! - Undeclared fields are rejected unless the schema declares `additional_fields`
//! - Field types match schema types without coercion (ints are accepted as floats)
//! - Nulls are rejected unless the field is nullable or of type `any`
//!
//! The validator never mutates the payload and is deterministic.

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::errors::{SchemaError, SchemaResult, ValidationDetails};
use super::types::{FieldDef, FieldType, Schema};

/// Schema validator bound to one schema document.
pub struct SchemaValidator<'a> {
    schema: &'a Schema,
}

impl<'a> SchemaValidator<'a> {
    /// Creates a new validator for the given schema.
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Validates a payload against the schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` with code `STRUCT_SCHEMA_VALIDATION_FAILED` carrying
    /// the path of the first offending field.
    pub fn validate_payload(&self, payload: &Value) -> SchemaResult<()> {
        let obj = payload.as_object().ok_or_else(|| {
            self.error(ValidationDetails::type_mismatch("$root", "object", json_type_name(payload)))
        })?;

        self.validate_object(obj, &self.schema.fields, self.schema.additional_fields.as_ref(), "")
    }

    fn validate_object(
        &self,
        obj: &Map<String, Value>,
        fields: &HashMap<String, FieldDef>,
        additional: Option<&FieldDef>,
        path_prefix: &str,
    ) -> SchemaResult<()> {
        // Sorted so the reported field is the same on every run
        let mut keys: Vec<&String> = obj.keys().collect();
        keys.sort();

        for key in keys {
            if fields.contains_key(key.as_str()) {
                continue;
            }
            let field_path = make_path(path_prefix, key);
            match additional {
                Some(def) => self.validate_field(&obj[key.as_str()], def, &field_path)?,
                None => return Err(self.error(ValidationDetails::extra_field(field_path))),
            }
        }

        let mut declared: Vec<(&String, &FieldDef)> = fields.iter().collect();
        declared.sort_by(|a, b| a.0.cmp(b.0));

        for (field_name, field_def) in declared {
            let field_path = make_path(path_prefix, field_name);

            match obj.get(field_name.as_str()) {
                Some(value) => self.validate_field(value, field_def, &field_path)?,
                None if field_def.required => {
                    return Err(self.error(ValidationDetails::missing_field(field_path)));
                }
                None => {}
            }
        }

        Ok(())
    }

    fn validate_field(&self, value: &Value, def: &FieldDef, field_path: &str) -> SchemaResult<()> {
        if value.is_null() {
            if def.nullable || def.field_type == FieldType::Any {
                return Ok(());
            }
            return Err(self.error(ValidationDetails::null_value(field_path)));
        }

        self.validate_value(value, &def.field_type, field_path)
    }

    /// Validates a value against a field type.
    fn validate_value(&self, value: &Value, expected_type: &FieldType, field_path: &str) -> SchemaResult<()> {
        match expected_type {
            FieldType::String => {
                if !value.is_string() {
                    return Err(self.type_error(field_path, "string", value));
                }
            }
            FieldType::Int => {
                // Must be an integer (not a float)
                if !value.is_i64() && !value.is_u64() {
                    return Err(self.type_error(field_path, "int", value));
                }
            }
            FieldType::Bool => {
                if !value.is_boolean() {
                    return Err(self.type_error(field_path, "bool", value));
                }
            }
            FieldType::Float => {
                if !value.is_number() {
                    return Err(self.type_error(field_path, "float", value));
                }
            }
            FieldType::Any => {}
            FieldType::Object { fields } => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| self.type_error(field_path, "object", value))?;
                self.validate_object(obj, fields, None, field_path)?;
            }
            FieldType::Array { element_type } => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| self.type_error(field_path, "array", value))?;

                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}[{}]", field_path, i);

                    if elem.is_null() {
                        if **element_type == FieldType::Any {
                            continue;
                        }
                        return Err(self.error(ValidationDetails::null_value(&elem_path)));
                    }

                    self.validate_value(elem, element_type, &elem_path)?;
                }
            }
        }

        Ok(())
    }

    fn error(&self, details: ValidationDetails) -> SchemaError {
        SchemaError::validation_failed(&self.schema.schema_id, details)
    }

    fn type_error(&self, field_path: &str, expected: &str, actual: &Value) -> SchemaError {
        self.error(ValidationDetails::type_mismatch(field_path, expected, json_type_name(actual)))
    }
}

/// Returns the JSON type name for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Creates a field path from prefix and field name.
fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn symmetry_schema() -> Schema {
        let mut fields = HashMap::new();
        fields.insert(
            "operations".into(),
            FieldDef::required_array(FieldType::array_of(FieldType::Float)),
        );
        fields.insert(
            "space_group".into(),
            FieldDef {
                field_type: FieldType::Int,
                required: false,
                nullable: true,
            },
        );
        fields.insert(
            "point_group".into(),
            FieldDef {
                field_type: FieldType::String,
                required: false,
                nullable: false,
            },
        );
        Schema::new("symmetry", "1", fields)
    }

    fn kinds_schema() -> Schema {
        let mut fields = HashMap::new();
        fields.insert("kind_names".into(), FieldDef::required_array(FieldType::String));
        Schema::new("kinds", "1", fields)
            .with_additional_fields(FieldDef::optional_array(FieldType::Any))
    }

    fn failing_field(schema: &Schema, payload: Value) -> String {
        let err = SchemaValidator::new(schema).validate_payload(&payload).unwrap_err();
        err.details().unwrap().field.clone()
    }

    #[test]
    fn test_valid_symmetry_payload() {
        let schema = symmetry_schema();
        let payload = json!({
            "space_group": 1,
            "operations": [[1, 0, 0, 0, 1, 0, 0, 0, 1, 0.5, 0, 0]]
        });
        assert!(SchemaValidator::new(&schema).validate_payload(&payload).is_ok());
    }

    #[test]
    fn test_nullable_field_accepts_null() {
        let schema = symmetry_schema();
        let payload = json!({"space_group": null, "operations": []});
        assert!(SchemaValidator::new(&schema).validate_payload(&payload).is_ok());
    }

    #[test]
    fn test_non_nullable_field_rejects_null() {
        let schema = symmetry_schema();
        let field = failing_field(&schema, json!({"point_group": null, "operations": []}));
        assert_eq!(field, "point_group");
    }

    #[test]
    fn test_missing_required_field() {
        let schema = symmetry_schema();
        assert_eq!(failing_field(&schema, json!({"space_group": 1})), "operations");
    }

    #[test]
    fn test_extra_field_rejected_by_closed_schema() {
        let schema = symmetry_schema();
        let field = failing_field(&schema, json!({"operations": [], "num_symops": 0}));
        assert_eq!(field, "num_symops");
    }

    #[test]
    fn test_float_rejected_for_int() {
        let schema = symmetry_schema();
        let field = failing_field(&schema, json!({"operations": [], "space_group": 1.5}));
        assert_eq!(field, "space_group");
    }

    #[test]
    fn test_nested_element_path_reported() {
        let schema = symmetry_schema();
        let field = failing_field(&schema, json!({"operations": [[1, 0], [0, "x"]]}));
        assert_eq!(field, "operations[1][1]");
    }

    #[test]
    fn test_additional_fields_validated() {
        let schema = kinds_schema();
        let validator = SchemaValidator::new(&schema);

        let ok = json!({"kind_names": ["Fe", "O"], "charge": [2, null], "tag": ["a", 1]});
        assert!(validator.validate_payload(&ok).is_ok());

        let field = failing_field(&schema, json!({"kind_names": ["Fe"], "charge": 2}));
        assert_eq!(field, "charge");
    }

    #[test]
    fn test_root_must_be_object() {
        let schema = kinds_schema();
        assert_eq!(failing_field(&schema, json!([1, 2])), "$root");
    }

    #[test]
    fn test_validation_is_deterministic() {
        let schema = kinds_schema();
        let payload = json!({"kind_names": 3, "b": 1, "a": 2});
        let first = failing_field(&schema, payload.clone());
        for _ in 0..20 {
            assert_eq!(failing_field(&schema, payload.clone()), first);
        }
    }
}
