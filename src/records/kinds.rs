//! Per-kind metadata stored column-wise
//!
//! Every field is an array aligned to `kind_names`: position `i` of each
//! array belongs to kind `kind_names[i]`. The row view (`kind_dict`) and the
//! column view (`field_dict`) are recomputed from the attribute store on
//! every call and never cached.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::info;

use super::base::{check_schema, payload_object, replace_attributes, ValidatedRecord};
use super::errors::{RecordError, RecordResult};
use crate::schema::RecordType;
use crate::store::{AttributeStore, Attributes, MemoryAttributes, RecordId};

/// Name of the index field every other field is aligned to
pub const KIND_NAMES: &str = "kind_names";

/// Nested view: outer key -> inner key -> value
pub type NestedView = BTreeMap<String, Attributes>;

/// Columnar per-kind metadata
#[derive(Debug)]
pub struct KindRecord<A: AttributeStore = MemoryAttributes> {
    id: RecordId,
    attributes: A,
}

impl KindRecord<MemoryAttributes> {
    /// Unsaved record backed by an in-memory attribute store
    pub fn in_memory() -> Self {
        Self::new(MemoryAttributes::new())
    }
}

impl<A: AttributeStore> KindRecord<A> {
    /// New record with a fresh identity over `attributes`
    pub fn new(attributes: A) -> Self {
        Self::with_id(RecordId::new(), attributes)
    }

    /// Record with a host-assigned identity
    pub fn with_id(id: RecordId, attributes: A) -> Self {
        Self { id, attributes }
    }

    pub fn attributes(&self) -> &A {
        &self.attributes
    }

    /// The alignment index
    pub fn kind_names(&self) -> RecordResult<Vec<String>> {
        let value = self
            .attributes
            .get(KIND_NAMES)?
            .ok_or_else(|| RecordError::NotSet(KIND_NAMES.into()))?;
        parse_kind_names(&value)
    }

    /// Row view: `kind -> {field: value}`
    pub fn kind_dict(&self) -> RecordResult<NestedView> {
        let (kind_names, fields) = self.split_index()?;

        let mut view: NestedView = kind_names.iter().map(|k| (k.clone(), Attributes::new())).collect();
        for (field, values) in fields {
            let values = as_column(&field, values)?;
            for (kind, value) in kind_names.iter().zip(values) {
                if let Some(row) = view.get_mut(kind) {
                    row.insert(field.clone(), value);
                }
            }
        }
        Ok(view)
    }

    /// Column view: `field -> {kind: value}`
    pub fn field_dict(&self) -> RecordResult<NestedView> {
        let (kind_names, fields) = self.split_index()?;

        let mut view = NestedView::new();
        for (field, values) in fields {
            let values = as_column(&field, values)?;
            let column: Attributes = kind_names.iter().cloned().zip(values).collect();
            view.insert(field, column);
        }
        Ok(view)
    }

    fn split_index(&self) -> RecordResult<(Vec<String>, Attributes)> {
        let mut fields = self.attributes.list()?;
        let index = fields
            .remove(KIND_NAMES)
            .ok_or_else(|| RecordError::NotSet(KIND_NAMES.into()))?;
        Ok((parse_kind_names(&index)?, fields))
    }
}

fn parse_kind_names(value: &Value) -> RecordResult<Vec<String>> {
    serde_json::from_value(value.clone())
        .map_err(|e| RecordError::ShapeMismatch(format!("'{}' is not a list of strings: {}", KIND_NAMES, e)))
}

fn as_column(field: &str, values: Value) -> RecordResult<Vec<Value>> {
    match values {
        Value::Array(values) => Ok(values),
        _ => Err(RecordError::ShapeMismatch(format!("'{}' is not an array", field))),
    }
}

/// Every non-index field must have exactly one entry per kind.
fn check_alignment(payload: &Attributes) -> RecordResult<()> {
    let expected = payload
        .get(KIND_NAMES)
        .and_then(Value::as_array)
        .map(Vec::len)
        .ok_or_else(|| RecordError::ShapeMismatch(format!("'{}' is not an array", KIND_NAMES)))?;

    for (key, value) in payload {
        let len = value
            .as_array()
            .map(Vec::len)
            .ok_or_else(|| RecordError::ShapeMismatch(format!("'{}' is not an array", key)))?;

        if len != expected {
            return Err(RecordError::ShapeMismatch(format!(
                "'{}' array length {} != {} length {}",
                key, len, KIND_NAMES, expected
            )));
        }
    }
    Ok(())
}

impl<A: AttributeStore> ValidatedRecord for KindRecord<A> {
    const RECORD_TYPE: RecordType = RecordType::Kinds;

    fn id(&self) -> RecordId {
        self.id
    }

    fn validate_payload(payload: &Value) -> RecordResult<()> {
        check_schema(Self::RECORD_TYPE, payload)?;
        check_alignment(payload_object(payload)?)
    }

    fn set_data(&mut self, payload: &Value) -> RecordResult<()> {
        Self::validate_payload(payload)?;
        let staged = payload_object(payload)?;

        replace_attributes(&self.id, &mut self.attributes, staged)?;
        info!(record = %self.id, record_type = %Self::RECORD_TYPE, fields = staged.len(), "kind data set");
        Ok(())
    }

    fn data(&self) -> RecordResult<Attributes> {
        Ok(self.attributes.list()?)
    }

    fn validate(&self) -> RecordResult<()> {
        let current = Value::Object(self.attributes.list()?);
        Self::validate_payload(&current).map_err(RecordError::into_validation)
    }

    fn store(&mut self) -> RecordResult<()> {
        self.validate()?;
        self.attributes.seal()?;
        info!(record = %self.id, record_type = %Self::RECORD_TYPE, "record sealed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "kind_names": ["Fe1", "Fe2", "O"],
            "magnetic_moment": [2.5, -2.5, 0.0],
            "charge": [3, 3, -2]
        })
    }

    #[test]
    fn test_alignment_accepts_equal_lengths() {
        let payload = sample();
        assert!(check_alignment(payload.as_object().unwrap()).is_ok());
    }

    #[test]
    fn test_alignment_names_offending_field() {
        let payload = json!({"kind_names": ["A", "B"], "mass": [1.0]});
        let err = check_alignment(payload.as_object().unwrap()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Shape mismatch: 'mass' array length 1 != kind_names length 2"
        );
    }

    #[test]
    fn test_views_on_unset_record() {
        let record = KindRecord::in_memory();
        assert!(matches!(record.kind_dict(), Err(RecordError::NotSet(_))));
        assert!(matches!(record.field_dict(), Err(RecordError::NotSet(_))));
        assert!(matches!(record.kind_names(), Err(RecordError::NotSet(_))));
    }

    #[test]
    fn test_views_are_inverse() {
        let mut record = KindRecord::in_memory();
        record.set_data(&sample()).unwrap();

        let kinds = record.kind_dict().unwrap();
        let fields = record.field_dict().unwrap();

        for (kind, row) in &kinds {
            for (field, value) in row {
                assert_eq!(&fields[field][kind.as_str()], value);
            }
        }
        assert_eq!(kinds.len(), 3);
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_kind_names_preserve_order() {
        let mut record = KindRecord::in_memory();
        record.set_data(&sample()).unwrap();
        assert_eq!(record.kind_names().unwrap(), vec!["Fe1", "Fe2", "O"]);
    }

    #[test]
    fn test_index_only_record() {
        let mut record = KindRecord::in_memory();
        record.set_data(&json!({"kind_names": ["Si"]})).unwrap();

        assert_eq!(
            serde_json::to_value(record.kind_dict().unwrap()).unwrap(),
            json!({"Si": {}})
        );
        assert!(record.field_dict().unwrap().is_empty());
    }
}
