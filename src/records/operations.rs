//! Symmetry operation matrices: blob layout and tolerant comparison
//!
//! Blob layout:
//!
//! ```text
//! +------------------+
//! | Magic            | (8 bytes, "SYMOPS01")
//! +------------------+
//! | Element Type     | (u8: 1 = i64, 2 = f64)
//! +------------------+
//! | Operation Count  | (u32 LE)
//! +------------------+
//! | Arity            | (u32 LE)
//! +------------------+
//! | Values           | (count * arity 8-byte LE values, row-major)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! The checksum is CRC32 over every byte before it. An empty operation list
//! is encoded with count and arity both zero, so "set empty" stays distinct
//! from "never set" (no blob at all).
//!
//! Operations written as integer JSON numbers are stored as integers and read
//! back as integers; any non-integer component makes the whole matrix float.

use std::collections::BTreeSet;

use crc32fast::Hasher;
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::errors::{RecordError, RecordResult};

/// Blob name of the operations matrix. One per record.
pub const OPERATIONS_BLOB: &str = "operations.bin";

/// Decimal digits used when comparing operations
pub const DEFAULT_PRECISION: u32 = 5;

const MAGIC: &[u8; 8] = b"SYMOPS01";
const HEADER_SIZE: usize = 8 + 1 + 4 + 4;
const CHECKSUM_SIZE: usize = 4;

const ELEMENT_INTEGER: u8 = 1;
const ELEMENT_FLOAT: u8 = 2;

/// Symmetry operations, each a flat affine transform of the same arity
pub type Operations = Vec<Vec<f64>>;

/// Operations matrix with the element type it was written with
#[derive(Debug, Clone, PartialEq)]
pub enum OperationsMatrix {
    Integer(Vec<Vec<i64>>),
    Float(Vec<Vec<f64>>),
}

impl OperationsMatrix {
    /// Number of operations
    pub fn len(&self) -> usize {
        match self {
            Self::Integer(rows) => rows.len(),
            Self::Float(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Components as floats, for comparison
    pub fn to_float(&self) -> Operations {
        match self {
            Self::Integer(rows) => rows
                .iter()
                .map(|row| row.iter().map(|v| *v as f64).collect())
                .collect(),
            Self::Float(rows) => rows.clone(),
        }
    }

    /// JSON form, integer numbers for an integer matrix
    pub fn to_value(&self) -> Value {
        match self {
            Self::Integer(rows) => Value::Array(rows.iter().map(|row| Value::from(row.clone())).collect()),
            Self::Float(rows) => Value::Array(rows.iter().map(|row| Value::from(row.clone())).collect()),
        }
    }

    fn element_tag(&self) -> u8 {
        match self {
            Self::Integer(_) => ELEMENT_INTEGER,
            Self::Float(_) => ELEMENT_FLOAT,
        }
    }

    fn arity(&self) -> RecordResult<usize> {
        match self {
            Self::Integer(rows) => check_arity(rows),
            Self::Float(rows) => check_arity(rows),
        }
    }
}

fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Reads an operations payload value into numeric rows of one arity.
pub fn parse_operations(value: &Value) -> RecordResult<OperationsMatrix> {
    let rows = value
        .as_array()
        .ok_or_else(|| RecordError::ShapeMismatch("'operations' is not an array".into()))?;

    let mut components = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let row = row
            .as_array()
            .ok_or_else(|| RecordError::ShapeMismatch(format!("operations[{}] is not an array", i)))?;

        for (j, v) in row.iter().enumerate() {
            if !v.is_number() {
                return Err(RecordError::ShapeMismatch(format!(
                    "operations[{}][{}] is not a number",
                    i, j
                )));
            }
        }
        components.push(row);
    }

    let all_integer = components.iter().all(|row| row.iter().all(Value::is_i64));
    let matrix = if all_integer {
        OperationsMatrix::Integer(
            components
                .iter()
                .map(|row| row.iter().filter_map(Value::as_i64).collect())
                .collect(),
        )
    } else {
        OperationsMatrix::Float(
            components
                .iter()
                .map(|row| row.iter().filter_map(Value::as_f64).collect())
                .collect(),
        )
    };

    matrix.arity()?;
    Ok(matrix)
}

/// Every operation must have the arity of the first one.
pub fn check_arity<T>(operations: &[Vec<T>]) -> RecordResult<usize> {
    let arity = operations.first().map_or(0, Vec::len);
    for (i, op) in operations.iter().enumerate() {
        if op.len() != arity {
            return Err(RecordError::ShapeMismatch(format!(
                "operations[{}] length {} != operations[0] length {}",
                i,
                op.len(),
                arity
            )));
        }
    }
    Ok(arity)
}

/// Serializes an operations matrix to the blob layout.
pub fn encode_operations(operations: &OperationsMatrix) -> RecordResult<Vec<u8>> {
    let arity = operations.arity()?;

    let count = u32::try_from(operations.len())
        .map_err(|_| RecordError::ShapeMismatch("too many operations".into()))?;
    let arity_u32 =
        u32::try_from(arity).map_err(|_| RecordError::ShapeMismatch("operation arity too large".into()))?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + operations.len() * arity * 8 + CHECKSUM_SIZE);
    buf.extend_from_slice(MAGIC);
    buf.push(operations.element_tag());
    buf.extend_from_slice(&count.to_le_bytes());
    buf.extend_from_slice(&arity_u32.to_le_bytes());
    match operations {
        OperationsMatrix::Integer(rows) => {
            for value in rows.iter().flatten() {
                buf.extend_from_slice(&value.to_le_bytes());
            }
        }
        OperationsMatrix::Float(rows) => {
            for value in rows.iter().flatten() {
                buf.extend_from_slice(&value.to_le_bytes());
            }
        }
    }

    let checksum = compute_checksum(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());

    Ok(buf)
}

fn split_rows<T: Clone>(values: Vec<T>, count: usize, arity: usize) -> Vec<Vec<T>> {
    if arity == 0 {
        return vec![Vec::new(); count];
    }
    values.chunks(arity).map(<[T]>::to_vec).collect()
}

/// Deserializes an operations blob, verifying layout and checksum.
pub fn decode_operations(data: &[u8]) -> RecordResult<OperationsMatrix> {
    if data.len() < HEADER_SIZE + CHECKSUM_SIZE {
        return Err(RecordError::CorruptBlob("operations blob too short".into()));
    }

    if &data[..8] != MAGIC {
        return Err(RecordError::CorruptBlob("operations blob has unknown magic".into()));
    }

    let element = data[8];
    let count = u32::from_le_bytes([data[9], data[10], data[11], data[12]]) as usize;
    let arity = u32::from_le_bytes([data[13], data[14], data[15], data[16]]) as usize;

    let expected_len = count
        .checked_mul(arity)
        .and_then(|n| n.checked_mul(8))
        .and_then(|n| n.checked_add(HEADER_SIZE + CHECKSUM_SIZE))
        .ok_or_else(|| RecordError::CorruptBlob("operations blob header overflows".into()))?;

    if data.len() != expected_len {
        return Err(RecordError::CorruptBlob(format!(
            "operations blob is {} bytes, header describes {}",
            data.len(),
            expected_len
        )));
    }

    let body_end = data.len() - CHECKSUM_SIZE;
    let stored = u32::from_le_bytes([
        data[body_end],
        data[body_end + 1],
        data[body_end + 2],
        data[body_end + 3],
    ]);
    if compute_checksum(&data[..body_end]) != stored {
        return Err(RecordError::CorruptBlob("operations blob checksum mismatch".into()));
    }

    let words = data[HEADER_SIZE..body_end].chunks_exact(8).map(|chunk| {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(chunk);
        bytes
    });

    match element {
        ELEMENT_INTEGER => {
            let values: Vec<i64> = words.map(i64::from_le_bytes).collect();
            Ok(OperationsMatrix::Integer(split_rows(values, count, arity)))
        }
        ELEMENT_FLOAT => {
            let values: Vec<f64> = words.map(f64::from_le_bytes).collect();
            Ok(OperationsMatrix::Float(split_rows(values, count, arity)))
        }
        other => Err(RecordError::CorruptBlob(format!(
            "operations blob has unknown element type {}",
            other
        ))),
    }
}

/// One operation with every component rounded to a number of decimal digits.
///
/// Components are held as integers scaled by `10^precision`, so rounded
/// operations can be hashed, ordered and compared exactly. A component whose
/// scaled value does not fit an `i64` already has no digits below the
/// precision and is kept as its exact value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoundedOperation {
    precision: u32,
    components: Vec<RoundedComponent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum RoundedComponent {
    Scaled(i64),
    /// Canonical bit pattern (no negative zero, one NaN)
    Exact(u64),
}

/// 2^63, the first magnitude an i64 cannot hold
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

impl RoundedComponent {
    fn new(value: f64, scale: f64) -> Self {
        let scaled = (value * scale).round();
        if scaled.is_finite() && scaled.abs() < I64_LIMIT {
            // Rounding may still produce -0.0, which casts to 0
            return Self::Scaled(scaled as i64);
        }
        Self::Exact(canonical_bits(value))
    }

    fn value(self, scale: f64) -> f64 {
        match self {
            Self::Scaled(n) => n as f64 / scale,
            Self::Exact(bits) => f64::from_bits(bits),
        }
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    }
}

impl RoundedOperation {
    pub fn new(operation: &[f64], precision: u32) -> Self {
        let scale = scale(precision);
        Self {
            precision,
            components: operation.iter().map(|v| RoundedComponent::new(*v, scale)).collect(),
        }
    }

    /// Rounded component values
    pub fn values(&self) -> Vec<f64> {
        let scale = scale(self.precision);
        self.components.iter().map(|c| c.value(scale)).collect()
    }
}

fn scale(precision: u32) -> f64 {
    10f64.powi(precision.min(i32::MAX as u32) as i32)
}

impl Serialize for RoundedOperation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.values())
    }
}

/// Set difference between stored and candidate operations after rounding.
///
/// Only whole operations are compared: a single differing component moves the
/// operation into both `missing` (its stored form) and `additional` (its
/// candidate form).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationsDiff {
    /// Stored operations absent from the candidate set
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub missing: BTreeSet<RoundedOperation>,
    /// Candidate operations absent from the stored set
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub additional: BTreeSet<RoundedOperation>,
}

impl OperationsDiff {
    /// Compares `stored` against `candidate` at `precision` decimal digits.
    pub fn between(stored: &[Vec<f64>], candidate: &[Vec<f64>], precision: u32) -> Self {
        let round_all = |ops: &[Vec<f64>]| -> BTreeSet<RoundedOperation> {
            ops.iter().map(|op| RoundedOperation::new(op, precision)).collect()
        };

        let stored = round_all(stored);
        let candidate = round_all(candidate);

        Self {
            missing: stored.difference(&candidate).cloned().collect(),
            additional: candidate.difference(&stored).cloned().collect(),
        }
    }

    /// True when both sets agree after rounding
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.additional.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity() -> Vec<f64> {
        vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]
    }

    fn inversion() -> Vec<f64> {
        vec![-1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, -1.0, 0.5, 0.5, 0.5]
    }

    #[test]
    fn test_blob_round_trip() {
        let ops = OperationsMatrix::Float(vec![identity(), inversion()]);
        let blob = encode_operations(&ops).unwrap();
        assert_eq!(blob.len(), HEADER_SIZE + 2 * 12 * 8 + CHECKSUM_SIZE);
        assert_eq!(decode_operations(&blob).unwrap(), ops);
    }

    #[test]
    fn test_integer_blob_keeps_integers() {
        let ops = parse_operations(&json!([[1, 0, 0], [-1, 0, 0]])).unwrap();
        assert_eq!(ops, OperationsMatrix::Integer(vec![vec![1, 0, 0], vec![-1, 0, 0]]));

        let decoded = decode_operations(&encode_operations(&ops).unwrap()).unwrap();
        assert_eq!(decoded.to_value(), json!([[1, 0, 0], [-1, 0, 0]]));
        assert_eq!(decoded.to_float(), vec![vec![1.0, 0.0, 0.0], vec![-1.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_unknown_element_type_rejected() {
        let mut blob = encode_operations(&OperationsMatrix::Integer(vec![vec![1]])).unwrap();
        blob[8] = 9;
        let body_end = blob.len() - CHECKSUM_SIZE;
        let checksum = compute_checksum(&blob[..body_end]);
        blob[body_end..].copy_from_slice(&checksum.to_le_bytes());

        let err = decode_operations(&blob).unwrap_err();
        assert!(err.to_string().contains("element type"));
    }

    #[test]
    fn test_empty_list_is_a_valid_blob() {
        let blob = encode_operations(&OperationsMatrix::Integer(Vec::new())).unwrap();
        let decoded = decode_operations(&blob).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded.to_value(), json!([]));
    }

    #[test]
    fn test_corruption_detected() {
        let mut blob = encode_operations(&OperationsMatrix::Float(vec![identity()])).unwrap();
        blob[HEADER_SIZE + 3] ^= 0x01;
        let err = decode_operations(&blob).unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn test_truncated_blob_rejected() {
        let blob = encode_operations(&OperationsMatrix::Float(vec![identity()])).unwrap();
        assert!(matches!(
            decode_operations(&blob[..blob.len() - 8]),
            Err(RecordError::CorruptBlob(_))
        ));
        assert!(matches!(decode_operations(b"SYM"), Err(RecordError::CorruptBlob(_))));
    }

    #[test]
    fn test_parse_rejects_ragged_operations() {
        let value = json!([[1, 0, 0], [0, 1]]);
        let err = parse_operations(&value).unwrap_err();
        assert_eq!(err.code(), "RECORD_SHAPE_MISMATCH");
        assert!(err.to_string().contains("operations[1]"));
    }

    #[test]
    fn test_mixed_numbers_parse_as_float() {
        let ops = parse_operations(&json!([[1, 0, 0.5]])).unwrap();
        assert_eq!(ops, OperationsMatrix::Float(vec![vec![1.0, 0.0, 0.5]]));
        assert_eq!(ops.to_value(), json!([[1.0, 0.0, 0.5]]));
    }

    #[test]
    fn test_parse_rejects_non_numbers() {
        let err = parse_operations(&json!([[1, "x"]])).unwrap_err();
        assert!(err.to_string().contains("operations[0][1]"));
    }

    #[test]
    fn test_identical_sets_have_no_difference() {
        let stored = vec![identity(), inversion()];
        let candidate = vec![inversion(), identity()];
        let diff = OperationsDiff::between(&stored, &candidate, DEFAULT_PRECISION);
        assert!(diff.is_empty());
        assert_eq!(serde_json::to_value(&diff).unwrap(), json!({}));
    }

    #[test]
    fn test_below_precision_noise_ignored() {
        let mut noisy = identity();
        noisy[9] += 1e-9;
        let diff = OperationsDiff::between(&[identity()], &[noisy], DEFAULT_PRECISION);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_perturbed_component_moves_whole_operation() {
        let mut perturbed = identity();
        perturbed[4] += 1e-3;

        let diff = OperationsDiff::between(&[identity()], &[perturbed.clone()], DEFAULT_PRECISION);
        assert_eq!(diff.missing.len(), 1);
        assert_eq!(diff.additional.len(), 1);
        assert_eq!(diff.missing.iter().next().unwrap().values(), identity());
        assert_eq!(diff.additional.iter().next().unwrap().values()[4], 1.001);
    }

    #[test]
    fn test_swapping_sides_swaps_result() {
        let a = vec![identity(), inversion()];
        let b = vec![identity()];

        let forward = OperationsDiff::between(&a, &b, 3);
        let backward = OperationsDiff::between(&b, &a, 3);
        assert_eq!(forward.missing, backward.additional);
        assert_eq!(forward.additional, backward.missing);
        assert_eq!(forward.missing.len(), 1);
    }

    #[test]
    fn test_negative_zero_rounds_like_zero() {
        let a = RoundedOperation::new(&[-0.0, 1e-7], 5);
        let b = RoundedOperation::new(&[0.0, 0.0], 5);
        assert_eq!(a, b);
    }

    #[test]
    fn test_high_precision_keeps_operations_apart() {
        let diff = OperationsDiff::between(&[vec![1.0, 0.0, 0.0]], &[vec![2.0, 0.0, 0.0]], 19);
        assert_eq!(diff.missing.len(), 1);
        assert_eq!(diff.additional.len(), 1);

        let diff = OperationsDiff::between(&[vec![1.0, 0.0]], &[vec![1.0, 0.0]], u32::MAX);
        assert!(diff.is_empty());
        let diff = OperationsDiff::between(&[vec![1.0, 0.0]], &[vec![1.0, 1e-300]], u32::MAX);
        assert!(!diff.is_empty());
    }

    #[test]
    fn test_large_components_keep_operations_apart() {
        let diff = OperationsDiff::between(&[vec![1e15, 0.0]], &[vec![2e15, 0.0]], DEFAULT_PRECISION);
        assert!(!diff.is_empty());
        assert_eq!(diff.missing.iter().next().unwrap().values(), vec![1e15, 0.0]);

        let diff = OperationsDiff::between(&[vec![1e15, -0.0]], &[vec![1e15, 0.0]], DEFAULT_PRECISION);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_components_either_side_of_i64_range() {
        // 9e13 scales to 9e18, inside i64; 1e14 scales to 1e19, outside
        let inside = RoundedOperation::new(&[9e13], DEFAULT_PRECISION);
        let outside = RoundedOperation::new(&[1e14], DEFAULT_PRECISION);
        let negative = RoundedOperation::new(&[-1e14], DEFAULT_PRECISION);

        assert_ne!(inside, outside);
        assert_ne!(outside, negative);
        assert_eq!(inside.values(), vec![9e13]);
        assert_eq!(outside.values(), vec![1e14]);
        assert_eq!(negative.values(), vec![-1e14]);
    }
}
