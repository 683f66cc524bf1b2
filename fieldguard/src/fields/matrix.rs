//! The matrix composite: a primitive list stored in the legacy
//! element-wrapped encoding.
//!
//! A matrix behaves like an array in memory but each scalar element is
//! wrapped in its own single-element sequence on the way to storage:
//! `[a, b]` serializes to the text of `[[a], [b]]` and is flattened back on
//! read. The encoding is a storage-compatibility contract and must be
//! preserved exactly.

use crate::core::field::{FieldBuilder, FieldKind};
use crate::core::hooks::ValueCodec;
use crate::error::{Result, SchemaError};
use crate::fields::array::SequenceOptions;
use serde_json::Value;

/// Starts building a matrix field.
pub fn matrix(name: impl Into<String>) -> FieldBuilder {
    FieldBuilder::new(name, FieldKind::Matrix(SequenceOptions::default()))
}

/// Storage codec implementing the element-wrapped matrix encoding.
#[derive(Debug, Clone, Default)]
pub struct MatrixCodec;

impl ValueCodec for MatrixCodec {
    fn serialize(&self, value: &Value) -> Result<String> {
        let Some(items) = value.as_array() else {
            return Err(SchemaError::Internal(
                "matrix values must be sequences".to_string(),
            ));
        };
        let wrapped: Vec<Value> = items
            .iter()
            .map(|item| Value::Array(vec![item.clone()]))
            .collect();
        Ok(serde_json::to_string(&Value::Array(wrapped))?)
    }

    fn deserialize(&self, stored: &str) -> Result<Value> {
        let parsed: Value = serde_json::from_str(stored)?;
        let Value::Array(rows) = parsed else {
            return Err(SchemaError::Decode(
                "matrix text must decode to a sequence".to_string(),
            ));
        };
        let mut flat = Vec::with_capacity(rows.len());
        for row in rows {
            match row {
                Value::Array(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        Ok(Value::Array(flat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_wraps_each_element() {
        let stored = MatrixCodec.serialize(&json!([10, 20])).unwrap();
        assert_eq!(stored, "[[10],[20]]");
    }

    #[test]
    fn test_deserialize_flattens_back() {
        assert_eq!(MatrixCodec.deserialize("[[10],[20]]").unwrap(), json!([10, 20]));
    }

    #[test]
    fn test_round_trip() {
        let value = json!(["a", true, 3]);
        let stored = MatrixCodec.serialize(&value).unwrap();
        assert_eq!(MatrixCodec.deserialize(&stored).unwrap(), value);
    }

    #[test]
    fn test_empty_matrix() {
        assert_eq!(MatrixCodec.serialize(&json!([])).unwrap(), "[]");
        assert_eq!(MatrixCodec.deserialize("[]").unwrap(), json!([]));
    }

    #[test]
    fn test_serialize_rejects_non_sequences() {
        assert!(MatrixCodec.serialize(&json!(5)).is_err());
    }

    #[test]
    fn test_deserialize_rejects_non_sequences() {
        assert!(MatrixCodec.deserialize("{\"a\":1}").is_err());
        assert!(MatrixCodec.deserialize("oops").is_err());
    }
}
