//! Scalar field constructors and their type check.
//!
//! Scalars are the leaves of the schema tree: text, numbers, and booleans.
//! The application-facing kind catalog (labels, widgets) lives outside the
//! engine; these constructors cover the primitive kinds the composites and
//! their subfields are built from.

use crate::core::context::ValidationContext;
use crate::core::field::{FieldBuilder, FieldKind};
use crate::core::outcome::{FieldFailure, FieldResult};
use crate::value::ValueKind;
use serde_json::Value;

/// Starts building a text field.
pub fn text(name: impl Into<String>) -> FieldBuilder {
    FieldBuilder::new(name, FieldKind::Scalar(ValueKind::Text))
}

/// Starts building a numeric field accepting integral and floating values.
pub fn number(name: impl Into<String>) -> FieldBuilder {
    FieldBuilder::new(name, FieldKind::Scalar(ValueKind::Float))
}

/// Starts building a whole-number field.
pub fn integer(name: impl Into<String>) -> FieldBuilder {
    FieldBuilder::new(name, FieldKind::Scalar(ValueKind::Integer))
}

/// Starts building a boolean field.
pub fn boolean(name: impl Into<String>) -> FieldBuilder {
    FieldBuilder::new(name, FieldKind::Scalar(ValueKind::Boolean))
}

/// Type check for a non-null scalar value.
pub(crate) fn validate_scalar(
    kind: ValueKind,
    value: &Value,
    ctx: &ValidationContext,
) -> FieldResult {
    if kind.matches(value) {
        Ok(())
    } else {
        Err(FieldFailure::invalid(ctx.translate(
            "scalar_type",
            &[("kind", kind.name().to_string())],
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::Operation;
    use serde_json::json;

    #[test]
    fn test_scalar_type_check_messages() {
        let ctx = ValidationContext::with_defaults(Operation::Insert, json!({}));
        assert!(validate_scalar(ValueKind::Text, &json!("ok"), &ctx).is_ok());
        let failure = validate_scalar(ValueKind::Integer, &json!("nope"), &ctx).unwrap_err();
        assert_eq!(
            failure,
            FieldFailure::Invalid("Value must be of type integer".to_string())
        );
    }
}
