//! The array composite: a list of primitive values stored as-is.
//!
//! Arrays share their option surface and validation rules with the matrix
//! composite; the two differ only in physical encoding and in membership
//! checking, which is array-only.

use crate::core::context::ValidationContext;
use crate::core::field::{FieldBuilder, FieldKind};
use crate::core::outcome::{ErrorMap, FieldFailure, FieldResult};
use crate::value::{canonical, parse_if_text, values_equal, ValueKind};
use serde_json::Value;
use std::collections::HashSet;

/// Options shared by the array and matrix composites.
#[derive(Debug, Clone)]
pub struct SequenceOptions {
    /// Whether an empty sequence satisfies a required field
    pub allow_empty: bool,
    /// Minimum element count
    pub min_items: Option<usize>,
    /// Maximum element count
    pub max_items: Option<usize>,
    /// Whether repeated values fail validation
    pub enforce_unique: bool,
    /// Whether repeated values are dropped during sanitization
    pub deduplicate: bool,
    /// Allow-list of element values (array fields only)
    pub allow_values: Option<Vec<Value>>,
    /// Deny-list of element values (array fields only)
    pub deny_values: Vec<Value>,
    /// Allowed element kinds; exactly one kind also enables coercion
    pub element_kinds: Vec<ValueKind>,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            allow_empty: true,
            min_items: None,
            max_items: None,
            enforce_unique: false,
            deduplicate: false,
            allow_values: None,
            deny_values: Vec::new(),
            element_kinds: Vec::new(),
        }
    }
}

/// Starts building an array field.
pub fn array(name: impl Into<String>) -> FieldBuilder {
    FieldBuilder::new(name, FieldKind::Array(SequenceOptions::default()))
}

/// Sanitizes a sequence value: parse from text, coerce elements when a
/// single kind is declared, then drop repeats when deduplication is on.
pub(crate) fn sanitize_sequence(options: &SequenceOptions, value: Value) -> Value {
    let mut items = match parse_if_text(value) {
        Value::Array(items) => items,
        other => return other,
    };

    if let [kind] = options.element_kinds[..] {
        items = items.into_iter().map(|item| kind.coerce(item)).collect();
    }

    if options.deduplicate {
        let mut seen = HashSet::new();
        items.retain(|item| seen.insert(canonical(item)));
    }

    Value::Array(items)
}

/// Validates a non-null sequence value.
///
/// Element-level findings are recorded in the shared error map at
/// `{path}.{index}`; the field itself fails through a single summary
/// failure, which also stops the rest of its pipeline.
pub(crate) fn validate_sequence(
    options: &SequenceOptions,
    required_enforced: bool,
    value: &Value,
    ctx: &ValidationContext,
    errors: &mut ErrorMap,
    check_membership: bool,
) -> FieldResult {
    let Some(items) = value.as_array() else {
        return Err(FieldFailure::invalid(ctx.translate("sequence_type", &[])));
    };

    if required_enforced && !options.allow_empty && items.is_empty() {
        return Err(FieldFailure::invalid(ctx.translate("sequence_empty", &[])));
    }

    if !options.element_kinds.is_empty() {
        let kinds = options
            .element_kinds
            .iter()
            .map(|kind| kind.name())
            .collect::<Vec<_>>()
            .join(", ");
        let mut offending = false;
        for (index, item) in items.iter().enumerate() {
            if !options.element_kinds.iter().any(|kind| kind.matches(item)) {
                errors.insert(
                    format!("{}.{index}", ctx.path()),
                    ctx.translate("element_type", &[("kinds", kinds.clone())]),
                );
                offending = true;
            }
        }
        if offending {
            return Err(FieldFailure::invalid(
                ctx.translate("element_type_summary", &[]),
            ));
        }
    }

    if options.enforce_unique {
        let mut seen = HashSet::new();
        let mut duplicated = false;
        for (index, item) in items.iter().enumerate() {
            if !seen.insert(canonical(item)) {
                errors.insert(
                    format!("{}.{index}", ctx.path()),
                    ctx.translate("element_duplicate", &[]),
                );
                duplicated = true;
            }
        }
        if duplicated {
            return Err(FieldFailure::invalid(
                ctx.translate("duplicate_summary", &[]),
            ));
        }
    }

    match (options.min_items, options.max_items) {
        // A collapsed range gets its own wording.
        (Some(min), Some(max)) if min == max => {
            if items.len() != min {
                return Err(FieldFailure::invalid(ctx.translate(
                    "sequence_exact",
                    &[("count", min.to_string())],
                )));
            }
        }
        (min, max) => {
            if let Some(min) = min {
                if items.len() < min {
                    return Err(FieldFailure::invalid(ctx.translate(
                        "sequence_min",
                        &[("count", min.to_string())],
                    )));
                }
            }
            if let Some(max) = max {
                if items.len() > max {
                    return Err(FieldFailure::invalid(ctx.translate(
                        "sequence_max",
                        &[("count", max.to_string())],
                    )));
                }
            }
        }
    }

    if check_membership {
        let mut offending = false;
        for (index, item) in items.iter().enumerate() {
            let allowed = options
                .allow_values
                .as_ref()
                .map_or(true, |allow| allow.iter().any(|v| values_equal(v, item)));
            let denied = options.deny_values.iter().any(|v| values_equal(v, item));
            if !allowed || denied {
                errors.insert(
                    format!("{}.{index}", ctx.path()),
                    ctx.translate("value_not_allowed", &[]),
                );
                offending = true;
            }
        }
        if offending {
            return Err(FieldFailure::invalid(
                ctx.translate("membership_summary", &[]),
            ));
        }
    }

    Ok(())
}
