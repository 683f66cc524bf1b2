//! The structured-object composite: a fixed set of named subfields, each a
//! complete nested field definition.
//!
//! Objects recurse through the full pipeline. Sanitization descends into
//! each present subfield sequentially; validation fans the subfields out
//! concurrently and joins them, since siblings only read the shared
//! already-sanitized snapshot; population fans out the same way. Input
//! filters are the exception: they run sequentially in declaration order
//! because one subfield's filter may mutate state a later filter observes.

use crate::core::context::ValidationContext;
use crate::core::field::{FieldBuilder, FieldDefinition, FieldKind};
use crate::core::outcome::{ErrorMap, FieldFailure, FieldResult};
use crate::core::pipeline::validate_member;
use crate::error::Result;
use crate::value::{join_path, parse_if_text};
use futures::future::join_all;
use serde_json::{Map, Value};

/// Options of the structured-object composite.
#[derive(Debug, Clone, Default)]
pub struct ObjectOptions {
    /// Named subfields in declaration order
    pub subfields: Vec<FieldDefinition>,
}

/// Starts building a structured-object field.
pub fn object(name: impl Into<String>) -> FieldBuilder {
    FieldBuilder::new(name, FieldKind::Object(ObjectOptions::default()))
}

/// Sanitizes an object value: parse from text, then run each present
/// subfield's full sanitizer chain with the path extended by its name.
/// Unknown keys are left untouched.
pub(crate) async fn sanitize_object(
    options: &ObjectOptions,
    value: Value,
    ctx: &ValidationContext,
) -> Result<Value> {
    let mut map = match parse_if_text(value) {
        Value::Object(map) => map,
        other => return Ok(other),
    };
    for subfield in &options.subfields {
        if let Some(current) = map.remove(&subfield.name) {
            let sub_ctx = ctx.descend(&subfield.name);
            let sanitized = subfield.sanitize(current, &sub_ctx).await?;
            map.insert(subfield.name.clone(), sanitized);
        }
    }
    Ok(Value::Object(map))
}

/// Validates a non-null object value: the composite's own shape and
/// storability checks, then every subfield concurrently.
///
/// Subfield findings land in the shared error map at the subfield's path;
/// when any subfield failed the composite itself fails with
/// [`FieldFailure::Recorded`] so its generic message never masks a child's.
pub(crate) async fn validate_object(
    field: &FieldDefinition,
    options: &ObjectOptions,
    value: &Value,
    ctx: &ValidationContext,
    errors: &mut ErrorMap,
) -> FieldResult {
    let Some(map) = value.as_object() else {
        return Err(FieldFailure::invalid(ctx.translate("object_type", &[])));
    };
    if field.serialize_value(value).is_err() {
        return Err(FieldFailure::invalid(ctx.translate("store_failed", &[])));
    }

    let mut pending = Vec::new();
    for subfield in &options.subfields {
        let sub_ctx = ctx.descend(&subfield.name);
        pending.push(validate_member(subfield, map.get(&subfield.name), sub_ctx));
    }

    let mut any_failed = false;
    for child_errors in join_all(pending).await {
        if !child_errors.is_empty() {
            any_failed = true;
        }
        errors.extend(child_errors);
    }

    if any_failed {
        Err(FieldFailure::Recorded)
    } else {
        Ok(())
    }
}

/// Backfills defaults for required subfields that are absent and whose
/// requirement is switched off by the current conditional state, keeping
/// the composite structurally complete downstream.
pub(crate) fn backfill_defaults(
    options: &ObjectOptions,
    map: &mut Map<String, Value>,
    ctx: &ValidationContext,
) {
    for subfield in &options.subfields {
        if subfield.required && !map.contains_key(&subfield.name) {
            let sub_path = join_path(ctx.path(), &subfield.name);
            if !ctx.is_applicable(&sub_path) {
                map.insert(subfield.name.clone(), subfield.default_value());
            }
        }
    }
}

/// Populates every present subfield concurrently and merges the results.
/// Each subfield writes a distinct key, so the fan-out is safe.
pub(crate) async fn populate_object(
    options: &ObjectOptions,
    value: Value,
    ctx: &ValidationContext,
) -> Result<Value> {
    let mut map = match value {
        Value::Object(map) => map,
        other => return Ok(other),
    };
    let mut pending = Vec::new();
    for subfield in &options.subfields {
        if let Some(current) = map.remove(&subfield.name) {
            let sub_ctx = ctx.descend(&subfield.name);
            pending.push(async move {
                let populated = subfield.populate(current, &sub_ctx).await;
                (subfield.name.clone(), populated)
            });
        }
    }
    for (name, populated) in join_all(pending).await {
        map.insert(name, populated?);
    }
    Ok(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::Operation;
    use crate::fields;
    use serde_json::json;

    fn dimensions() -> FieldDefinition {
        fields::object("dimensions")
            .subfield(fields::number("width").required(true).build().unwrap())
            .subfield(fields::text("unit").required(true).build().unwrap())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_required_subfield_reports_exactly_one_error() {
        let field = dimensions();
        let ctx = ValidationContext::with_defaults(Operation::Update, json!({}))
            .enter_field("dimensions");
        let mut errors = ErrorMap::new();
        let value = json!({"width": 100});

        let failure = field.validate(Some(&value), &ctx, &mut errors).await.unwrap_err();
        assert_eq!(failure, FieldFailure::Recorded);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["dimensions.unit"], "This field is required");
    }

    #[tokio::test]
    async fn test_complete_object_validates_cleanly() {
        let field = dimensions();
        let ctx = ValidationContext::with_defaults(Operation::Update, json!({}))
            .enter_field("dimensions");
        let mut errors = ErrorMap::new();
        let value = json!({"width": 100, "unit": "px"});

        assert!(field.validate(Some(&value), &ctx, &mut errors).await.is_ok());
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_subfield_type_error_is_recorded_at_its_path() {
        let field = dimensions();
        let ctx = ValidationContext::with_defaults(Operation::Update, json!({}))
            .enter_field("dimensions");
        let mut errors = ErrorMap::new();
        let value = json!({"width": "wide", "unit": "px"});

        let failure = field.validate(Some(&value), &ctx, &mut errors).await.unwrap_err();
        assert_eq!(failure, FieldFailure::Recorded);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["dimensions.width"], "Value must be of type number");
    }

    #[tokio::test]
    async fn test_non_object_value_fails_its_own_check() {
        let field = dimensions();
        let ctx = ValidationContext::with_defaults(Operation::Update, json!({}))
            .enter_field("dimensions");
        let mut errors = ErrorMap::new();
        let value = json!([1, 2]);

        let failure = field.validate(Some(&value), &ctx, &mut errors).await.unwrap_err();
        assert_eq!(failure, FieldFailure::Invalid("Value must be an object".to_string()));
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_sanitize_parses_text_and_recurses() {
        let field = fields::object("dimensions")
            .subfield(fields::number("width").build().unwrap())
            .build()
            .unwrap();
        let ctx = ValidationContext::with_defaults(Operation::Update, json!({}))
            .enter_field("dimensions");
        let sanitized = field
            .sanitize(json!("{\"width\": \"100\"}"), &ctx)
            .await
            .unwrap();
        assert_eq!(sanitized, json!({"width": 100.0}));
    }
}
