//! The pipeline executor shared by every field kind.
//!
//! Each field runs the same ordered machinery: lifecycle input filters,
//! the sanitizer chain, the validator chain, and the optional populator.
//! Kind-intrinsic behavior is dispatched on the closed
//! [`FieldKind`](crate::core::FieldKind) union; the custom hooks declared on
//! the definition run after it, in declaration order.
//!
//! The executor methods return boxed futures because composites recurse:
//! an object's pipeline descends into subfields that are themselves full
//! field definitions.

use crate::core::context::ValidationContext;
use crate::core::field::{FieldDefinition, FieldKind};
use crate::core::hooks::FilterStage;
use crate::core::outcome::{ErrorMap, FieldFailure, FieldResult};
use crate::error::Result;
use crate::fields::{array, object, scalar};
use crate::logic::path::resolve_reference;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

impl FieldDefinition {
    /// Runs the sanitizer pipeline: kind-intrinsic sanitization first, then
    /// every custom sanitizer in declaration order, each stage feeding the
    /// next.
    pub fn sanitize<'a>(
        &'a self,
        value: Value,
        ctx: &'a ValidationContext,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            debug!(path = %ctx.path(), "sanitizing field");
            let mut value = match &self.kind {
                FieldKind::Scalar(kind) => kind.coerce(value),
                FieldKind::Array(options) | FieldKind::Matrix(options) => {
                    array::sanitize_sequence(options, value)
                }
                FieldKind::Object(options) => object::sanitize_object(options, value, ctx).await?,
            };
            for sanitizer in &self.sanitizers {
                value = sanitizer.sanitize(value, ctx).await?;
            }
            Ok(value)
        })
    }

    /// Runs the validator pipeline for this field.
    ///
    /// `value` is `None` when the key is absent from the enclosing record;
    /// absence only fails when the required policy applies. The field's
    /// first failure stops its own pipeline, but composite siblings are
    /// still fully processed by the enclosing fan-out.
    pub fn validate<'a>(
        &'a self,
        value: Option<&'a Value>,
        ctx: &'a ValidationContext,
        errors: &'a mut ErrorMap,
    ) -> BoxFuture<'a, FieldResult> {
        Box::pin(async move {
            let Some(value) = value else {
                if self.required && self.required_enforced(ctx) {
                    return Err(FieldFailure::invalid(ctx.translate("required", &[])));
                }
                return Ok(());
            };

            if value.is_null() {
                if !self.nullable {
                    return Err(FieldFailure::invalid(ctx.translate("null", &[])));
                }
                return Ok(());
            }

            match &self.kind {
                FieldKind::Scalar(kind) => scalar::validate_scalar(*kind, value, ctx)?,
                FieldKind::Array(options) => array::validate_sequence(
                    options,
                    self.required && self.required_enforced(ctx),
                    value,
                    ctx,
                    errors,
                    true,
                )?,
                FieldKind::Matrix(options) => array::validate_sequence(
                    options,
                    self.required && self.required_enforced(ctx),
                    value,
                    ctx,
                    errors,
                    false,
                )?,
                FieldKind::Object(options) => {
                    object::validate_object(self, options, value, ctx, errors).await?
                }
            }

            for validator in &self.validators {
                validator.check(value, ctx, errors).await?;
            }
            Ok(())
        })
    }

    /// Runs the populator pipeline: object subfields fan out first, then the
    /// field's own populator transforms the merged value.
    pub fn populate<'a>(
        &'a self,
        value: Value,
        ctx: &'a ValidationContext,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let mut value = value;
            if let FieldKind::Object(options) = &self.kind {
                value = object::populate_object(options, value, ctx).await?;
            }
            if let Some(populator) = &self.populator {
                value = populator.populate(value, ctx).await?;
            }
            Ok(value)
        })
    }

    /// Runs the input filters attached to `stage`, then recurses into
    /// object subfields sequentially in declaration order — a later
    /// subfield's filter may depend on an earlier one's mutation of the
    /// shared object.
    ///
    /// At the before-validate stage an object also backfills defaults for
    /// required subfields switched off by the current conditional state.
    pub fn apply_filters<'a>(
        &'a self,
        stage: FilterStage,
        value: Option<Value>,
        ctx: &'a ValidationContext,
    ) -> BoxFuture<'a, Result<Option<Value>>> {
        Box::pin(async move {
            let mut value = value;
            for (filter_stage, filter) in &self.filters {
                if *filter_stage == stage {
                    value = filter.apply(value, ctx).await?;
                }
            }

            if let FieldKind::Object(options) = &self.kind {
                value = match value {
                    Some(Value::Object(mut map)) => {
                        if stage == FilterStage::BeforeValidate {
                            object::backfill_defaults(options, &mut map, ctx);
                        }
                        for subfield in &options.subfields {
                            let current = map.remove(&subfield.name);
                            let sub_ctx = ctx.descend(&subfield.name);
                            if let Some(filtered) =
                                subfield.apply_filters(stage, current, &sub_ctx).await?
                            {
                                map.insert(subfield.name.clone(), filtered);
                            }
                        }
                        Some(Value::Object(map))
                    }
                    other => other,
                };
            }

            Ok(value)
        })
    }

    /// The required-check policy: absence fails only on inserts or in
    /// subfield scope (a composite rewrite re-requires its subfields), and
    /// only while the resolver marks this path applicable.
    fn required_enforced(&self, ctx: &ValidationContext) -> bool {
        (ctx.operation().is_insert() || ctx.is_subfield()) && ctx.is_applicable(ctx.path())
    }
}

/// Validates one member field of a record or composite, returning the
/// errors to merge into the shared map.
///
/// Before running the field's own pipeline, its declared dependencies —
/// and, in subfield scope, every path its conditional logic references —
/// are checked against the sanitized snapshot. A gap there makes the
/// field's correctness unknowable, so a dependency error is recorded and
/// the pipeline is skipped.
pub(crate) fn validate_member<'a>(
    field: &'a FieldDefinition,
    value: Option<&'a Value>,
    ctx: ValidationContext,
) -> BoxFuture<'a, ErrorMap> {
    Box::pin(async move {
        let mut errors = ErrorMap::new();
        let path = ctx.path().to_string();

        if let Some(missing) = missing_dependency(field, &ctx) {
            debug!(path = %path, dependency = %missing, "dependency gap, skipping validators");
            errors.insert(
                path,
                ctx.translate("dependency_missing", &[("field", missing)]),
            );
            return errors;
        }

        match field.validate(value, &ctx, &mut errors).await {
            Ok(()) => {}
            Err(FieldFailure::Invalid(message)) => {
                errors.insert(path, message);
            }
            // Detail already sits at descendant paths.
            Err(FieldFailure::Recorded) => {}
        }
        errors
    })
}

fn missing_dependency(field: &FieldDefinition, ctx: &ValidationContext) -> Option<String> {
    let path = ctx.path();
    for dependency in &field.dependencies {
        let resolved = resolve_reference(path, dependency);
        if ctx.sanitized_value(&resolved).is_none() {
            return Some(resolved);
        }
    }
    if ctx.is_subfield() {
        if let Some(condition) = field.condition() {
            for referenced in ctx.referenced_paths(path, condition) {
                if ctx.sanitized_value(&referenced).is_none() {
                    return Some(referenced);
                }
            }
        }
    }
    None
}
