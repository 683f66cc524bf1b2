//! Extension-point traits of the field pipeline.
//!
//! Every field definition carries ordered lists of these hooks: sanitizers
//! reshape a value before validation, validators judge it, input filters run
//! at fixed lifecycle stages, a populator enriches a stored value after
//! retrieval, and a codec converts between the in-memory value and its
//! stored text form. All hooks may suspend; none may block.

use crate::core::context::ValidationContext;
use crate::core::outcome::{ErrorMap, FieldResult};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// A pure transform applied to a value before validation.
///
/// Sanitizers run in declaration order; the output of one stage feeds the
/// next. A sanitizer must be idempotent: sanitizing an already-sanitized
/// value returns it unchanged.
#[async_trait]
pub trait Sanitizer: fmt::Debug + Send + Sync {
    /// Transforms `value` into its canonical shape.
    async fn sanitize(&self, value: Value, ctx: &ValidationContext) -> Result<Value>;
}

/// A check that may fail a value with a user-facing message.
///
/// Validators never mutate the value. A validator may record detail at
/// descendant paths through `errors` and fail the field itself by returning
/// a [`FieldFailure`](crate::core::FieldFailure).
#[async_trait]
pub trait Validator: fmt::Debug + Send + Sync {
    /// Judges `value`, recording path-level detail in `errors`.
    async fn check(
        &self,
        value: &Value,
        ctx: &ValidationContext,
        errors: &mut ErrorMap,
    ) -> FieldResult;
}

/// A post-retrieval transform that enriches a validated value for
/// application use, for example expanding a stored reference into a richer
/// shape.
#[async_trait]
pub trait Populator: fmt::Debug + Send + Sync {
    /// Expands `value` into its application-facing shape.
    async fn populate(&self, value: Value, ctx: &ValidationContext) -> Result<Value>;
}

/// The lifecycle stages an input filter can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterStage {
    /// Before the sanitizer pipeline runs
    BeforeSanitize,
    /// After sanitization, before the validator pipeline runs
    BeforeValidate,
    /// Before the value is serialized for storage
    BeforePersist,
}

/// A lifecycle hook that may transform or default a field's value.
///
/// Returning `None` deletes the key from the enclosing record rather than
/// storing an empty marker.
#[async_trait]
pub trait InputFilter: fmt::Debug + Send + Sync {
    /// Transforms the current value, `None` meaning the key is absent.
    async fn apply(&self, value: Option<Value>, ctx: &ValidationContext) -> Result<Option<Value>>;
}

/// Converts a field value to and from its stored text representation.
///
/// The two directions must be exact inverses for every value that passes
/// validation.
pub trait ValueCodec: fmt::Debug + Send + Sync {
    /// Encodes `value` into its stored text blob.
    fn serialize(&self, value: &Value) -> Result<String>;

    /// Decodes a stored text blob back into the in-memory value.
    fn deserialize(&self, stored: &str) -> Result<Value>;
}

/// The default codec: plain JSON text.
#[derive(Debug, Clone, Default)]
pub struct JsonCodec;

impl ValueCodec for JsonCodec {
    fn serialize(&self, value: &Value) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn deserialize(&self, stored: &str) -> Result<Value> {
        Ok(serde_json::from_str(stored)?)
    }
}
