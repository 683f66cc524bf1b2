//! Prelude for commonly used types and traits in fieldguard.

pub use crate::core::{
    ErrorMap, FieldBuilder, FieldDefinition, FieldFailure, FieldKind, FieldResult, FilterStage,
    InputFilter, Operation, Populator, Sanitizer, Schema, SchemaBuilder, Translator,
    ValidationContext, ValidationReport, Validator, ValueCodec,
};
pub use crate::error::{Result, SchemaError};
pub use crate::fields;
pub use crate::logging::LogConfig;
pub use crate::logic::{ConditionResolver, ConditionalLogic, Operator};
pub use crate::value::ValueKind;
