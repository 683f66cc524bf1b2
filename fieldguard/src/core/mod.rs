//! Core types of the field-schema engine.
//!
//! This module provides the building blocks every field kind shares:
//!
//! - **[`Schema`]**: the top-level grouping of field definitions for one
//!   record shape, with the pass operations (`run`, `sanitize`, `validate`,
//!   `populate`, `persist`, `revive`)
//! - **[`FieldDefinition`]**: an immutable, schema-time field description
//!   (kind, flags, defaults, conditional logic, hook pipelines)
//! - **[`ValidationContext`]**: the per-pass state threaded through every
//!   call (operation, current path, snapshots, resolver, translator, cache)
//! - **[`ErrorMap`] / [`FieldFailure`]**: the path-keyed error aggregation
//!   and the typed failure outcome of one field's pipeline
//! - The extension-point traits: [`Sanitizer`], [`Validator`],
//!   [`Populator`], [`InputFilter`], [`ValueCodec`]
//!
//! ## Architecture
//!
//! ```text
//! Schema
//!     ├── FieldDefinition (scalar)
//!     ├── FieldDefinition (array | matrix)
//!     └── FieldDefinition (object)
//!         ├── FieldDefinition (subfield)
//!         └── FieldDefinition (subfield, recursing)
//! ```
//!
//! One pass flows sanitize → resolve conditions → filter → validate, and on
//! the read side revive → populate. The pipeline executor lives in
//! [`pipeline`](self::pipeline) as methods on `FieldDefinition`.

pub(crate) mod context;
pub(crate) mod field;
pub(crate) mod hooks;
pub(crate) mod outcome;
pub(crate) mod pipeline;
pub(crate) mod schema;

pub use context::{DefaultTranslator, Operation, Translator, ValidationContext};
pub use field::{FieldBuilder, FieldDefinition, FieldKind, MAX_NESTING_DEPTH};
pub use hooks::{
    FilterStage, InputFilter, JsonCodec, Populator, Sanitizer, Validator, ValueCodec,
};
pub use outcome::{ErrorMap, FieldFailure, FieldResult};
pub use schema::{Schema, SchemaBuilder, ValidationReport};
