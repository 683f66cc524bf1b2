//! Error types for the fieldguard schema engine.
//!
//! This module provides the error handling strategy for the crate using
//! `thiserror`. Engine faults — schema-definition mistakes, storage codec
//! failures — are represented by the [`SchemaError`] enum. User-facing
//! validation failures never travel on this type; they are collected in the
//! per-pass error map instead.

use thiserror::Error;

/// The main error type for the fieldguard engine.
///
/// Validation failures are not errors in this sense: a failed validator
/// writes a message into the shared error map and the pass continues. A
/// `SchemaError` means the schema itself is unusable or a stored value could
/// not be encoded or decoded.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A field definition is internally inconsistent (for example,
    /// `min_items` greater than `max_items`, or a sequence option applied to
    /// a scalar field).
    #[error("invalid field definition '{field}': {message}")]
    InvalidDefinition {
        /// Name of the offending field
        field: String,
        /// What is wrong with the definition
        message: String,
    },

    /// The schema tree nests deeper than the engine is willing to recurse.
    #[error("schema nesting exceeds {max} levels at field '{field}'")]
    NestingTooDeep { field: String, max: usize },

    /// Two fields at the same level share a name.
    #[error("duplicate field name '{name}' in '{scope}'")]
    DuplicateField { scope: String, name: String },

    /// Error from serializing or deserializing JSON values.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored text blob did not have the shape its codec expects.
    #[error("stored value could not be decoded: {0}")]
    Decode(String),

    /// Generic internal error for unexpected conditions.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, SchemaError>`.
///
/// This is the standard `Result` type used throughout the fieldguard crate.
pub type Result<T> = std::result::Result<T, SchemaError>;

impl SchemaError {
    /// Creates a new invalid-definition error.
    pub fn invalid_definition(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            field: field.into(),
            message: message.into(),
        }
    }
}
