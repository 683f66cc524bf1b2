//! Field-kind constructors and kind-specific machinery.
//!
//! Each kind wraps the shared pipeline executor with its own option surface:
//!
//! - [`text`], [`number`], [`integer`], [`boolean`] — primitive scalars
//! - [`array`] — a primitive list stored as-is
//! - [`matrix`] — a primitive list stored in the legacy element-wrapped
//!   encoding
//! - [`object`] — a fixed set of named subfields, each a full field
//!   definition, validated by recursive descent

pub mod array;
pub mod matrix;
pub mod object;
pub mod scalar;

pub use array::{array, SequenceOptions};
pub use matrix::{matrix, MatrixCodec};
pub use object::{object, ObjectOptions};
pub use scalar::{boolean, integer, number, text};
