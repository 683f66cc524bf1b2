//! # fieldguard — declarative field-schema engine
//!
//! fieldguard turns a typed field definition into a full input lifecycle:
//! raw values are sanitized into canonical shapes, validated — including
//! cross-field conditional visibility/requirement rules expressed as
//! relative dot-notation references — serialized for storage, and populated
//! back into an application-facing shape after retrieval.
//!
//! ## Overview
//!
//! Field definitions compose recursively: scalar arrays, a legacy "matrix"
//! scalar encoding, and structured objects whose subfields are themselves
//! full field definitions. Every pipeline stage may suspend, errors are
//! aggregated per dot-path across arbitrarily deep nesting, and a path
//! resolver interprets relative (`./`, `../`), absolute (`/`), and
//! bare-sibling references while memoizing lookups within a pass.
//!
//! The engine knows nothing about persistence, HTTP, or any concrete widget
//! catalog. A host system supplies raw input, calls the pass operations, and
//! stores the serialized result.
//!
//! ## Quick Start
//!
//! ```rust
//! use fieldguard::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> fieldguard::error::Result<()> {
//! let schema = Schema::builder("product")
//!     .field(fields::text("title").required(true).build()?)
//!     .field(
//!         fields::array("tags")
//!             .element_kind(ValueKind::Text)
//!             .deduplicate(true)
//!             .build()?,
//!     )
//!     .field(
//!         fields::object("dimensions")
//!             .subfield(fields::number("width").required(true).build()?)
//!             .subfield(fields::text("unit").required(true).build()?)
//!             .build()?,
//!     )
//!     .build()?;
//!
//! // Sequences may arrive as text; repeats are dropped in order.
//! let report = schema
//!     .run(
//!         Operation::Insert,
//!         json!({
//!             "title": "Lamp",
//!             "tags": "[\"metal\",\"metal\",\"round\"]",
//!             "dimensions": {"width": 30, "unit": "cm"}
//!         }),
//!     )
//!     .await?;
//!
//! assert!(report.is_valid());
//! assert_eq!(report.value["tags"], json!(["metal", "round"]));
//! # Ok(())
//! # }
//! ```
//!
//! ## Conditional logic
//!
//! Rules are declarative data, resolved against the submitted record:
//!
//! ```rust
//! use fieldguard::logic::ConditionResolver;
//! use serde_json::json;
//!
//! let mut resolver = ConditionResolver::new();
//! resolver.set_input(json!({"foo": "FOO", "bar": {"baz": "BAZ"}}));
//! let rule = serde_json::from_value(json!({"../foo": {"=": "FOO"}})).unwrap();
//! assert!(resolver.matches("bar.baz", Some(&rule)));
//! ```
//!
//! An array of rule sets is an implicit AND; the reserved `orGroup` key
//! holds alternatives evaluated as OR; operators are `=`, `!=`, `>`, `>=`,
//! `<`, `<=`, and `regexp`. When a referenced value is an array, its length
//! is compared instead of the array itself.
//!
//! ## Architecture
//!
//! - **`core`**: schema and field definitions, the pipeline executor, the
//!   per-pass context, and the error aggregation types
//! - **`fields`**: the closed set of field kinds — scalars, array, matrix,
//!   structured object — and their option surfaces
//! - **`logic`**: the conditional-rule model, reference-path resolution, and
//!   the memoizing resolver
//! - **`error`**: the crate error type for schema-definition and codec
//!   faults; validation failures travel on the error map instead
//! - **`logging`**: `tracing` configuration helpers

pub mod core;
pub mod error;
pub mod fields;
pub mod logging;
pub mod logic;
pub mod prelude;
pub mod value;
