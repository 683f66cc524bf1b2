//! Field definitions and their builder.
//!
//! A [`FieldDefinition`] is the schema-time description of one field: its
//! kind, requirement and nullability flags, default value, conditional
//! logic, dependencies, and the hook pipelines the executor runs. Definitions
//! are immutable once built and shared across requests; the hot per-pass
//! state lives in [`ValidationContext`](crate::core::ValidationContext)
//! instead.

use crate::core::hooks::{
    FilterStage, InputFilter, JsonCodec, Populator, Sanitizer, Validator, ValueCodec,
};
use crate::error::{Result, SchemaError};
use crate::fields::array::SequenceOptions;
use crate::fields::matrix::MatrixCodec;
use crate::fields::object::ObjectOptions;
use crate::logic::ConditionalLogic;
use crate::value::ValueKind;
use serde_json::Value;
use std::sync::Arc;

/// Maximum depth of nested structured-object composition a schema may
/// declare. The tree is finite and built once; this bound is a defensive
/// limit on recursive descent.
pub const MAX_NESTING_DEPTH: usize = 32;

/// The closed set of field kinds the engine executes.
///
/// Kind-specific behavior is dispatched on this union at compile time; there
/// is no runtime registry of kind names.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A primitive value of the given kind
    Scalar(ValueKind),
    /// A homogeneous or heterogeneous list of primitives, stored as-is
    Array(SequenceOptions),
    /// A primitive list stored in the legacy element-wrapped encoding
    Matrix(SequenceOptions),
    /// A fixed set of named subfields, each a full field definition
    Object(ObjectOptions),
}

/// An immutable, schema-time field definition.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub(crate) name: String,
    pub(crate) required: bool,
    pub(crate) nullable: bool,
    pub(crate) default: Option<Value>,
    pub(crate) kind: FieldKind,
    pub(crate) condition: Option<ConditionalLogic>,
    pub(crate) dependencies: Vec<String>,
    pub(crate) sanitizers: Vec<Arc<dyn Sanitizer>>,
    pub(crate) validators: Vec<Arc<dyn Validator>>,
    pub(crate) filters: Vec<(FilterStage, Arc<dyn InputFilter>)>,
    pub(crate) populator: Option<Arc<dyn Populator>>,
    pub(crate) codec: Arc<dyn ValueCodec>,
}

impl FieldDefinition {
    /// Starts building a field definition. The default kind is a text
    /// scalar; use the constructors in [`crate::fields`] for the other
    /// kinds.
    pub fn builder(name: impl Into<String>) -> FieldBuilder {
        FieldBuilder::new(name, FieldKind::Scalar(ValueKind::Text))
    }

    /// The field's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the field must be present on insert or composite rewrite.
    pub fn required(&self) -> bool {
        self.required
    }

    /// Whether an explicit null is a valid value.
    pub fn nullable(&self) -> bool {
        self.nullable
    }

    /// The field's kind.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// The conditional logic gating this field, if any.
    pub fn condition(&self) -> Option<&ConditionalLogic> {
        self.condition.as_ref()
    }

    /// Relative paths that must be present in sanitized input for this
    /// field to be validated.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// The field's default value.
    ///
    /// Sequences default to an empty list and structured objects to an
    /// object assembled from each subfield's own default, unless an explicit
    /// default was declared.
    pub fn default_value(&self) -> Value {
        if let Some(value) = &self.default {
            return value.clone();
        }
        match &self.kind {
            FieldKind::Scalar(_) => Value::Null,
            FieldKind::Array(_) | FieldKind::Matrix(_) => Value::Array(Vec::new()),
            FieldKind::Object(options) => {
                let mut map = serde_json::Map::new();
                for subfield in &options.subfields {
                    map.insert(subfield.name.clone(), subfield.default_value());
                }
                Value::Object(map)
            }
        }
    }

    /// Encodes a value of this field into its stored text blob.
    pub fn serialize_value(&self, value: &Value) -> Result<String> {
        self.codec.serialize(value)
    }

    /// Decodes a stored text blob back into this field's in-memory value.
    pub fn deserialize_value(&self, stored: &str) -> Result<Value> {
        self.codec.deserialize(stored)
    }
}

/// Builder for [`FieldDefinition`].
///
/// Option setters that only apply to certain kinds (item bounds, subfields)
/// record a misconfiguration when used on the wrong kind; `build` surfaces
/// it as a [`SchemaError::InvalidDefinition`].
#[derive(Debug)]
pub struct FieldBuilder {
    name: String,
    required: bool,
    nullable: bool,
    default: Option<Value>,
    kind: FieldKind,
    condition: Option<ConditionalLogic>,
    dependencies: Vec<String>,
    sanitizers: Vec<Arc<dyn Sanitizer>>,
    validators: Vec<Arc<dyn Validator>>,
    filters: Vec<(FilterStage, Arc<dyn InputFilter>)>,
    populator: Option<Arc<dyn Populator>>,
    codec: Option<Arc<dyn ValueCodec>>,
    misconfigured: Option<String>,
}

impl FieldBuilder {
    pub(crate) fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            required: false,
            nullable: false,
            default: None,
            kind,
            condition: None,
            dependencies: Vec::new(),
            sanitizers: Vec::new(),
            validators: Vec::new(),
            filters: Vec::new(),
            populator: None,
            codec: None,
            misconfigured: None,
        }
    }

    /// Marks the field as required on insert and composite rewrite.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Allows an explicit null as a valid value.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Declares an explicit default value.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Attaches conditional visibility/requirement logic.
    pub fn condition(mut self, logic: ConditionalLogic) -> Self {
        self.condition = Some(logic);
        self
    }

    /// Declares a relative path that must exist in sanitized input before
    /// this field can be validated.
    pub fn dependency(mut self, path: impl Into<String>) -> Self {
        self.dependencies.push(path.into());
        self
    }

    /// Appends a sanitizer stage.
    pub fn sanitizer(mut self, sanitizer: impl Sanitizer + 'static) -> Self {
        self.sanitizers.push(Arc::new(sanitizer));
        self
    }

    /// Appends a validator stage.
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Attaches an input filter at the given lifecycle stage.
    pub fn input_filter(mut self, stage: FilterStage, filter: impl InputFilter + 'static) -> Self {
        self.filters.push((stage, Arc::new(filter)));
        self
    }

    /// Sets the post-retrieval populator.
    pub fn populator(mut self, populator: impl Populator + 'static) -> Self {
        self.populator = Some(Arc::new(populator));
        self
    }

    /// Overrides the storage codec.
    pub fn codec(mut self, codec: impl ValueCodec + 'static) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    /// Permits empty sequences even when the field is required.
    pub fn allow_empty(mut self, allow: bool) -> Self {
        match &mut self.kind {
            FieldKind::Array(options) | FieldKind::Matrix(options) => {
                options.allow_empty = allow;
            }
            _ => self.misconfigure("allow_empty applies to array and matrix fields"),
        }
        self
    }

    /// Requires at least `count` elements.
    pub fn min_items(mut self, count: usize) -> Self {
        match &mut self.kind {
            FieldKind::Array(options) | FieldKind::Matrix(options) => {
                options.min_items = Some(count);
            }
            _ => self.misconfigure("min_items applies to array and matrix fields"),
        }
        self
    }

    /// Permits at most `count` elements.
    pub fn max_items(mut self, count: usize) -> Self {
        match &mut self.kind {
            FieldKind::Array(options) | FieldKind::Matrix(options) => {
                options.max_items = Some(count);
            }
            _ => self.misconfigure("max_items applies to array and matrix fields"),
        }
        self
    }

    /// Rejects sequences containing the same value twice.
    pub fn enforce_unique(mut self, enforce: bool) -> Self {
        match &mut self.kind {
            FieldKind::Array(options) | FieldKind::Matrix(options) => {
                options.enforce_unique = enforce;
            }
            _ => self.misconfigure("enforce_unique applies to array and matrix fields"),
        }
        self
    }

    /// Drops repeated values during sanitization, keeping the first
    /// occurrence in order.
    pub fn deduplicate(mut self, deduplicate: bool) -> Self {
        match &mut self.kind {
            FieldKind::Array(options) | FieldKind::Matrix(options) => {
                options.deduplicate = deduplicate;
            }
            _ => self.misconfigure("deduplicate applies to array and matrix fields"),
        }
        self
    }

    /// Declares an additional allowed element kind. Declaring exactly one
    /// kind also enables element coercion during sanitization.
    pub fn element_kind(mut self, kind: ValueKind) -> Self {
        match &mut self.kind {
            FieldKind::Array(options) | FieldKind::Matrix(options) => {
                if !options.element_kinds.contains(&kind) {
                    options.element_kinds.push(kind);
                }
            }
            _ => self.misconfigure("element_kind applies to array and matrix fields"),
        }
        self
    }

    /// Restricts elements to an allow-list of values (array fields only).
    pub fn allow_values(mut self, values: Vec<Value>) -> Self {
        match &mut self.kind {
            FieldKind::Array(options) => options.allow_values = Some(values),
            _ => self.misconfigure("allow_values applies to array fields"),
        }
        self
    }

    /// Rejects elements on a deny-list of values (array fields only).
    pub fn deny_values(mut self, values: Vec<Value>) -> Self {
        match &mut self.kind {
            FieldKind::Array(options) => options.deny_values = values,
            _ => self.misconfigure("deny_values applies to array fields"),
        }
        self
    }

    /// Adds a named subfield (structured-object fields only).
    pub fn subfield(mut self, definition: FieldDefinition) -> Self {
        match &mut self.kind {
            FieldKind::Object(options) => options.subfields.push(definition),
            _ => self.misconfigure("subfield applies to structured-object fields"),
        }
        self
    }

    fn misconfigure(&mut self, message: &str) {
        if self.misconfigured.is_none() {
            self.misconfigured = Some(message.to_string());
        }
    }

    /// Validates the definition and yields the immutable field.
    ///
    /// Contradictory sequence bounds, duplicate subfield names, and
    /// excessive nesting are definition-time errors.
    pub fn build(self) -> Result<FieldDefinition> {
        if let Some(message) = self.misconfigured {
            return Err(SchemaError::invalid_definition(self.name, message));
        }

        if let FieldKind::Array(options) | FieldKind::Matrix(options) = &self.kind {
            if let (Some(min), Some(max)) = (options.min_items, options.max_items) {
                if min > max {
                    return Err(SchemaError::invalid_definition(
                        self.name,
                        format!("min_items ({min}) must not exceed max_items ({max})"),
                    ));
                }
            }
        }

        if let FieldKind::Object(options) = &self.kind {
            let mut seen = std::collections::BTreeSet::new();
            for subfield in &options.subfields {
                if !seen.insert(subfield.name.as_str()) {
                    return Err(SchemaError::DuplicateField {
                        scope: self.name,
                        name: subfield.name.clone(),
                    });
                }
            }
        }

        let depth = nesting_depth(&self.kind);
        if depth > MAX_NESTING_DEPTH {
            return Err(SchemaError::NestingTooDeep {
                field: self.name,
                max: MAX_NESTING_DEPTH,
            });
        }

        let codec: Arc<dyn ValueCodec> = match self.codec {
            Some(codec) => codec,
            None => match &self.kind {
                FieldKind::Matrix(_) => Arc::new(MatrixCodec),
                _ => Arc::new(JsonCodec),
            },
        };

        Ok(FieldDefinition {
            name: self.name,
            required: self.required,
            nullable: self.nullable,
            default: self.default,
            kind: self.kind,
            condition: self.condition,
            dependencies: self.dependencies,
            sanitizers: self.sanitizers,
            validators: self.validators,
            filters: self.filters,
            populator: self.populator,
            codec,
        })
    }
}

fn nesting_depth(kind: &FieldKind) -> usize {
    match kind {
        FieldKind::Object(options) => {
            1 + options
                .subfields
                .iter()
                .map(|subfield| nesting_depth(&subfield.kind))
                .max()
                .unwrap_or(0)
        }
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use serde_json::json;

    #[test]
    fn test_contradictory_bounds_are_a_definition_error() {
        let err = fields::array("tags").min_items(3).max_items(2).build().unwrap_err();
        match err {
            SchemaError::InvalidDefinition { field, .. } => assert_eq!(field, "tags"),
            other => panic!("expected InvalidDefinition, got {other}"),
        }
    }

    #[test]
    fn test_sequence_options_rejected_on_scalars() {
        let err = fields::text("title").min_items(1).build().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefinition { .. }));
    }

    #[test]
    fn test_duplicate_subfield_names_rejected() {
        let err = fields::object("size")
            .subfield(fields::number("width").build().unwrap())
            .subfield(fields::number("width").build().unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { .. }));
    }

    #[test]
    fn test_object_default_assembles_subfield_defaults() {
        let field = fields::object("size")
            .subfield(fields::number("width").default_value(json!(1)).build().unwrap())
            .subfield(fields::text("unit").default_value(json!("px")).build().unwrap())
            .subfield(fields::array("tags").build().unwrap())
            .build()
            .unwrap();
        assert_eq!(
            field.default_value(),
            json!({"width": 1, "unit": "px", "tags": []})
        );
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let mut field = fields::text("leaf").build().unwrap();
        // 31 wraps on top of the leaf reach the depth bound exactly.
        for level in 0..(MAX_NESTING_DEPTH - 1) {
            field = fields::object(format!("level{level}"))
                .subfield(field)
                .build()
                .unwrap();
        }
        let err = fields::object("root").subfield(field).build().unwrap_err();
        assert!(matches!(err, SchemaError::NestingTooDeep { .. }));
    }
}
