//! The record schema: the top-level grouping of field definitions and the
//! pass operations run against it.

use crate::core::context::{DefaultTranslator, Operation, Translator, ValidationContext};
use crate::core::field::{FieldDefinition, FieldKind};
use crate::core::hooks::FilterStage;
use crate::core::outcome::{ErrorMap, FieldFailure};
use crate::core::pipeline::validate_member;
use crate::error::{Result, SchemaError};
use crate::logging::{truncate_field, LogConfig};
use crate::logic::{ConditionalLogic, RuleSet};
use crate::value::join_path;
use futures::future::join_all;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// The outcome of running a schema pass over one record.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// The sanitized (and filtered) record the pass worked on
    pub value: Value,
    /// Path-keyed failures; empty on full success
    pub errors: ErrorMap,
}

impl ValidationReport {
    /// Returns true when the pass produced no errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A record schema: the ordered top-level fields of one record shape.
///
/// A schema is built once at startup and shared across requests. Each pass
/// creates its own [`ValidationContext`] and error map; no pass state
/// survives into the next.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: Vec<FieldDefinition>,
    translator: Arc<dyn Translator>,
    logging: LogConfig,
}

impl Schema {
    /// Starts building a schema.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// The schema's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The top-level fields in declaration order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Looks up a top-level field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name() == name)
    }

    /// Creates the per-pass context for `raw` input, with every field's
    /// conditional logic registered on the pass resolver.
    pub fn context(&self, operation: Operation, raw: Value) -> ValidationContext {
        let ctx = ValidationContext::new(operation, raw, self.translator.clone());
        ctx.install_conditions(self.conditional_map());
        ctx
    }

    /// Runs each top-level field's input filters for `stage`, in
    /// declaration order. A filter returning no value deletes the key.
    pub async fn apply_filters(
        &self,
        stage: FilterStage,
        record: Value,
        ctx: &ValidationContext,
    ) -> Result<Value> {
        let mut map = match record {
            Value::Object(map) => map,
            other => return Ok(other),
        };
        for field in &self.fields {
            let current = map.remove(field.name());
            let fctx = ctx.enter_field(field.name());
            if let Some(filtered) = field.apply_filters(stage, current, &fctx).await? {
                map.insert(field.name().to_string(), filtered);
            }
        }
        Ok(Value::Object(map))
    }

    /// Runs every present field's sanitizer chain over `record`.
    pub async fn sanitize(&self, record: Value, ctx: &ValidationContext) -> Result<Value> {
        let mut map = match record {
            Value::Object(map) => map,
            other => return Ok(other),
        };
        for field in &self.fields {
            if let Some(current) = map.remove(field.name()) {
                let fctx = ctx.enter_field(field.name());
                let sanitized = field.sanitize(current, &fctx).await?;
                map.insert(field.name().to_string(), sanitized);
            }
        }
        Ok(Value::Object(map))
    }

    /// Validates every top-level field concurrently against the sanitized
    /// record, returning the merged error map.
    ///
    /// Expects [`ValidationContext::resolve_conditions`] to have installed
    /// the sanitized snapshot; [`run`](Self::run) wires the full sequence.
    pub async fn validate(&self, record: &Value, ctx: &ValidationContext) -> ErrorMap {
        let map = record.as_object();
        let mut pending = Vec::new();
        for field in &self.fields {
            let value = map.and_then(|m| m.get(field.name()));
            pending.push(validate_member(field, value, ctx.enter_field(field.name())));
        }
        let mut errors = ErrorMap::new();
        for child_errors in join_all(pending).await {
            errors.extend(child_errors);
        }
        errors
    }

    /// Runs one full write pass: before-sanitize filters, sanitization,
    /// conditional resolution, before-validate filters, then validation.
    #[instrument(skip(self, record), fields(schema = %self.name, operation = %operation))]
    pub async fn run(&self, operation: Operation, record: Value) -> Result<ValidationReport> {
        let ctx = self.context(operation, record.clone());

        let working = self
            .apply_filters(FilterStage::BeforeSanitize, record, &ctx)
            .await?;
        let working = self.sanitize(working, &ctx).await?;
        ctx.resolve_conditions(working.clone());

        let working = self
            .apply_filters(FilterStage::BeforeValidate, working, &ctx)
            .await?;
        ctx.set_sanitized_snapshot(working.clone());

        if self.logging.log_pipeline_details {
            debug!(
                record = %truncate_field(&working.to_string(), self.logging.max_field_length),
                "record after sanitize and filters"
            );
        }

        let errors = self.validate(&working, &ctx).await;
        debug!(errors = errors.len(), "validation pass finished");
        Ok(ValidationReport {
            value: working,
            errors,
        })
    }

    /// Populates every present field concurrently, expanding stored
    /// references into their application-facing shapes. Only meaningful for
    /// a record that reached a clean validated state.
    pub async fn populate(&self, record: Value, ctx: &ValidationContext) -> Result<Value> {
        let mut map = match record {
            Value::Object(map) => map,
            other => return Ok(other),
        };
        let mut pending = Vec::new();
        for field in &self.fields {
            if let Some(current) = map.remove(field.name()) {
                let fctx = ctx.enter_field(field.name());
                pending.push(async move {
                    let populated = field.populate(current, &fctx).await;
                    (field.name().to_string(), populated)
                });
            }
        }
        for (name, populated) in join_all(pending).await {
            map.insert(name, populated?);
        }
        Ok(Value::Object(map))
    }

    /// Runs the before-persist filters and serializes each present field to
    /// its stored text blob.
    pub async fn persist(
        &self,
        record: Value,
        ctx: &ValidationContext,
    ) -> Result<BTreeMap<String, String>> {
        let record = self
            .apply_filters(FilterStage::BeforePersist, record, ctx)
            .await?;
        let Value::Object(map) = record else {
            return Err(SchemaError::Internal(
                "a record must serialize from an object".to_string(),
            ));
        };
        let mut stored = BTreeMap::new();
        for field in &self.fields {
            if let Some(value) = map.get(field.name()) {
                stored.insert(field.name().to_string(), field.serialize_value(value)?);
            }
        }
        Ok(stored)
    }

    /// Deserializes stored text blobs back into a record. Run
    /// [`populate`](Self::populate) afterwards to expand stored references.
    pub fn revive(&self, stored: &BTreeMap<String, String>) -> Result<Value> {
        let mut map = serde_json::Map::new();
        for field in &self.fields {
            if let Some(text) = stored.get(field.name()) {
                map.insert(field.name().to_string(), field.deserialize_value(text)?);
            }
        }
        Ok(Value::Object(map))
    }

    /// Verifies that every field's effective default would pass its own
    /// validators, so an optional absent field can always fall back to it.
    /// Fields whose default is null have nothing to check.
    pub async fn check_defaults(&self) -> ErrorMap {
        let mut record = serde_json::Map::new();
        for field in &self.fields {
            let default = field.default_value();
            if !default.is_null() {
                record.insert(field.name().to_string(), default);
            }
        }
        let snapshot = Value::Object(record.clone());
        let ctx = self.context(Operation::Update, snapshot.clone());
        ctx.resolve_conditions(snapshot);

        let mut errors = ErrorMap::new();
        for field in &self.fields {
            let Some(default) = record.get(field.name()) else {
                continue;
            };
            let fctx = ctx.enter_field(field.name());
            let mut local = ErrorMap::new();
            match field.validate(Some(default), &fctx, &mut local).await {
                Ok(()) => {}
                Err(FieldFailure::Invalid(message)) => {
                    local.insert(fctx.path().to_string(), message);
                }
                Err(FieldFailure::Recorded) => {}
            }
            errors.extend(local);
        }
        errors
    }

    /// The conditional-logic map registered on every pass resolver: each
    /// field path, with its declared logic or an empty rule set. Registering
    /// unconditioned paths lets ancestor failures cascade to them.
    fn conditional_map(&self) -> BTreeMap<String, ConditionalLogic> {
        let mut map = BTreeMap::new();
        for field in &self.fields {
            collect_conditions(field, "", &mut map);
        }
        map
    }
}

fn collect_conditions(
    field: &FieldDefinition,
    prefix: &str,
    out: &mut BTreeMap<String, ConditionalLogic>,
) {
    let path = join_path(prefix, field.name());
    let logic = field
        .condition()
        .cloned()
        .unwrap_or(ConditionalLogic::Rules(RuleSet::default()));
    out.insert(path.clone(), logic);
    if let FieldKind::Object(options) = field.kind() {
        for subfield in &options.subfields {
            collect_conditions(subfield, &path, out);
        }
    }
}

/// Builder for [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldDefinition>,
    translator: Arc<dyn Translator>,
    logging: LogConfig,
}

impl SchemaBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            translator: Arc::new(DefaultTranslator),
            logging: LogConfig::default(),
        }
    }

    /// Appends a top-level field.
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Replaces the message translator.
    pub fn translator(mut self, translator: impl Translator + 'static) -> Self {
        self.translator = Arc::new(translator);
        self
    }

    /// Adjusts the logging configuration.
    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Validates and yields the immutable schema.
    pub fn build(self) -> Result<Schema> {
        let mut seen = std::collections::BTreeSet::new();
        for field in &self.fields {
            if !seen.insert(field.name().to_string()) {
                return Err(SchemaError::DuplicateField {
                    scope: self.name,
                    name: field.name().to_string(),
                });
            }
        }
        Ok(Schema {
            name: self.name,
            fields: self.fields,
            translator: self.translator,
            logging: self.logging,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use serde_json::json;

    fn product_schema() -> Schema {
        Schema::builder("product")
            .field(fields::text("title").required(true).build().unwrap())
            .field(
                fields::array("tags")
                    .element_kind(crate::value::ValueKind::Text)
                    .deduplicate(true)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_duplicate_top_level_names_rejected() {
        let err = Schema::builder("s")
            .field(fields::text("a").build().unwrap())
            .field(fields::number("a").build().unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { .. }));
    }

    #[tokio::test]
    async fn test_insert_requires_missing_fields() {
        let schema = product_schema();
        let report = schema.run(Operation::Insert, json!({})).await.unwrap();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors["title"], "This field is required");
    }

    #[tokio::test]
    async fn test_partial_update_skips_absent_required_fields() {
        let schema = product_schema();
        let report = schema
            .run(Operation::Update, json!({"tags": "[\"a\",\"a\",\"b\"]"}))
            .await
            .unwrap();
        assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);
        assert_eq!(report.value["tags"], json!(["a", "b"]));
    }

    #[tokio::test]
    async fn test_run_reports_sanitized_value_alongside_errors() {
        let schema = product_schema();
        let report = schema
            .run(Operation::Insert, json!({"tags": [{"a": 1}, "ok"]}))
            .await
            .unwrap();
        assert_eq!(report.errors["title"], "This field is required");
        assert!(report.errors.contains_key("tags.0"));
        assert!(report.errors.contains_key("tags"));
    }

    #[tokio::test]
    async fn test_check_defaults_flags_bad_defaults() {
        let schema = Schema::builder("s")
            .field(
                fields::array("pair")
                    .min_items(2)
                    .max_items(2)
                    .default_value(json!([1]))
                    .build()
                    .unwrap(),
            )
            .field(fields::text("free").build().unwrap())
            .build()
            .unwrap();
        let errors = schema.check_defaults().await;
        assert_eq!(errors["pair"], "This field must contain exactly 2 items");
        assert!(!errors.contains_key("free"));
    }

    #[tokio::test]
    async fn test_persist_and_revive_round_trip() {
        let schema = product_schema();
        let ctx = schema.context(Operation::Select, json!({}));
        let record = json!({"title": "Lamp", "tags": ["a", "b"]});
        let stored = schema.persist(record.clone(), &ctx).await.unwrap();
        assert_eq!(stored["tags"], "[\"a\",\"b\"]");
        assert_eq!(schema.revive(&stored).unwrap(), record);
    }
}
