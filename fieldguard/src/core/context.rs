//! Per-pass validation context shared across the field tree.
//!
//! A [`ValidationContext`] carries the operation kind, the dot-path of the
//! field currently being processed, and the state shared by one pass: the
//! raw input snapshot, the sanitized snapshot, the conditional-logic
//! resolver, the translator, and a mutable cache bag for host extensions.
//! Contexts are cheap to clone; descending into a subfield produces a new
//! context with an extended path over the same shared state.

use crate::logic::{ConditionResolver, ConditionalLogic};
use crate::value::value_at;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// The operation a validation pass is running for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Creating a record; required fields must be present
    Insert,
    /// Partially updating a record; absent top-level fields stay untouched
    Update,
    /// Reading a record back
    Select,
    /// Removing a record
    Delete,
}

impl Operation {
    /// Returns true for [`Operation::Insert`].
    pub fn is_insert(&self) -> bool {
        matches!(self, Operation::Insert)
    }

    /// Returns the lowercase name of this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Select => "select",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Translates message keys into user-facing strings.
///
/// The host system supplies its own implementation when messages live in a
/// translation catalog; [`DefaultTranslator`] provides the built-in English
/// strings.
pub trait Translator: fmt::Debug + Send + Sync {
    /// Renders the message for `key` in `namespace`, substituting `vars`
    /// into `{placeholder}` slots.
    fn translate(&self, namespace: &str, key: &str, vars: &[(&str, String)]) -> String;
}

static MESSAGES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("required", "This field is required"),
        ("null", "This field cannot be null"),
        ("invalid", "Invalid input"),
        ("scalar_type", "Value must be of type {kind}"),
        ("sequence_type", "Value must be a list"),
        ("sequence_empty", "This field must not be empty"),
        ("element_type", "Value must be one of the following types: {kinds}"),
        (
            "element_type_summary",
            "One or more values are of an unsupported type",
        ),
        ("element_duplicate", "Duplicate value"),
        (
            "duplicate_summary",
            "This field must not contain duplicate values",
        ),
        ("sequence_exact", "This field must contain exactly {count} items"),
        ("sequence_min", "This field must contain at least {count} items"),
        ("sequence_max", "This field must contain at most {count} items"),
        ("value_not_allowed", "Value is not allowed"),
        ("membership_summary", "One or more values are not allowed"),
        ("object_type", "Value must be an object"),
        (
            "dependency_missing",
            "This field requires {field} to be present",
        ),
        ("store_failed", "This value cannot be stored"),
    ])
});

/// Built-in English message catalog.
#[derive(Debug, Clone, Default)]
pub struct DefaultTranslator;

impl Translator for DefaultTranslator {
    fn translate(&self, _namespace: &str, key: &str, vars: &[(&str, String)]) -> String {
        let mut message = MESSAGES
            .get(key)
            .map(|template| (*template).to_string())
            .unwrap_or_else(|| key.to_string());
        for (name, value) in vars {
            message = message.replace(&format!("{{{name}}}"), value);
        }
        message
    }
}

/// State shared by every context of one validation pass.
#[derive(Debug)]
struct PassState {
    raw: Value,
    sanitized: Mutex<Value>,
    resolver: Mutex<ConditionResolver>,
    translator: Arc<dyn Translator>,
    cache: Mutex<HashMap<String, Value>>,
}

/// Runtime context for one field within one validation pass.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    operation: Operation,
    path: String,
    as_subfield: bool,
    shared: Arc<PassState>,
}

impl ValidationContext {
    /// Creates a root context for one pass over `raw` input.
    pub fn new(operation: Operation, raw: Value, translator: Arc<dyn Translator>) -> Self {
        Self {
            operation,
            path: String::new(),
            as_subfield: false,
            shared: Arc::new(PassState {
                raw,
                sanitized: Mutex::new(Value::Null),
                resolver: Mutex::new(ConditionResolver::new()),
                translator,
                cache: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Creates a root context with the built-in English messages.
    pub fn with_defaults(operation: Operation, raw: Value) -> Self {
        Self::new(operation, raw, Arc::new(DefaultTranslator))
    }

    /// Context for a top-level field of the record.
    pub fn enter_field(&self, name: &str) -> Self {
        let mut child = self.clone();
        child.path = crate::value::join_path(&self.path, name);
        child.as_subfield = false;
        child
    }

    /// Context for a subfield of a composite; subfield scope re-enables the
    /// required check even on partial updates.
    pub fn descend(&self, name: &str) -> Self {
        let mut child = self.clone();
        child.path = crate::value::join_path(&self.path, name);
        child.as_subfield = true;
        child
    }

    /// The operation this pass runs for.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The dot-path of the field currently being processed.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the current field is being validated as a subfield of a
    /// composite.
    pub fn is_subfield(&self) -> bool {
        self.as_subfield
    }

    /// Translates a validation message key with the pass translator.
    pub fn translate(&self, key: &str, vars: &[(&str, String)]) -> String {
        self.shared.translator.translate("validation", key, vars)
    }

    /// The raw input value at `path`, if present.
    pub fn raw_value(&self, path: &str) -> Option<Value> {
        value_at(&self.shared.raw, path).cloned()
    }

    /// The sanitized input value at `path`, if the snapshot has been
    /// installed and the path is present.
    pub fn sanitized_value(&self, path: &str) -> Option<Value> {
        let snapshot = lock(&self.shared.sanitized);
        value_at(&snapshot, path).cloned()
    }

    /// Replaces the sanitized snapshot.
    pub fn set_sanitized_snapshot(&self, snapshot: Value) {
        *lock(&self.shared.sanitized) = snapshot;
    }

    /// Registers the schema's conditional-logic map with the pass resolver.
    pub fn install_conditions(&self, conditions: BTreeMap<String, ConditionalLogic>) {
        lock(&self.shared.resolver).set_conditional_logic(conditions);
    }

    /// Installs `snapshot` as both the sanitized snapshot and the resolver
    /// input, then resolves every registered conditional path.
    pub fn resolve_conditions(&self, snapshot: Value) {
        self.set_sanitized_snapshot(snapshot.clone());
        let mut resolver = lock(&self.shared.resolver);
        resolver.set_input(snapshot);
        resolver.resolve();
    }

    /// Whether the field at `path` is currently applicable according to the
    /// resolved conditional state.
    pub fn is_applicable(&self, path: &str) -> bool {
        lock(&self.shared.resolver).is_applicable(path)
    }

    /// The conditional results of the last resolve, keyed by path.
    pub fn conditional_results(&self) -> BTreeMap<String, bool> {
        lock(&self.shared.resolver).results().clone()
    }

    /// Every reference path `logic` consults, resolved against `path`.
    pub fn referenced_paths(&self, path: &str, logic: &ConditionalLogic) -> Vec<String> {
        lock(&self.shared.resolver).referenced_field_paths(path, Some(logic))
    }

    /// Fetches a value from the pass cache bag.
    pub fn cache_get(&self, key: &str) -> Option<Value> {
        lock(&self.shared.cache).get(key).cloned()
    }

    /// Stores a value in the pass cache bag.
    pub fn cache_put(&self, key: impl Into<String>, value: Value) {
        lock(&self.shared.cache).insert(key.into(), value);
    }
}

/// Locks a pass-state mutex, tolerating poisoning: the protected state is
/// plain data and remains usable after a panicked holder.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_translator_substitutes_vars() {
        let translator = DefaultTranslator;
        assert_eq!(
            translator.translate("validation", "sequence_exact", &[("count", "2".to_string())]),
            "This field must contain exactly 2 items"
        );
        assert_eq!(
            translator.translate("validation", "required", &[]),
            "This field is required"
        );
        assert_eq!(translator.translate("validation", "no_such_key", &[]), "no_such_key");
    }

    #[test]
    fn test_paths_extend_on_descend() {
        let ctx = ValidationContext::with_defaults(Operation::Insert, json!({}));
        let field = ctx.enter_field("dimensions");
        assert_eq!(field.path(), "dimensions");
        assert!(!field.is_subfield());
        let sub = field.descend("unit");
        assert_eq!(sub.path(), "dimensions.unit");
        assert!(sub.is_subfield());
    }

    #[test]
    fn test_raw_and_sanitized_accessors() {
        let ctx =
            ValidationContext::with_defaults(Operation::Update, json!({"a": {"b": " x "}}));
        assert_eq!(ctx.raw_value("a.b"), Some(json!(" x ")));
        assert_eq!(ctx.sanitized_value("a.b"), None);
        ctx.set_sanitized_snapshot(json!({"a": {"b": "x"}}));
        assert_eq!(ctx.sanitized_value("a.b"), Some(json!("x")));
    }

    #[test]
    fn test_cache_bag_round_trip() {
        let ctx = ValidationContext::with_defaults(Operation::Insert, json!({}));
        assert_eq!(ctx.cache_get("k"), None);
        ctx.cache_put("k", json!(42));
        assert_eq!(ctx.cache_get("k"), Some(json!(42)));
    }

    #[test]
    fn test_conditions_flow_through_context() {
        let ctx = ValidationContext::with_defaults(Operation::Insert, json!({}));
        ctx.install_conditions(
            [(
                "extra".to_string(),
                crate::logic::ConditionalLogic::when(
                    "/mode",
                    crate::logic::Operator::Eq,
                    json!("advanced"),
                ),
            )]
            .into_iter()
            .collect(),
        );
        ctx.resolve_conditions(json!({"mode": "basic"}));
        assert!(!ctx.is_applicable("extra"));
        ctx.resolve_conditions(json!({"mode": "advanced"}));
        assert!(ctx.is_applicable("extra"));
    }
}
