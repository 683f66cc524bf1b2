//! Evaluation of conditional-logic rules against a record snapshot.

use super::path::resolve_reference;
use super::{ConditionalLogic, Operator, OperatorSet, RuleSet};
use crate::logging::truncate_field;
use crate::value::{value_at, values_equal};
use regex::RegexBuilder;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

/// Evaluates conditional visibility/requirement rules for one validation
/// pass.
///
/// A resolver is created per pass, fed the working snapshot with
/// [`set_input`](Self::set_input) and the declarative rule map with
/// [`set_conditional_logic`](Self::set_conditional_logic), and then asked to
/// [`resolve`](Self::resolve) every registered path at once or to
/// [`matches`](Self::matches) individual rule sets on demand.
///
/// Lookups are memoized per pass: resolving the same reference against the
/// same base path, or fetching the same field value twice, hits a cache. The
/// caches are cleared whenever the snapshot or the rule map changes, so no
/// state leaks between passes.
#[derive(Debug, Default)]
pub struct ConditionResolver {
    /// Working snapshot the rule references are evaluated against
    input: Value,
    /// Registered rule map: field path → its conditional logic
    logic: BTreeMap<String, ConditionalLogic>,
    /// Outcome of the last `resolve` call
    results: BTreeMap<String, bool>,
    /// Memoized field-value lookups, keyed by resolved path
    value_cache: HashMap<String, Option<Value>>,
    /// Memoized reference resolution, keyed by (base path, reference)
    reference_cache: HashMap<(String, String), String>,
}

impl ConditionResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns the working snapshot and clears all memoized state.
    pub fn set_input(&mut self, input: Value) {
        debug!(
            input = %truncate_field(&input.to_string(), 256),
            "conditional resolver input set"
        );
        self.input = input;
        self.clear_caches();
        self.results.clear();
    }

    /// Assigns the declarative rule map and clears all memoized state.
    ///
    /// Paths may be registered with empty logic; they always match on their
    /// own but participate in ancestor-failure cascading during
    /// [`resolve`](Self::resolve).
    pub fn set_conditional_logic(&mut self, logic: BTreeMap<String, ConditionalLogic>) {
        self.logic = logic;
        self.clear_caches();
        self.results.clear();
    }

    /// Evaluates a rule set against the snapshot, relative to `path`.
    ///
    /// When `logic` is `None` the logic registered for `path` is used; a
    /// path with no registered logic matches unconditionally.
    pub fn matches(&mut self, path: &str, logic: Option<&ConditionalLogic>) -> bool {
        match logic {
            Some(logic) => self.eval_logic(path, logic),
            None => match self.logic.get(path).cloned() {
                Some(logic) => self.eval_logic(path, &logic),
                None => true,
            },
        }
    }

    /// Collects every reference path a rule set would consult, resolved
    /// against `path` and de-duplicated in first-seen order.
    ///
    /// Used to detect rules that reference fields absent from the submitted
    /// input before evaluating them.
    pub fn referenced_field_paths(
        &mut self,
        path: &str,
        logic: Option<&ConditionalLogic>,
    ) -> Vec<String> {
        let logic = match logic {
            Some(logic) => logic.clone(),
            None => match self.logic.get(path).cloned() {
                Some(logic) => logic,
                None => return Vec::new(),
            },
        };
        let mut collected = Vec::new();
        self.collect_references(path, &logic, &mut collected);
        collected
    }

    /// Evaluates every registered path and stores the outcome.
    ///
    /// Paths are visited in ascending length order so that a failed path
    /// marks all of its dot-descendants false without re-evaluating them.
    #[instrument(skip(self), fields(paths = self.logic.len()))]
    pub fn resolve(&mut self) -> &BTreeMap<String, bool> {
        self.clear_caches();
        self.results.clear();

        let mut paths: Vec<String> = self.logic.keys().cloned().collect();
        paths.sort_by_key(|path| path.len());

        let mut failed_roots: Vec<String> = Vec::new();
        for path in paths {
            let inherited_failure = failed_roots.iter().any(|root| is_descendant(&path, root));
            let matched = if inherited_failure {
                false
            } else {
                self.matches(&path, None)
            };
            if !matched && !inherited_failure {
                failed_roots.push(path.clone());
            }
            debug!(path = %path, matched, inherited_failure, "conditional state resolved");
            self.results.insert(path, matched);
        }
        &self.results
    }

    /// The results of the last [`resolve`](Self::resolve) call.
    pub fn results(&self) -> &BTreeMap<String, bool> {
        &self.results
    }

    /// Whether the field at `path` is currently applicable.
    ///
    /// A path is applicable unless it, or one of its dot-ancestors, resolved
    /// false. Paths never registered are applicable by default.
    pub fn is_applicable(&self, path: &str) -> bool {
        if self.results.get(path) == Some(&false) {
            return false;
        }
        for (index, byte) in path.bytes().enumerate() {
            if byte == b'.' && self.results.get(&path[..index]) == Some(&false) {
                return false;
            }
        }
        true
    }

    fn clear_caches(&mut self) {
        self.value_cache.clear();
        self.reference_cache.clear();
    }

    fn eval_logic(&mut self, path: &str, logic: &ConditionalLogic) -> bool {
        match logic {
            ConditionalLogic::All(rule_sets) => {
                rule_sets.iter().all(|rs| self.eval_rule_set(path, rs))
            }
            ConditionalLogic::Rules(rule_set) => self.eval_rule_set(path, rule_set),
        }
    }

    fn eval_rule_set(&mut self, path: &str, rule_set: &RuleSet) -> bool {
        for (reference, operators) in &rule_set.rules {
            if !self.eval_reference(path, reference, operators) {
                return false;
            }
        }
        if !rule_set.or_group.is_empty()
            && !rule_set
                .or_group
                .iter()
                .any(|alternative| self.eval_logic(path, alternative))
        {
            return false;
        }
        true
    }

    fn eval_reference(&mut self, path: &str, reference: &str, operators: &OperatorSet) -> bool {
        let resolved = self.resolve_cached(path, reference);
        let referenced = self.lookup_cached(&resolved);

        // Arrays compare by length, unifying array and number semantics.
        let compared = match referenced {
            Some(Value::Array(items)) => Some(Value::from(items.len())),
            other => other,
        };

        for (operator, expected) in operators {
            if !operator_matches(*operator, compared.as_ref(), expected) {
                debug!(
                    path,
                    reference,
                    operator = ?operator,
                    "conditional rule did not match"
                );
                return false;
            }
        }
        true
    }

    fn collect_references(&mut self, path: &str, logic: &ConditionalLogic, out: &mut Vec<String>) {
        match logic {
            ConditionalLogic::All(rule_sets) => {
                for rule_set in rule_sets {
                    self.collect_rule_set_references(path, rule_set, out);
                }
            }
            ConditionalLogic::Rules(rule_set) => {
                self.collect_rule_set_references(path, rule_set, out);
            }
        }
    }

    fn collect_rule_set_references(&mut self, path: &str, rule_set: &RuleSet, out: &mut Vec<String>) {
        for reference in rule_set.rules.keys() {
            let resolved = self.resolve_cached(path, reference);
            if !out.contains(&resolved) {
                out.push(resolved);
            }
        }
        for alternative in &rule_set.or_group {
            self.collect_references(path, alternative, out);
        }
    }

    fn resolve_cached(&mut self, base: &str, reference: &str) -> String {
        let key = (base.to_string(), reference.to_string());
        if let Some(hit) = self.reference_cache.get(&key) {
            return hit.clone();
        }
        let resolved = resolve_reference(base, reference);
        self.reference_cache.insert(key, resolved.clone());
        resolved
    }

    fn lookup_cached(&mut self, resolved: &str) -> Option<Value> {
        if let Some(hit) = self.value_cache.get(resolved) {
            return hit.clone();
        }
        let value = value_at(&self.input, resolved).cloned();
        self.value_cache.insert(resolved.to_string(), value.clone());
        value
    }
}

/// True when `path` descends from `root` through at least one `.` segment.
fn is_descendant(path: &str, root: &str) -> bool {
    path.len() > root.len()
        && path.starts_with(root)
        && path.as_bytes()[root.len()] == b'.'
}

fn operator_matches(operator: Operator, actual: Option<&Value>, expected: &Value) -> bool {
    match operator {
        Operator::Eq => values_equal(actual.unwrap_or(&Value::Null), expected),
        Operator::NotEq => !values_equal(actual.unwrap_or(&Value::Null), expected),
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            // Ordering requires a numeric reference; anything else fails the
            // rule without raising.
            match (actual.and_then(Value::as_f64), expected.as_f64()) {
                (Some(left), Some(right)) => match operator {
                    Operator::Gt => left > right,
                    Operator::Gte => left >= right,
                    Operator::Lt => left < right,
                    Operator::Lte => left <= right,
                    _ => unreachable!(),
                },
                _ => false,
            }
        }
        Operator::Regexp => {
            let Some(Value::String(subject)) = actual else {
                return false;
            };
            let Some((pattern, flags)) = regexp_spec(expected) else {
                return false;
            };
            match build_regex(&pattern, &flags) {
                Some(regex) => regex.is_match(subject),
                None => false,
            }
        }
    }
}

/// Extracts the pattern and flags from a `regexp` operand, which may be a
/// plain pattern string or a `{pattern, flags}` object.
fn regexp_spec(operand: &Value) -> Option<(String, String)> {
    match operand {
        Value::String(pattern) => Some((pattern.clone(), String::new())),
        Value::Object(spec) => {
            let pattern = spec.get("pattern")?.as_str()?.to_string();
            let flags = spec
                .get("flags")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some((pattern, flags))
        }
        _ => None,
    }
}

fn build_regex(pattern: &str, flags: &str) -> Option<regex::Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            // Unicode matching is the default; global has no meaning for a
            // boolean match.
            'u' | 'g' => {}
            _ => return None,
        }
    }
    builder.build().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolver_with(input: Value) -> ConditionResolver {
        let mut resolver = ConditionResolver::new();
        resolver.set_input(input);
        resolver
    }

    fn logic(raw: Value) -> ConditionalLogic {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_relative_and_absolute_references_are_equivalent() {
        let mut resolver = resolver_with(json!({"foo": "FOO", "bar": {"baz": "BAZ"}}));
        let relative = logic(json!({"../foo": {"=": "FOO"}}));
        let absolute = logic(json!({"/foo": {"=": "FOO"}}));
        assert!(resolver.matches("bar.baz", Some(&relative)));
        assert!(resolver.matches("bar.baz", Some(&absolute)));
    }

    #[test]
    fn test_bare_reference_is_a_sibling() {
        let mut resolver = resolver_with(json!({"bar": {"baz": "BAZ", "qux": 5}}));
        let sibling = logic(json!({"qux": {">": 4}}));
        assert!(resolver.matches("bar.baz", Some(&sibling)));
    }

    #[test]
    fn test_and_list_short_circuits() {
        let mut resolver = resolver_with(json!({"a": 1, "b": 2}));
        let all = logic(json!([{"a": {"=": 1}}, {"b": {"=": 3}}]));
        assert!(!resolver.matches("c", Some(&all)));
        let all_pass = logic(json!([{"a": {"=": 1}}, {"b": {"=": 2}}]));
        assert!(resolver.matches("c", Some(&all_pass)));
    }

    #[test]
    fn test_or_group_semantics() {
        let mut resolver = resolver_with(json!({"a": 1, "b": 2, "c": 9}));
        // (a = 1 AND b = 99) OR (c = 9)
        let grouped = logic(json!({
            "orGroup": [
                [{"a": {"=": 1}}, {"b": {"=": 99}}],
                [{"c": {"=": 9}}]
            ]
        }));
        assert!(resolver.matches("x", Some(&grouped)));

        // (a = 1 AND b = 2) OR (c = 0) — first alternative carries it.
        let grouped = logic(json!({
            "orGroup": [
                [{"a": {"=": 1}}, {"b": {"=": 2}}],
                [{"c": {"=": 0}}]
            ]
        }));
        assert!(resolver.matches("x", Some(&grouped)));

        let grouped = logic(json!({
            "orGroup": [
                [{"a": {"=": 0}}],
                [{"c": {"=": 0}}]
            ]
        }));
        assert!(!resolver.matches("x", Some(&grouped)));
    }

    #[test]
    fn test_array_references_compare_by_length() {
        let mut resolver = resolver_with(json!({"tags": ["a", "b", "c"]}));
        assert!(resolver.matches("x", Some(&logic(json!({"tags": {"=": 3}})))));
        assert!(resolver.matches("x", Some(&logic(json!({"tags": {">=": 2}})))));
        assert!(!resolver.matches("x", Some(&logic(json!({"tags": {"<": 3}})))));
    }

    #[test]
    fn test_ordering_operators_require_numbers() {
        let mut resolver = resolver_with(json!({"name": "abc"}));
        assert!(!resolver.matches("x", Some(&logic(json!({"name": {">": 1}})))));
    }

    #[test]
    fn test_numbers_compare_numerically_for_equality() {
        let mut resolver = resolver_with(json!({"count": 3}));
        assert!(resolver.matches("x", Some(&logic(json!({"count": {"=": 3.0}})))));
        assert!(!resolver.matches("x", Some(&logic(json!({"count": {"!=": 3}})))));
    }

    #[test]
    fn test_regexp_plain_pattern_and_flags() {
        let mut resolver = resolver_with(json!({"email": "User@Example.COM"}));
        assert!(resolver.matches(
            "x",
            Some(&logic(json!({"email": {"regexp": "^[^@]+@[^@]+$"}})))
        ));
        assert!(!resolver.matches(
            "x",
            Some(&logic(json!({"email": {"regexp": "example\\.com$"}})))
        ));
        assert!(resolver.matches(
            "x",
            Some(&logic(
                json!({"email": {"regexp": {"pattern": "example\\.com$", "flags": "i"}}})
            ))
        ));
    }

    #[test]
    fn test_regexp_requires_string_reference_and_valid_pattern() {
        let mut resolver = resolver_with(json!({"count": 7, "name": "x"}));
        assert!(!resolver.matches("x", Some(&logic(json!({"count": {"regexp": "7"}})))));
        assert!(!resolver.matches("x", Some(&logic(json!({"name": {"regexp": "("}})))));
    }

    #[test]
    fn test_absent_reference_compares_as_null() {
        let mut resolver = resolver_with(json!({}));
        assert!(resolver.matches("x", Some(&logic(json!({"ghost": {"=": null}})))));
        assert!(!resolver.matches("x", Some(&logic(json!({"ghost": {"=": 1}})))));
    }

    #[test]
    fn test_resolve_cascades_ancestor_failure() {
        let mut resolver = ConditionResolver::new();
        resolver.set_conditional_logic(
            [
                (
                    "parent".to_string(),
                    logic(json!({"/enabled": {"=": true}})),
                ),
                ("parent.child".to_string(), logic(json!({}))),
                ("parent.child.leaf".to_string(), logic(json!({}))),
                ("sibling".to_string(), logic(json!({}))),
            ]
            .into_iter()
            .collect(),
        );
        resolver.set_input(json!({"enabled": false}));
        let results = resolver.resolve().clone();

        assert_eq!(results["parent"], false);
        assert_eq!(results["parent.child"], false);
        assert_eq!(results["parent.child.leaf"], false);
        assert_eq!(results["sibling"], true);

        assert!(!resolver.is_applicable("parent.child"));
        assert!(!resolver.is_applicable("parent.child.unregistered"));
        assert!(resolver.is_applicable("sibling"));
        assert!(resolver.is_applicable("never.registered"));
    }

    #[test]
    fn test_resolve_does_not_confuse_name_prefixes() {
        let mut resolver = ConditionResolver::new();
        resolver.set_conditional_logic(
            [
                ("par".to_string(), logic(json!({"/enabled": {"=": true}}))),
                ("parent".to_string(), logic(json!({}))),
            ]
            .into_iter()
            .collect(),
        );
        resolver.set_input(json!({"enabled": false}));
        let results = resolver.resolve().clone();
        assert_eq!(results["par"], false);
        // "parent" is not a dot-descendant of "par".
        assert_eq!(results["parent"], true);
    }

    #[test]
    fn test_referenced_field_paths_walks_or_groups_and_dedupes() {
        let mut resolver = resolver_with(json!({}));
        let grouped = logic(json!({
            "../status": {"=": "on"},
            "orGroup": [
                [{"../status": {"=": "off"}}, {"./kind": {"=": "a"}}],
                [{"/global": {"=": 1}}]
            ]
        }));
        let paths = resolver.referenced_field_paths("section.field", Some(&grouped));
        assert_eq!(paths, vec!["status", "section.kind", "global"]);
    }

    #[test]
    fn test_caches_cleared_on_new_input() {
        let mut resolver = resolver_with(json!({"flag": 1}));
        let rule = logic(json!({"flag": {"=": 1}}));
        assert!(resolver.matches("x", Some(&rule)));
        resolver.set_input(json!({"flag": 2}));
        assert!(!resolver.matches("x", Some(&rule)));
    }
}
