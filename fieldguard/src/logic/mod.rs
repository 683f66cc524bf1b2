//! Conditional-logic rule model and resolver.
//!
//! Fields can declare visibility/requirement rules against the values of
//! other fields. The rule format is declarative data, exchanged as JSON:
//!
//! ```json
//! { "../status": { "=": "published" }, "count": { ">": 0 } }
//! ```
//!
//! A rule set is a map from reference paths to operator/value pairs; an
//! array of rule sets is an implicit AND; the reserved `orGroup` key holds
//! alternatives evaluated as OR. Reference paths are resolved relative to
//! the field carrying the rules (see [`path::resolve_reference`]).
//!
//! The [`ConditionResolver`] evaluates these rules against a snapshot of the
//! submitted record, memoizing path resolution and value lookups within one
//! pass and cascading ancestor failures to descendant paths.

pub mod path;
pub mod resolver;

pub use resolver::ConditionResolver;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A comparison operator usable inside a conditional rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Strict equality
    #[serde(rename = "=")]
    Eq,
    /// Strict inequality
    #[serde(rename = "!=")]
    NotEq,
    /// Numeric greater-than
    #[serde(rename = ">")]
    Gt,
    /// Numeric greater-or-equal
    #[serde(rename = ">=")]
    Gte,
    /// Numeric less-than
    #[serde(rename = "<")]
    Lt,
    /// Numeric less-or-equal
    #[serde(rename = "<=")]
    Lte,
    /// Regular-expression match against a string reference
    #[serde(rename = "regexp")]
    Regexp,
}

/// The operator/value pairs applied to one referenced field. Every pair must
/// hold for the rule to match.
pub type OperatorSet = BTreeMap<Operator, serde_json::Value>;

/// A single rule set: reference paths mapped to operator sets, plus an
/// optional `orGroup` of alternatives evaluated as OR.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Alternatives, any one of which satisfies this rule set. Members
    /// recurse through the full logic evaluation, so they may themselves be
    /// AND-lists or contain nested `orGroup`s.
    #[serde(rename = "orGroup", default, skip_serializing_if = "Vec::is_empty")]
    pub or_group: Vec<ConditionalLogic>,

    /// Ordinary entries: reference path → operator/value pairs. All entries
    /// must match.
    #[serde(flatten)]
    pub rules: BTreeMap<String, OperatorSet>,
}

/// Conditional logic attached to a field: a single rule set, or a list of
/// rule sets combined with AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionalLogic {
    /// Implicit AND across every member rule set
    All(Vec<RuleSet>),
    /// A single rule set
    Rules(RuleSet),
}

impl ConditionalLogic {
    /// Convenience constructor for a single-rule condition:
    /// `when("../status", Operator::Eq, json!("published"))`.
    pub fn when(reference: impl Into<String>, operator: Operator, value: serde_json::Value) -> Self {
        let mut ops = OperatorSet::new();
        ops.insert(operator, value);
        let mut rules = BTreeMap::new();
        rules.insert(reference.into(), ops);
        ConditionalLogic::Rules(RuleSet {
            or_group: Vec::new(),
            rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_single_rule_set() {
        let logic: ConditionalLogic =
            serde_json::from_value(json!({"../foo": {"=": "FOO"}})).unwrap();
        match logic {
            ConditionalLogic::Rules(rs) => {
                assert!(rs.or_group.is_empty());
                assert_eq!(rs.rules["../foo"][&Operator::Eq], json!("FOO"));
            }
            other => panic!("expected a single rule set, got {other:?}"),
        }
    }

    #[test]
    fn test_deserialize_and_list() {
        let logic: ConditionalLogic =
            serde_json::from_value(json!([{"a": {">": 1}}, {"b": {"<": 2}}])).unwrap();
        match logic {
            ConditionalLogic::All(items) => assert_eq!(items.len(), 2),
            other => panic!("expected an AND list, got {other:?}"),
        }
    }

    #[test]
    fn test_deserialize_or_group() {
        let logic: ConditionalLogic = serde_json::from_value(json!({
            "orGroup": [
                [{"a": {"=": 1}}, {"b": {"=": 2}}],
                [{"c": {"=": 3}}]
            ]
        }))
        .unwrap();
        match logic {
            ConditionalLogic::Rules(rs) => {
                assert_eq!(rs.or_group.len(), 2);
                assert!(rs.rules.is_empty());
            }
            other => panic!("expected a rule set with orGroup, got {other:?}"),
        }
    }

    #[test]
    fn test_roundtrip_preserves_operators() {
        let logic = ConditionalLogic::when("count", Operator::Gte, json!(3));
        let encoded = serde_json::to_value(&logic).unwrap();
        assert_eq!(encoded, json!({"count": {">=": 3}}));
        let decoded: ConditionalLogic = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, logic);
    }
}
