//! Value helpers shared across the engine.
//!
//! The canonical in-memory value model is [`serde_json::Value`]. This module
//! provides dot-path access into nested values, the primitive kind lattice
//! used for element typing and coercion, and the equality rule shared by the
//! conditional-logic resolver and the membership validators.

use serde_json::Value;

/// The primitive kinds a scalar value (or sequence element) can be declared
/// as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Boolean values
    Boolean,
    /// Whole numbers
    Integer,
    /// Any numeric value, integral or not
    Float,
    /// String values
    Text,
}

impl ValueKind {
    /// Classifies a JSON value, if it is a primitive.
    ///
    /// Arrays, objects, and null have no primitive kind and yield `None`.
    pub fn of(value: &Value) -> Option<ValueKind> {
        match value {
            Value::Bool(_) => Some(ValueKind::Boolean),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(ValueKind::Integer),
            Value::Number(_) => Some(ValueKind::Float),
            Value::String(_) => Some(ValueKind::Text),
            _ => None,
        }
    }

    /// Returns true when `value` already conforms to this kind.
    ///
    /// `Float` accepts integral numbers: every integer is a valid number.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueKind::Boolean => value.is_boolean(),
            ValueKind::Integer => value.is_i64() || value.is_u64(),
            ValueKind::Float => value.is_number(),
            ValueKind::Text => value.is_string(),
        }
    }

    /// Best-effort coercion of `value` into this kind.
    ///
    /// Values that cannot be coerced are returned unchanged so the type
    /// validator can report them. Coercion is idempotent: coercing an
    /// already-conforming value returns it as-is.
    pub fn coerce(&self, value: Value) -> Value {
        if self.matches(&value) {
            return value;
        }
        match (self, &value) {
            (ValueKind::Integer, Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => value,
            },
            (ValueKind::Integer, Value::Number(n)) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 => Value::from(f as i64),
                _ => value,
            },
            (ValueKind::Float, Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(f) => serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(value),
                Err(_) => value,
            },
            (ValueKind::Text, Value::Number(n)) => Value::String(n.to_string()),
            (ValueKind::Text, Value::Bool(b)) => Value::String(b.to_string()),
            (ValueKind::Boolean, Value::String(s)) => match s.trim() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => value,
            },
            _ => value,
        }
    }

    /// Returns a human-readable name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Float => "number",
            ValueKind::Text => "text",
        }
    }
}

/// Fetches the value at a dot-notation path inside a nested value.
///
/// Path segments descend into objects by key; numeric segments index into
/// arrays. The empty path addresses the root itself.
pub fn value_at<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Joins a base dot-path and a child segment.
pub(crate) fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}.{name}")
    }
}

/// Parses a textual value into JSON if possible, otherwise returns it
/// unchanged.
///
/// Used by the composite sanitizers: clients frequently submit sequences and
/// objects as text blobs. A string that is not valid JSON is left alone so
/// the type validator can flag it.
pub(crate) fn parse_if_text(value: Value) -> Value {
    match value {
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(parsed) => parsed,
            Err(_) => Value::String(text),
        },
        other => other,
    }
}

/// Equality as the engine defines it: strict, except that numbers compare
/// numerically regardless of their integral/floating representation.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Canonical string form of a value, used to detect duplicate sequence
/// elements. `serde_json` keeps object keys sorted, so the form is stable.
pub(crate) fn canonical(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_at_descends_objects_and_arrays() {
        let root = json!({"a": {"b": [10, {"c": true}]}});
        assert_eq!(value_at(&root, "a.b.0"), Some(&json!(10)));
        assert_eq!(value_at(&root, "a.b.1.c"), Some(&json!(true)));
        assert_eq!(value_at(&root, "a.missing"), None);
        assert_eq!(value_at(&root, ""), Some(&root));
    }

    #[test]
    fn test_coerce_integer_from_text() {
        assert_eq!(ValueKind::Integer.coerce(json!("42")), json!(42));
        assert_eq!(ValueKind::Integer.coerce(json!("nope")), json!("nope"));
        assert_eq!(ValueKind::Integer.coerce(json!(7.0)), json!(7));
    }

    #[test]
    fn test_coerce_is_idempotent() {
        for kind in [
            ValueKind::Boolean,
            ValueKind::Integer,
            ValueKind::Float,
            ValueKind::Text,
        ] {
            for value in [json!("12"), json!(3.5), json!(true), json!("false")] {
                let once = kind.coerce(value.clone());
                let twice = kind.coerce(once.clone());
                assert_eq!(once, twice, "{kind:?} coercion not idempotent for {value}");
            }
        }
    }

    #[test]
    fn test_float_matches_integers() {
        assert!(ValueKind::Float.matches(&json!(3)));
        assert!(ValueKind::Float.matches(&json!(3.5)));
        assert!(!ValueKind::Integer.matches(&json!(3.5)));
    }

    #[test]
    fn test_parse_if_text() {
        assert_eq!(parse_if_text(json!("[1,2]")), json!([1, 2]));
        assert_eq!(parse_if_text(json!("not json")), json!("not json"));
        assert_eq!(parse_if_text(json!([1])), json!([1]));
    }

    #[test]
    fn test_values_equal_numeric() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(!values_equal(&json!(1), &json!("1")));
        assert!(values_equal(&json!("a"), &json!("a")));
    }
}
