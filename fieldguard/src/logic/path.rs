//! Reference-path resolution for conditional-logic rules.
//!
//! Rule keys reference other fields with dot-notation paths that may be
//! root-absolute (`/foo`), explicitly relative (`./sibling`, `../uncle`), or
//! bare (`sibling`). Relative and bare references are resolved against the
//! field currently being evaluated: a bare or `./` reference names a sibling,
//! and each `../` climbs one level further up.

/// Resolves a reference path against the dot-path of the field it appears on.
///
/// The resolution base is the *container* of the current field: for a field
/// at `bar.baz`, siblings live under `bar`, so `./qux` and `qux` both resolve
/// to `bar.qux`, while `../foo` and `/foo` both resolve to `foo`. Climbing
/// past the root clamps at the root.
pub fn resolve_reference(current: &str, reference: &str) -> String {
    if let Some(absolute) = reference.strip_prefix('/') {
        return absolute.to_string();
    }

    // Container of the current field: everything up to its last segment.
    let mut base: Vec<&str> = if current.is_empty() {
        Vec::new()
    } else {
        current.split('.').collect()
    };
    base.pop();

    let mut remainder = reference;
    if let Some(rest) = remainder.strip_prefix("./") {
        remainder = rest;
    }
    while let Some(rest) = remainder.strip_prefix("../") {
        base.pop();
        remainder = rest;
    }

    if !remainder.is_empty() {
        base.push(remainder);
    }
    base.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_reference_names_sibling() {
        assert_eq!(resolve_reference("bar.baz", "qux"), "bar.qux");
        assert_eq!(resolve_reference("top", "other"), "other");
    }

    #[test]
    fn test_explicit_sibling_reference() {
        assert_eq!(resolve_reference("bar.baz", "./qux"), "bar.qux");
    }

    #[test]
    fn test_parent_reference() {
        assert_eq!(resolve_reference("bar.baz", "../foo"), "foo");
        assert_eq!(resolve_reference("a.b.c", "../x.y"), "a.x.y");
    }

    #[test]
    fn test_repeated_parent_references() {
        assert_eq!(resolve_reference("a.b.c.d", "../../x"), "a.x");
    }

    #[test]
    fn test_absolute_reference() {
        assert_eq!(resolve_reference("bar.baz", "/foo"), "foo");
        assert_eq!(resolve_reference("bar.baz", "/foo.qux"), "foo.qux");
    }

    #[test]
    fn test_climbing_past_root_clamps() {
        assert_eq!(resolve_reference("top", "../../../foo"), "foo");
    }

    #[test]
    fn test_relative_and_absolute_agree_one_level_down() {
        assert_eq!(
            resolve_reference("bar.baz", "../foo"),
            resolve_reference("bar.baz", "/foo")
        );
    }

    #[test]
    fn test_nested_reference_below_sibling() {
        assert_eq!(resolve_reference("bar.baz", "qux.inner"), "bar.qux.inner");
    }
}
