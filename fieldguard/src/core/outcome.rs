//! Validation outcome types and the per-pass error map.

use std::collections::BTreeMap;

/// Path-keyed error map for one validation pass.
///
/// Keys are dot-paths into the submitted record; values are user-facing
/// messages. The map is created fresh per top-level call and mutated in
/// place as the pass descends; an empty map means the subtree validated
/// cleanly.
pub type ErrorMap = BTreeMap<String, String>;

/// How a field's validation pipeline failed.
///
/// Composite fields record their children's specific messages at the
/// children's paths and then fail with [`Recorded`](FieldFailure::Recorded),
/// so an enclosing field never overwrites a child's message with its own
/// generic one. The distinction is carried in the type rather than a
/// sentinel message string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFailure {
    /// This field's own failure, carrying the message to record at its path
    Invalid(String),
    /// Failures were already recorded at descendant paths; nothing should be
    /// written at this field's own path
    Recorded,
}

impl FieldFailure {
    /// Creates a failure with this field's own message.
    pub fn invalid(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.is_empty() {
            Self::generic()
        } else {
            FieldFailure::Invalid(message)
        }
    }

    /// Creates a failure with the generic fallback message.
    pub fn generic() -> Self {
        FieldFailure::Invalid("Invalid input".to_string())
    }

    /// Returns true when descendant paths already carry the detail.
    pub fn is_recorded(&self) -> bool {
        matches!(self, FieldFailure::Recorded)
    }
}

/// The result of one field's validation pipeline.
pub type FieldResult = std::result::Result<(), FieldFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_message_falls_back_to_generic() {
        assert_eq!(
            FieldFailure::invalid(""),
            FieldFailure::Invalid("Invalid input".to_string())
        );
    }

    #[test]
    fn test_recorded_is_not_invalid() {
        assert!(FieldFailure::Recorded.is_recorded());
        assert!(!FieldFailure::invalid("nope").is_recorded());
    }
}
