//! Wildcard subscription patterns.
//!
//! A pattern is a plain string in which `*` matches any run of characters,
//! including an empty one. There is no other wildcard syntax and no escaping.
//! Matching is anchored at both ends and case-sensitive.
//!
//! | Pattern        | Matches                          | Does not match       |
//! |----------------|----------------------------------|----------------------|
//! | `user_created` | `user_created`                   | `user_created_twice` |
//! | `cat_*`        | `cat_ate_a_fish`, `cat_`         | `cat`, `a_cat_`      |
//! | `*juice`       | `dad_made_beet_juice`            | `juice_is_spoiled`   |
//! | `*dance*`      | `she_danced_with_her_partner`    | `she_sang`           |
//! | `*`            | everything                       |                      |

use std::fmt;

use crate::event::{EventName, NamedEvent};

/// The raw string that marks a catch-all subscription.
pub const CATCH_ALL: &str = "*";

/// A parsed subscription pattern.
///
/// Parsing never fails: any string is a valid pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Matches every event name.
    Any,
    /// Matches only the identical event name.
    Exact(String),
    /// A pattern containing at least one `*`.
    Glob {
        /// The pattern as written.
        raw: String,
        /// Literal pieces between wildcards; always at least two.
        segments: Vec<String>,
    },
}

impl Pattern {
    /// Parses a pattern string.
    pub fn parse(raw: &str) -> Self {
        if raw == CATCH_ALL {
            return Self::Any;
        }
        if !raw.contains('*') {
            return Self::Exact(raw.to_string());
        }
        Self::Glob {
            raw: raw.to_string(),
            segments: raw.split('*').map(str::to_string).collect(),
        }
    }

    /// Returns `true` if this pattern matches every event name.
    pub fn is_catch_all(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// Returns the pattern as written.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Any => CATCH_ALL,
            Self::Exact(name) => name,
            Self::Glob { raw, .. } => raw,
        }
    }

    /// Tests whether `event_name` is selected by this pattern.
    pub fn is_match(&self, event_name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(name) => name == event_name,
            Self::Glob { segments, .. } => glob_match(segments, event_name),
        }
    }
}

/// Anchored glob match over pre-split segments.
fn glob_match(segments: &[String], name: &str) -> bool {
    let (Some(prefix), Some(suffix)) = (segments.first(), segments.last()) else {
        return false;
    };

    // Prefix and suffix must not overlap: "ab*ba" does not match "aba".
    if name.len() < prefix.len() + suffix.len()
        || !name.starts_with(prefix.as_str())
        || !name.ends_with(suffix.as_str())
    {
        return false;
    }

    let mut rest = &name[prefix.len()..name.len() - suffix.len()];
    for literal in &segments[1..segments.len() - 1] {
        if literal.is_empty() {
            continue;
        }
        match rest.find(literal.as_str()) {
            Some(at) => rest = &rest[at + literal.len()..],
            None => return false,
        }
    }
    true
}

/// Tests whether `event_name` matches `pattern`.
///
/// Convenience for one-off checks; registries keep parsed [`Pattern`]s.
pub fn matches(pattern: &str, event_name: &str) -> bool {
    Pattern::parse(pattern).is_match(event_name)
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::Any
    }
}

impl From<&str> for Pattern {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for Pattern {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&String> for Pattern {
    fn from(raw: &String) -> Self {
        Self::parse(raw)
    }
}

impl From<&EventName> for Pattern {
    fn from(name: &EventName) -> Self {
        Self::parse(name.as_str())
    }
}

impl From<EventName> for Pattern {
    fn from(name: EventName) -> Self {
        Self::parse(name.as_str())
    }
}

impl<T: NamedEvent> From<T> for Pattern {
    fn from(value: T) -> Self {
        Self::parse(value.event_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern_requires_equality() {
        for name in ["user_created", "user_updated", "", "USER_CREATED"] {
            assert_eq!(matches("user_created", name), name == "user_created");
        }
    }

    #[test]
    fn test_catch_all() {
        let pattern = Pattern::parse("*");
        assert!(pattern.is_catch_all());
        assert!(pattern.is_match("anything"));
        assert!(pattern.is_match(""));
        assert!(Pattern::default().is_catch_all());
    }

    #[test]
    fn test_trailing_wildcard() {
        assert!(matches("dog_*", "dog_asked_for_petting"));
        assert!(matches("dog_*", "dog_finished_the_food"));
        assert!(!matches("dog_*", "cat_ate_a_fish"));
        assert!(!matches("dog_*", "hotdog_eaten"));
    }

    #[test]
    fn test_zero_length_wildcard_matches() {
        assert!(matches("dog_*", "dog_"));
        assert!(!matches("dog_*", "dog"));
        assert!(matches("*dance*", "dance"));
    }

    #[test]
    fn test_leading_wildcard_anchors_suffix() {
        assert!(matches("*juice", "dad_made_beet_juice"));
        assert!(!matches("*juice", "juice_is_spoiled"));
    }

    #[test]
    fn test_interior_literals_in_order() {
        assert!(matches("*dance*", "she_danced_with_her_partner"));
        assert!(matches("a*b*c", "a_x_b_y_c"));
        assert!(!matches("a*c*b", "a_b_c"));
        assert!(matches("a**b", "ab"));
    }

    #[test]
    fn test_prefix_and_suffix_do_not_overlap() {
        assert!(!matches("ab*ba", "aba"));
        assert!(matches("ab*ba", "abba"));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert!(!matches("cat_*", "CAT_ate_a_fish"));
        assert!(!matches("TEST_EVENT", "test_event"));
    }

    #[test]
    fn test_pattern_from_string_reference() {
        let raw = String::from("dog_*");
        let pattern = Pattern::from(&raw);
        assert!(pattern.is_match("dog_barked"));
        assert_eq!(pattern.as_str(), raw);
    }

    #[test]
    fn test_pattern_from_named_event() {
        #[derive(Debug)]
        struct Created;

        impl NamedEvent for Created {
            fn event_name(&self) -> &'static str {
                "CREATED"
            }
        }

        let pattern = Pattern::from(Created);
        assert_eq!(pattern, Pattern::Exact("CREATED".to_string()));
        assert_eq!(pattern.to_string(), "CREATED");
    }
}
