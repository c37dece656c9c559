//! Pattern-to-handler registry.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::handler::HandlerDescriptor;
use courier_core::Pattern;

/// One registry entry: a handler subscribed under a pattern.
#[derive(Debug, Clone)]
pub struct Registration {
    pattern: Pattern,
    handler: HandlerDescriptor,
}

impl Registration {
    /// Creates an entry.
    pub fn new(pattern: Pattern, handler: HandlerDescriptor) -> Self {
        Self { pattern, handler }
    }

    /// Returns the subscription pattern.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Returns the handler.
    pub fn handler(&self) -> &HandlerDescriptor {
        &self.handler
    }
}

/// An ordered list of registrations, shared between clones.
///
/// Registration takes `&self` so that a handler set can be populated from
/// wherever it is reachable during startup. Lookups take a snapshot, so
/// registering while a flush is running never affects that flush.
#[derive(Clone, Default)]
pub struct Registry {
    entries: Arc<RwLock<Vec<Arc<Registration>>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a registration.
    pub fn insert(&self, pattern: Pattern, handler: HandlerDescriptor) {
        trace!(
            pattern = %pattern,
            handler = handler.identity(),
            kind = %handler.kind(),
            "Registering handler"
        );
        self.entries
            .write()
            .push(Arc::new(Registration::new(pattern, handler)));
    }

    /// Returns every registration whose pattern matches `name`, in insertion
    /// order. A handler registered under several matching patterns appears
    /// once per registration.
    pub fn resolve(&self, name: &str) -> Vec<Arc<Registration>> {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.pattern.is_match(name))
            .cloned()
            .collect()
    }

    /// Returns all registrations in insertion order.
    pub fn entries(&self) -> Vec<Arc<Registration>> {
        self.entries.read().clone()
    }

    /// Returns the number of registrations.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.read().iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::Event;

    fn first(_: Event) {}
    fn second(_: Event) {}

    fn identities(entries: &[Arc<Registration>]) -> Vec<&'static str> {
        entries.iter().map(|e| e.handler().short_name()).collect()
    }

    #[test]
    fn test_resolve_in_insertion_order() {
        let registry = Registry::new();
        registry.insert(Pattern::parse("*"), HandlerDescriptor::new(second));
        registry.insert(Pattern::parse("cat_*"), HandlerDescriptor::new(first));
        registry.insert(Pattern::parse("dog_*"), HandlerDescriptor::new(first));

        assert_eq!(identities(&registry.resolve("cat_sat")), ["second", "first"]);
        assert_eq!(identities(&registry.resolve("bird_flew")), ["second"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_same_handler_under_two_matching_patterns() {
        let registry = Registry::new();
        registry.insert(Pattern::parse("user_*"), HandlerDescriptor::new(first));
        registry.insert(Pattern::parse("*_created"), HandlerDescriptor::new(first));

        assert_eq!(registry.resolve("user_created").len(), 2);
        assert_eq!(registry.resolve("user_updated").len(), 1);
    }

    #[test]
    fn test_clones_share_entries() {
        let registry = Registry::new();
        let view = registry.clone();
        registry.insert(Pattern::parse("a"), HandlerDescriptor::new(first));

        assert_eq!(view.len(), 1);
        assert!(!view.is_empty());
    }
}
