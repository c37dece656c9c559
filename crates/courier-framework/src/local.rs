//! In-process handler set with wildcard registration.
//!
//! ```rust,ignore
//! let handler = LocalHandler::new();
//!
//! async fn on_cat(event: Event) { /* ... */ }
//! fn audit(event: Event) { /* ... */ }
//!
//! handler.register("cat_*", on_cat);
//! handler.register_all(audit);
//!
//! // Registration returns the function, so it can be registered again.
//! handler.register("user_created", handler.register("user_updated", on_user));
//!
//! // Closures are usually registered with `on`, which returns the set instead.
//! handler
//!     .on("dog_*", |event: Event| tracing::info!(event = %event.name(), "woof"))
//!     .on_all(|| {});
//! ```

use std::any::type_name;

use async_trait::async_trait;
use tracing::trace;

use crate::delivery::{self, DeliveryContext, DeliveryReport};
use crate::event_handler::EventHandler;
use crate::handler::{Handler, HandlerDescriptor};
use crate::registry::Registry;
use courier_core::{Event, Pattern};

/// Handlers registered by pattern and invoked in the current process.
///
/// Clones share the same registry, so a clone attached to a runtime sees
/// registrations made later through the original.
#[derive(Debug, Clone, Default)]
pub struct LocalHandler {
    registry: Registry,
}

impl LocalHandler {
    /// Creates an empty handler set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `f` under `pattern` and returns `f` unchanged.
    ///
    /// The pattern may be a string (`"cat_*"`, `"*"`) or a [`NamedEvent`]
    /// value. Registering the same function again adds an independent entry.
    ///
    /// [`NamedEvent`]: courier_core::NamedEvent
    pub fn register<F, T>(&self, pattern: impl Into<Pattern>, f: F) -> F
    where
        F: Handler<T>,
        T: 'static,
    {
        self.registry
            .insert(pattern.into(), HandlerDescriptor::new(f.clone()));
        f
    }

    /// Registers `f` for every event.
    pub fn register_all<F, T>(&self, f: F) -> F
    where
        F: Handler<T>,
        T: 'static,
    {
        self.register(Pattern::Any, f)
    }

    /// Registers `f` under `pattern` and returns the handler set.
    pub fn on<F, T>(&self, pattern: impl Into<Pattern>, f: F) -> &Self
    where
        F: Handler<T>,
        T: 'static,
    {
        self.registry
            .insert(pattern.into(), HandlerDescriptor::new(f));
        self
    }

    /// Registers `f` for every event and returns the handler set.
    pub fn on_all<F, T>(&self, f: F) -> &Self
    where
        F: Handler<T>,
        T: 'static,
    {
        self.on(Pattern::Any, f)
    }

    /// Returns the underlying registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[async_trait]
impl EventHandler for LocalHandler {
    fn name(&self) -> &str {
        "LocalHandler"
    }

    fn qualified_name(&self) -> &str {
        type_name::<Self>()
    }

    async fn handle(&self, event: &Event, cx: &DeliveryContext) -> DeliveryReport {
        let matched = self.registry.resolve(event.name().as_str());
        trace!(event = %event.name(), matched = matched.len(), "Resolved handlers");

        let mut report = DeliveryReport::default();
        for registration in matched {
            let result = delivery::invoke(self, registration.handler(), event, cx).await;
            report.record(&result);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerKind;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum UserEvent {
        Created,
    }

    impl courier_core::NamedEvent for UserEvent {
        fn event_name(&self) -> &'static str {
            "USER_CREATED"
        }
    }

    async fn on_user(_: Event) {}

    #[test]
    fn test_register_returns_function() {
        let handler = LocalHandler::new();
        let f = handler.register("user_created", handler.register("user_updated", on_user));
        handler.register_all(f);

        let patterns: Vec<String> = handler
            .registry()
            .entries()
            .iter()
            .map(|e| e.pattern().to_string())
            .collect();
        assert_eq!(patterns, ["user_updated", "user_created", "*"]);
    }

    #[test]
    fn test_register_named_event() {
        let handler = LocalHandler::new();
        handler.register(UserEvent::Created, on_user);
        assert_eq!(handler.registry().resolve("USER_CREATED").len(), 1);
        assert_eq!(
            handler.registry().entries()[0].handler().kind(),
            HandlerKind::Async
        );
    }

    #[test]
    fn test_on_returns_handler_set() {
        let handler = LocalHandler::new();
        let pattern = String::from("user_*");
        handler
            .on(&pattern, |_: Event| {})
            .on_all(|| async {})
            .on(UserEvent::Created, on_user);

        let entries = handler.registry().entries();
        let patterns: Vec<String> = entries.iter().map(|e| e.pattern().to_string()).collect();
        assert_eq!(patterns, ["user_*", "*", "USER_CREATED"]);
        assert_eq!(entries[0].handler().kind(), HandlerKind::Sync);
        assert_eq!(entries[1].handler().kind(), HandlerKind::Async);
    }

    #[test]
    fn test_owner_names() {
        let handler = LocalHandler::new();
        assert_eq!(handler.name(), "LocalHandler");
        assert_eq!(
            handler.qualified_name(),
            "courier_framework::local::LocalHandler"
        );
    }

    #[tokio::test]
    async fn test_handle_in_registration_order() {
        let handler = LocalHandler::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let (cat, all, fish) = (seen.clone(), seen.clone(), seen.clone());
        handler
            .on("cat_*", move |_: Event| {
                let s = cat.clone();
                async move { s.lock().push("cat") }
            })
            .on_all(move |_: Event| all.lock().push("all"))
            .on("*fish", move |_: Event| fish.lock().push("fish"));

        let report = handler
            .handle(&Event::named("cat_ate_a_fish"), &DeliveryContext::default())
            .await;

        assert_eq!(*seen.lock(), ["cat", "all", "fish"]);
        assert_eq!(report.delivered, 3);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_handlers() {
        let handler = LocalHandler::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        handler
            .on_all(|| -> Result<(), String> { Err("boom".into()) })
            .on_all(|| -> Result<(), String> { panic!("handler panicked") })
            .on_all(move |event: Event| s.lock().push(event.name().to_string()));

        let report = handler
            .handle(&Event::named("x"), &DeliveryContext::default())
            .await;

        assert_eq!(*seen.lock(), ["x"]);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 2);
    }
}
