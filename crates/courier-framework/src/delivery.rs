//! Delivery of flushed events to handler sets.
//!
//! The [`DeliveryEngine`] is driven once per unit of work: the host seals the
//! queue and the engine walks the drained events in dispatch order, handing
//! each one to every attached [`EventHandler`] in attachment order. Handler
//! sets call [`invoke`] for each matched handler, which:
//!
//! 1. builds a fresh [`HandlerContext`] (so dependency caches never leak
//!    between invocations),
//! 2. opens the invocation span,
//! 3. resolves parameters and runs the handler, awaiting it if asynchronous,
//! 4. contains any failure (error, panic, timeout) to that invocation.
//!
//! Nothing here is concurrent: one event at a time, one handler at a time.

use std::any::Any;
use std::fmt;
use std::ops::AddAssign;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{Instrument, Span, debug, error, trace};

use crate::context::{HandlerContext, Resources};
use crate::error::{HandlerError, HandlerResult};
use crate::event_handler::{BoxedEventHandler, EventHandler};
use crate::handler::HandlerDescriptor;
use crate::span::{handler_span, record_outcome};
use courier_core::{Event, EventQueue};

// ============================================================================
// DeliveryContext
// ============================================================================

/// Settings and resources shared by every invocation of one engine.
#[derive(Debug, Clone, Default)]
pub struct DeliveryContext {
    resources: Resources,
    handler_timeout: Option<Duration>,
}

impl DeliveryContext {
    /// Creates a context with no resources and no timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resources available to [`Shared`](crate::Shared) parameters.
    pub fn with_resources(mut self, resources: Resources) -> Self {
        self.resources = resources;
        self
    }

    /// Limits how long one invocation may run.
    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Returns the shared resources.
    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Returns the per-invocation timeout, if any.
    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout
    }
}

// ============================================================================
// DeliveryReport
// ============================================================================

/// Invocation counts of one delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Invocations that completed successfully.
    pub delivered: usize,
    /// Invocations that failed.
    pub failed: usize,
}

impl DeliveryReport {
    /// Counts one invocation result.
    pub fn record(&mut self, result: &HandlerResult) {
        match result {
            Ok(()) => self.delivered += 1,
            Err(_) => self.failed += 1,
        }
    }

    /// Returns the number of invocations.
    pub fn total(&self) -> usize {
        self.delivered + self.failed
    }

    /// Returns `true` if no invocation failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl AddAssign for DeliveryReport {
    fn add_assign(&mut self, rhs: Self) {
        self.delivered += rhs.delivered;
        self.failed += rhs.failed;
    }
}

impl fmt::Display for DeliveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} delivered, {} failed", self.delivered, self.failed)
    }
}

// ============================================================================
// DeliveryEngine
// ============================================================================

/// Delivers the events of a unit of work to the attached handler sets.
///
/// Cheap to clone; clones share the handler sets.
#[derive(Clone)]
pub struct DeliveryEngine {
    handlers: Arc<[BoxedEventHandler]>,
    cx: DeliveryContext,
}

impl DeliveryEngine {
    /// Creates an engine over `handlers`, visited in the given order.
    pub fn new(handlers: impl IntoIterator<Item = BoxedEventHandler>) -> Self {
        Self {
            handlers: handlers.into_iter().collect(),
            cx: DeliveryContext::default(),
        }
    }

    /// Replaces the delivery context.
    pub fn with_context(mut self, cx: DeliveryContext) -> Self {
        self.cx = cx;
        self
    }

    /// Returns the attached handler sets.
    pub fn handlers(&self) -> &[BoxedEventHandler] {
        &self.handlers
    }

    /// Returns the delivery context.
    pub fn context(&self) -> &DeliveryContext {
        &self.cx
    }

    /// Seals `queue` and delivers everything it held.
    ///
    /// Events dispatched to the queue after this call starts are rejected
    /// by the queue, never delivered.
    pub async fn flush(&self, queue: &EventQueue) -> DeliveryReport {
        let events = queue.seal();
        self.deliver(events).await
    }

    /// Delivers `events` in order.
    pub async fn deliver(&self, events: impl IntoIterator<Item = Event>) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let mut count = 0usize;

        for event in events {
            count += 1;
            trace!(event = %event.name(), "Delivering event");
            for handler in self.handlers.iter() {
                report += handler.handle(&event, &self.cx).await;
            }
        }

        if count > 0 {
            debug!(
                events = count,
                delivered = report.delivered,
                failed = report.failed,
                "Flush complete"
            );
        }
        report
    }
}

impl fmt::Debug for DeliveryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.handlers.iter().map(|h| h.name()).collect();
        f.debug_struct("DeliveryEngine")
            .field("handlers", &names)
            .field("cx", &self.cx)
            .finish()
    }
}

// ============================================================================
// Invocation
// ============================================================================

/// Runs one handler for one event inside its own span.
///
/// Failures are logged, recorded on the span and returned; they never
/// propagate as panics.
pub async fn invoke(
    owner: &dyn EventHandler,
    handler: &HandlerDescriptor,
    event: &Event,
    cx: &DeliveryContext,
) -> HandlerResult {
    let span = handler_span(owner, event.name(), handler.identity(), handler.kind());
    let ctx = Arc::new(HandlerContext::new(event.clone(), cx.resources.clone()));

    async move {
        let result = run(handler, ctx, cx.handler_timeout).await;
        record_outcome(&Span::current(), &result);
        match &result {
            Ok(()) => trace!(handler = handler.identity(), "Handler completed"),
            Err(e) => error!(
                event = %event.name(),
                handler = handler.identity(),
                error = %e,
                "Handler failed"
            ),
        }
        result
    }
    .instrument(span)
    .await
}

async fn run(
    handler: &HandlerDescriptor,
    ctx: Arc<HandlerContext>,
    timeout: Option<Duration>,
) -> HandlerResult {
    let call = AssertUnwindSafe(handler.invoke(ctx))
        .catch_unwind()
        .map(|outcome| {
            outcome.unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(&*panic))))
        });

    match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(HandlerError::TimedOut(limit))),
        None => call.await,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalHandler;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine(handlers: &[&LocalHandler]) -> DeliveryEngine {
        DeliveryEngine::new(
            handlers
                .iter()
                .map(|h| Arc::new((*h).clone()) as BoxedEventHandler),
        )
    }

    #[tokio::test]
    async fn test_flush_in_dispatch_order() {
        let local = LocalHandler::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        local.on_all(move |event: Event| s.lock().push(event.name().to_string()));

        let queue = EventQueue::new();
        queue.push("first", Default::default()).unwrap();
        queue.push("second", Default::default()).unwrap();

        let report = engine(&[&local]).flush(&queue).await;

        assert_eq!(*seen.lock(), ["first", "second"]);
        assert_eq!(report, DeliveryReport { delivered: 2, failed: 0 });
        assert!(queue.is_sealed());
    }

    #[tokio::test]
    async fn test_handler_sets_in_attachment_order() {
        let a = LocalHandler::new();
        let b = LocalHandler::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        b.on_all(move || s.lock().push("b"));
        let s = seen.clone();
        a.on_all(move || s.lock().push("a"));

        engine(&[&a, &b]).deliver([Event::named("e")]).await;

        assert_eq!(*seen.lock(), ["a", "b"]);
    }

    #[tokio::test]
    async fn test_flush_ignores_late_dispatches() {
        let local = LocalHandler::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        local.on_all(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let queue = EventQueue::new();
        queue.push("early", Default::default()).unwrap();
        let engine = engine(&[&local]);
        engine.flush(&queue).await;

        assert!(queue.push("late", Default::default()).is_err());
        assert_eq!(engine.flush(&queue).await.total(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout() {
        let local = LocalHandler::new();
        local.on_all(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        local.on_all(|| {});

        let engine = engine(&[&local]).with_context(
            DeliveryContext::new().with_handler_timeout(Some(Duration::from_millis(10))),
        );
        let report = engine.deliver([Event::named("slow")]).await;

        assert_eq!(report, DeliveryReport { delivered: 1, failed: 1 });
    }

    #[tokio::test]
    async fn test_resources_reach_handlers() {
        let local = LocalHandler::new();
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        local.on_all(move |crate::Shared(greeting): crate::Shared<String>| {
            *s.lock() = Some(greeting.to_string());
        });

        let cx = DeliveryContext::new().with_resources(Resources::new().with("hi".to_string()));
        engine(&[&local])
            .with_context(cx)
            .deliver([Event::named("e")])
            .await;

        assert_eq!(seen.lock().as_deref(), Some("hi"));
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*boxed), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*boxed), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*boxed), "unknown panic payload");
    }
}
