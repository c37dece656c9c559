//! Per-unit-of-work event queue and the ambient dispatch surface.
//!
//! An [`EventQueue`] buffers events for exactly one unit of work (typically
//! one request). The host creates it, runs the unit of work inside
//! [`EventQueue::scope`], then calls [`EventQueue::seal`] and hands the
//! drained events to the delivery engine.
//!
//! Code running inside the scope can dispatch without holding the queue:
//!
//! ```rust,ignore
//! async fn create_user(name: &str) -> anyhow::Result<()> {
//!     // ... persist the user ...
//!     courier_core::dispatch("user_created")?;
//!     Ok(())
//! }
//! ```
//!
//! Calling [`dispatch`] with no active scope is a programming error and
//! fails with [`DispatchError::OutsideUnitOfWork`].
//!
//! The scope is task-local, so a task started with `tokio::spawn` does not
//! inherit it. Carry the queue over explicitly:
//!
//! ```rust,ignore
//! let queue = courier_core::current_queue().ok_or(MissingUnitOfWork)?;
//! tokio::spawn(async move {
//!     queue.scope(async { courier_core::dispatch("report_ready") }).await
//! });
//! ```
//!
//! Events dispatched this way belong to the original unit of work and are
//! only delivered if they arrive before it is flushed.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{DispatchError, DispatchResult};
use crate::event::{Event, EventName, Payload};

tokio::task_local! {
    static CURRENT_QUEUE: EventQueue;
}

#[derive(Default)]
struct QueueState {
    events: Vec<Event>,
    sealed: bool,
}

#[derive(Default)]
struct QueueInner {
    state: Mutex<QueueState>,
    capacity: Option<usize>,
}

/// An ordered buffer of events owned by one unit of work.
///
/// Cloning yields another handle to the same queue. Handles must not be
/// shared across units of work.
#[derive(Clone, Default)]
pub struct EventQueue {
    inner: Arc<QueueInner>,
}

impl EventQueue {
    /// Creates an empty, unbounded queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty queue that rejects events beyond `capacity`.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                capacity: Some(capacity),
            }),
        }
    }

    /// Appends an event. Never invokes handlers.
    pub fn push(&self, name: impl Into<EventName>, payload: Payload) -> DispatchResult {
        let name = name.into();
        let mut state = self.inner.state.lock();

        if state.sealed {
            return Err(DispatchError::QueueSealed {
                event: name.to_string(),
            });
        }
        if let Some(capacity) = self.inner.capacity
            && state.events.len() >= capacity
        {
            return Err(DispatchError::QueueFull {
                event: name.to_string(),
                capacity,
            });
        }

        trace!(event = %name, position = state.events.len(), "Event queued");
        state.events.push(Event::new(name, payload));
        Ok(())
    }

    /// Returns the number of buffered events.
    pub fn len(&self) -> usize {
        self.inner.state.lock().events.len()
    }

    /// Returns `true` if no events are buffered.
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().events.is_empty()
    }

    /// Returns `true` once [`seal`](Self::seal) has been called.
    pub fn is_sealed(&self) -> bool {
        self.inner.state.lock().sealed
    }

    /// Closes the queue and drains its events in dispatch order.
    ///
    /// Any later [`push`](Self::push) fails with [`DispatchError::QueueSealed`],
    /// so a flush never picks up events queued after it began. Sealing twice
    /// returns an empty batch the second time.
    pub fn seal(&self) -> Vec<Event> {
        let mut state = self.inner.state.lock();
        state.sealed = true;
        let events = std::mem::take(&mut state.events);
        debug!(count = events.len(), "Event queue sealed");
        events
    }

    /// Runs `fut` with this queue as the current queue of the task.
    pub async fn scope<F: Future>(&self, fut: F) -> F::Output {
        CURRENT_QUEUE.scope(self.clone(), fut).await
    }

    /// Runs `f` with this queue as the current queue, synchronously.
    pub fn sync_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        CURRENT_QUEUE.sync_scope(self.clone(), f)
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("EventQueue")
            .field("len", &state.events.len())
            .field("sealed", &state.sealed)
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}

/// Returns the queue of the unit of work running on this task, if any.
pub fn current_queue() -> Option<EventQueue> {
    CURRENT_QUEUE.try_with(EventQueue::clone).ok()
}

/// Dispatches an event with an empty payload to the current unit of work.
pub fn dispatch(name: impl Into<EventName>) -> DispatchResult {
    dispatch_with(name, Payload::new())
}

/// Dispatches an event with `payload` to the current unit of work.
pub fn dispatch_with(name: impl Into<EventName>, payload: Payload) -> DispatchResult {
    let name = name.into();
    match current_queue() {
        Some(queue) => queue.push(name, payload),
        None => Err(DispatchError::OutsideUnitOfWork {
            event: name.to_string(),
        }),
    }
}

/// Dispatches an event whose payload is any value serializing to a JSON object.
pub fn dispatch_serialized<T: Serialize + ?Sized>(
    name: impl Into<EventName>,
    payload: &T,
) -> DispatchResult {
    let name = name.into();
    match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => dispatch_with(name, map),
        Ok(other) => Err(DispatchError::InvalidPayload {
            event: name.to_string(),
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
        Err(e) => Err(DispatchError::InvalidPayload {
            event: name.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dispatch_outside_unit_of_work_fails() {
        let err = dispatch("orphan").unwrap_err();
        assert!(matches!(err, DispatchError::OutsideUnitOfWork { ref event } if event == "orphan"));
    }

    #[test]
    fn test_dispatch_inside_scope_preserves_order() {
        let queue = EventQueue::new();
        tokio_test::block_on(queue.scope(async {
            dispatch("first").unwrap();
            dispatch("second").unwrap();
            dispatch("third").unwrap();
        }));

        let names: Vec<String> = queue
            .seal()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn test_scope_does_not_leak() {
        let queue = EventQueue::new();
        queue.sync_scope(|| assert!(current_queue().is_some()));
        assert!(current_queue().is_none());
    }

    #[test]
    fn test_push_after_seal_is_rejected() {
        let queue = EventQueue::new();
        queue.push("before", Payload::new()).unwrap();
        assert_eq!(queue.seal().len(), 1);

        let err = queue.push("after", Payload::new()).unwrap_err();
        assert!(matches!(err, DispatchError::QueueSealed { .. }));
        assert!(queue.is_sealed());
        assert!(queue.seal().is_empty());
    }

    #[test]
    fn test_bounded_queue() {
        let queue = EventQueue::bounded(1);
        queue.push("one", Payload::new()).unwrap();
        let err = queue.push("two", Payload::new()).unwrap_err();
        assert!(matches!(err, DispatchError::QueueFull { capacity: 1, .. }));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_dispatch_with_payload() {
        let queue = EventQueue::new();
        let Value::Object(payload) = json!({ "user_id": 42 }) else {
            unreachable!()
        };
        queue.sync_scope(|| dispatch_with("user_created", payload)).unwrap();

        let events = queue.seal();
        assert_eq!(events[0].payload()["user_id"], json!(42));
    }

    #[test]
    fn test_dispatch_serialized_requires_object() {
        #[derive(Serialize)]
        struct Signup<'a> {
            email: &'a str,
        }

        let queue = EventQueue::new();
        queue.sync_scope(|| {
            dispatch_serialized("signup", &Signup { email: "a@b.c" }).unwrap();
            let err = dispatch_serialized("signup", &[1, 2, 3]).unwrap_err();
            assert!(matches!(err, DispatchError::InvalidPayload { .. }));
        });

        let events = queue.seal();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload()["email"], json!("a@b.c"));
    }

    #[tokio::test]
    async fn test_concurrent_units_of_work_are_isolated() {
        let a = EventQueue::new();
        let b = EventQueue::new();

        let (qa, qb) = (a.clone(), b.clone());
        let ta = tokio::spawn(async move { qa.scope(async { dispatch("from_a") }).await });
        let tb = tokio::spawn(async move { qb.scope(async { dispatch("from_b") }).await });
        ta.await.unwrap().unwrap();
        tb.await.unwrap().unwrap();

        assert_eq!(a.seal()[0].name(), "from_a");
        assert_eq!(b.seal()[0].name(), "from_b");
    }

    #[tokio::test]
    async fn test_spawned_task_needs_the_queue_carried_over() {
        let queue = EventQueue::new();

        queue
            .scope(async {
                let detached = tokio::spawn(async { dispatch("detached") }).await.unwrap();
                assert!(matches!(
                    detached,
                    Err(DispatchError::OutsideUnitOfWork { .. })
                ));

                let Some(carried) = current_queue() else {
                    panic!("no queue in scope");
                };
                tokio::spawn(async move { carried.scope(async { dispatch("carried") }).await })
                    .await
                    .unwrap()
                    .unwrap();
            })
            .await;

        let names: Vec<String> = queue.seal().iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, ["carried"]);
    }
}
