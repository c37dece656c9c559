//! The handler-set abstraction the delivery engine drives.

use std::sync::Arc;

use async_trait::async_trait;

use crate::delivery::{DeliveryContext, DeliveryReport};
use courier_core::Event;

/// A set of handlers attached to a runtime.
///
/// The delivery engine hands every flushed event to every attached set, in
/// attachment order. A set decides which of its handlers run and must invoke
/// them sequentially; each invocation is isolated, so `handle` itself never
/// fails.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Short name used in span names, e.g. `LocalHandler`.
    fn name(&self) -> &str;

    /// Fully qualified name recorded as the span's handler attribute.
    fn qualified_name(&self) -> &str;

    /// Delivers one event to the matching handlers of this set.
    async fn handle(&self, event: &Event, cx: &DeliveryContext) -> DeliveryReport;
}

/// A shared, type-erased handler set.
pub type BoxedEventHandler = Arc<dyn EventHandler>;
