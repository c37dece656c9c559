//! Per-invocation tracing spans.
//!
//! Every handler invocation runs inside its own `info`-level span. tracing
//! span names are static, so the human-readable name goes into the
//! `otel.name` field, which OpenTelemetry bridges use as the exported name:
//!
//! ```text
//! handling event TEST_EVENT with LocalHandler
//! ```

use tracing::{Span, field};

use crate::error::HandlerResult;
use crate::event_handler::EventHandler;
use crate::handler::HandlerKind;
use courier_core::EventName;

/// Field names recorded on invocation spans.
#[derive(Debug, Clone, Copy)]
pub struct SpanAttributes;

impl SpanAttributes {
    /// The exported span name.
    pub const NAME: &'static str = "otel.name";
    /// Fully qualified type of the handler set owning the handler.
    pub const HANDLER: &'static str = "courier.handler";
    /// Identity of the invoked function.
    pub const FUNCTION: &'static str = "courier.handler.function";
    /// `sync` or `async`.
    pub const KIND: &'static str = "courier.handler.kind";
    /// The event name.
    pub const EVENT: &'static str = "courier.event";
    /// `OK` or `ERROR`, recorded when the invocation returns.
    pub const STATUS: &'static str = "otel.status_code";
    /// The failure message, if any.
    pub const ERROR: &'static str = "error";
}

/// The static tracing name of invocation spans.
pub const SPAN_NAME: &str = "handling event";

/// Builds the exported name of an invocation span.
pub fn span_name(event: &str, owner: &str) -> String {
    format!("handling event {event} with {owner}")
}

/// Opens the span for one invocation of `function` by `owner`.
pub fn handler_span(
    owner: &dyn EventHandler,
    event: &EventName,
    function: &str,
    kind: HandlerKind,
) -> Span {
    tracing::info_span!(
        "handling event",
        otel.name = %span_name(event.as_str(), owner.name()),
        courier.handler = owner.qualified_name(),
        courier.handler.function = function,
        courier.handler.kind = kind.as_str(),
        courier.event = event.as_str(),
        otel.status_code = field::Empty,
        error = field::Empty,
    )
}

/// Records the invocation outcome on `span`.
pub fn record_outcome(span: &Span, result: &HandlerResult) {
    match result {
        Ok(()) => {
            span.record(SpanAttributes::STATUS, "OK");
        }
        Err(e) => {
            span.record(SpanAttributes::STATUS, "ERROR");
            span.record(SpanAttributes::ERROR, field::display(e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_name() {
        assert_eq!(
            span_name("TEST_EVENT", "LocalHandler"),
            "handling event TEST_EVENT with LocalHandler"
        );
    }
}
