//! In-memory trace collector.
//!
//! [`SpanCollector`] is a `tracing-subscriber` layer that keeps every closed
//! span with its fields, so tests (and diagnostics endpoints) can inspect
//! what the delivery engine emitted:
//!
//! ```rust,ignore
//! let collector = SpanCollector::new();
//! let _guard = tracing::subscriber::set_default(
//!     tracing_subscriber::registry().with(collector.clone()),
//! );
//!
//! runtime.unit_of_work(async { dispatch("TEST_EVENT") }).await?;
//!
//! let span = collector.last().unwrap();
//! assert_eq!(span.name, "handling event TEST_EVENT with LocalHandler");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::Subscriber;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use courier_framework::SpanAttributes;

/// A closed span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedSpan {
    /// The exported name: `otel.name` if recorded, the static name otherwise.
    pub name: String,
    /// The module that opened the span.
    pub target: String,
    /// Every recorded field, formatted.
    pub attributes: BTreeMap<String, String>,
}

impl FinishedSpan {
    /// Returns a recorded field.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

struct Fields(BTreeMap<String, String>);

struct FieldVisitor<'a>(&'a mut BTreeMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

/// Records closed spans in memory. Clones share the same storage.
#[derive(Clone, Default)]
pub struct SpanCollector {
    finished: Arc<Mutex<Vec<FinishedSpan>>>,
}

impl SpanCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the closed spans, oldest first.
    pub fn finished_spans(&self) -> Vec<FinishedSpan> {
        self.finished.lock().clone()
    }

    /// Returns the most recently closed span.
    pub fn last(&self) -> Option<FinishedSpan> {
        self.finished.lock().last().cloned()
    }

    /// Returns the closed handler invocation spans.
    pub fn handler_spans(&self) -> Vec<FinishedSpan> {
        self.finished
            .lock()
            .iter()
            .filter(|span| span.attributes.contains_key(SpanAttributes::HANDLER))
            .cloned()
            .collect()
    }

    /// Forgets every recorded span.
    pub fn clear(&self) {
        self.finished.lock().clear();
    }
}

impl fmt::Debug for SpanCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanCollector")
            .field("finished", &self.finished.lock().len())
            .finish()
    }
}

impl<S> Layer<S> for SpanCollector
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut fields = BTreeMap::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        span.extensions_mut().insert(Fields(fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        if let Some(fields) = span.extensions_mut().get_mut::<Fields>() {
            values.record(&mut FieldVisitor(&mut fields.0));
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else { return };
        let attributes = span
            .extensions_mut()
            .remove::<Fields>()
            .map(|fields| fields.0)
            .unwrap_or_default();
        let name = attributes
            .get(SpanAttributes::NAME)
            .cloned()
            .unwrap_or_else(|| span.name().to_string());

        self.finished.lock().push(FinishedSpan {
            name,
            target: span.metadata().target().to_string(),
            attributes,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_collects_fields_and_late_records() {
        let collector = SpanCollector::new();
        let subscriber = tracing_subscriber::registry().with(collector.clone());

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!(
                "work",
                otel.name = %"doing work",
                courier.handler = "app::Worker",
                status = tracing::field::Empty,
            );
            span.in_scope(|| {});
            span.record("status", "done");
            drop(span);

            tracing::info_span!("plain").in_scope(|| {});
        });

        let spans = collector.finished_spans();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].name, "doing work");
        assert_eq!(spans[0].attribute("courier.handler"), Some("app::Worker"));
        assert_eq!(spans[0].attribute("status"), Some("done"));
        assert_eq!(spans[1].name, "plain");
        assert_eq!(collector.handler_spans().len(), 1);

        collector.clear();
        assert!(collector.last().is_none());
    }
}
