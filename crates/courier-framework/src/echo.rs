//! A handler set that logs every event.

use std::any::type_name;

use async_trait::async_trait;
use tracing::{Instrument, info};

use crate::delivery::{DeliveryContext, DeliveryReport};
use crate::event_handler::EventHandler;
use crate::handler::HandlerKind;
use crate::span::{handler_span, record_outcome};
use courier_core::Event;

/// Logs each delivered event at `info` level with its payload.
///
/// Useful while wiring up a new application to see what gets dispatched.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

impl EchoHandler {
    /// Creates the handler.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventHandler for EchoHandler {
    fn name(&self) -> &str {
        "EchoHandler"
    }

    fn qualified_name(&self) -> &str {
        type_name::<Self>()
    }

    async fn handle(&self, event: &Event, _cx: &DeliveryContext) -> DeliveryReport {
        let span = handler_span(self, event.name(), "echo", HandlerKind::Sync);
        async {
            info!(
                event = %event.name(),
                payload = %serde_json::Value::Object(event.payload().clone()),
                "Event delivered"
            );
        }
        .instrument(span.clone())
        .await;

        let result = Ok(());
        record_outcome(&span, &result);
        let mut report = DeliveryReport::default();
        report.record(&result);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_counts_as_delivered() {
        let report = EchoHandler::new()
            .handle(&Event::named("anything"), &DeliveryContext::default())
            .await;
        assert_eq!(report.delivered, 1);
        assert_eq!(EchoHandler.name(), "EchoHandler");
    }
}
