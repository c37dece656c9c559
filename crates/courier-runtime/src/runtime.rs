//! The host side of a unit of work.
//!
//! [`EventRuntime`] owns the attached handler sets and the delivery settings.
//! Each unit of work (one request, one job, one message) runs through
//! [`EventRuntime::unit_of_work`]:
//!
//! ```text
//! new queue ─▶ run work inside queue scope ─▶ Ok?  ─yes─▶ seal + flush once
//!                                              │
//!                                              └─no──▶ seal + discard
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use courier_runtime::EventRuntime;
//!
//! let handler = LocalHandler::new();
//! handler.register("user_*", on_user_event);
//!
//! let runtime = EventRuntime::builder()
//!     .handler(handler)
//!     .resource(db_pool)
//!     .build();
//!
//! runtime
//!     .unit_of_work(async {
//!         create_user().await?;
//!         dispatch("user_created")?;
//!         Ok::<_, AppError>(())
//!     })
//!     .await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{ConfigLoader, CourierConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging::LoggingBuilder;
use crate::middleware::EventLayer;
use courier_core::EventQueue;
use courier_framework::{
    BoxedEventHandler, DeliveryContext, DeliveryEngine, DeliveryReport, EchoHandler, EventHandler,
    Resources,
};

/// Runs units of work and flushes their events.
///
/// Cheap to clone; clones share handler sets and resources.
#[derive(Debug, Clone)]
pub struct EventRuntime {
    engine: DeliveryEngine,
    max_queued_events: Option<usize>,
}

impl EventRuntime {
    /// Creates a runtime with default settings over `handlers`.
    pub fn new(handlers: impl IntoIterator<Item = BoxedEventHandler>) -> Self {
        Self {
            engine: DeliveryEngine::new(handlers),
            max_queued_events: None,
        }
    }

    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from validated configuration and initializes logging.
    pub fn from_config(
        config: &CourierConfig,
        handlers: impl IntoIterator<Item = BoxedEventHandler>,
    ) -> RuntimeResult<Self> {
        let mut builder = Self::builder().config(config.clone()).with_logging();
        for handler in handlers {
            builder = builder.handler_arc(handler);
        }
        builder.try_build()
    }

    /// Returns the delivery engine.
    pub fn engine(&self) -> &DeliveryEngine {
        &self.engine
    }

    /// Returns a tower layer running each request as a unit of work.
    pub fn layer(&self) -> EventLayer {
        EventLayer::new(self.clone())
    }

    /// Creates the queue for a new unit of work.
    pub fn new_queue(&self) -> EventQueue {
        match self.max_queued_events {
            Some(capacity) => EventQueue::bounded(capacity),
            None => EventQueue::new(),
        }
    }

    /// Runs `work` as one unit of work.
    ///
    /// Events dispatched while `work` runs are delivered once it returns
    /// `Ok`, before this future completes. If it returns `Err` they are
    /// discarded. Handler failures never affect the returned value.
    pub async fn unit_of_work<F, T, E>(&self, work: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let queue = self.new_queue();
        self.run_in(&queue, work).await
    }

    /// Runs `work` as the unit of work owning `queue`.
    ///
    /// Used when part of the work has to be started inside the queue scope
    /// before it can be awaited, as the tower middleware does.
    pub async fn run_in<F, T, E>(&self, queue: &EventQueue, work: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        queue
            .scope(async {
                let result = work.await;
                match &result {
                    Ok(_) => {
                        self.flush(queue).await;
                    }
                    Err(_) => {
                        let discarded = queue.seal();
                        if !discarded.is_empty() {
                            debug!(
                                discarded = discarded.len(),
                                "Unit of work failed, discarding queued events"
                            );
                        }
                    }
                }
                result
            })
            .await
    }

    /// Seals `queue` and delivers its events.
    ///
    /// Runs inside the queue scope when called from [`run_in`](Self::run_in),
    /// so handlers that dispatch see a sealed queue rather than no queue.
    pub async fn flush(&self, queue: &EventQueue) -> DeliveryReport {
        self.engine.flush(queue).await
    }
}

/// Builder for [`EventRuntime`].
#[derive(Default)]
pub struct RuntimeBuilder {
    handlers: Vec<BoxedEventHandler>,
    resources: Resources,
    config: Option<CourierConfig>,
    loader: Option<ConfigLoader>,
    handler_timeout: Option<Duration>,
    max_queued_events: Option<usize>,
    init_logging: bool,
}

impl RuntimeBuilder {
    /// Creates a builder with no handlers and default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a handler set. Sets receive events in attachment order.
    pub fn handler(self, handler: impl EventHandler) -> Self {
        self.handler_arc(Arc::new(handler))
    }

    /// Attaches a shared handler set.
    pub fn handler_arc(mut self, handler: BoxedEventHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Registers a resource for `Shared<T>` parameters.
    pub fn resource<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.resources.insert(value);
        self
    }

    /// Uses `config` for delivery (and logging, with [`with_logging`](Self::with_logging)).
    pub fn config(mut self, config: CourierConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Loads configuration with `loader` when building.
    pub fn config_loader(mut self, loader: ConfigLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Loads configuration from `path` when building.
    pub fn config_file(self, path: impl AsRef<std::path::Path>) -> Self {
        self.config_loader(ConfigLoader::new().file(path))
    }

    /// Limits each handler invocation, overriding the configuration.
    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = Some(timeout);
        self
    }

    /// Bounds each unit of work's queue, overriding the configuration.
    pub fn max_queued_events(mut self, capacity: usize) -> Self {
        self.max_queued_events = Some(capacity);
        self
    }

    /// Installs the global tracing subscriber from the logging configuration.
    ///
    /// [`try_build`](Self::try_build) fails with [`RuntimeError::Logging`]
    /// if a subscriber is already installed.
    ///
    /// [`RuntimeError::Logging`]: crate::RuntimeError::Logging
    pub fn with_logging(mut self) -> Self {
        self.init_logging = true;
        self
    }

    /// Builds the runtime without loading configuration from disk or the
    /// environment. Configuration set with [`config`](Self::config) applies
    /// unvalidated.
    pub fn build(self) -> EventRuntime {
        let config = self.config.clone().unwrap_or_default();
        self.assemble(config)
    }

    /// Loads (if requested), validates and applies configuration, then builds.
    pub fn try_build(mut self) -> RuntimeResult<EventRuntime> {
        let config = match (self.config.take(), self.loader.take()) {
            (Some(config), _) => config,
            (None, Some(loader)) => loader.load()?,
            (None, None) => CourierConfig::default(),
        };
        validate_config(&config)?;

        if self.init_logging {
            LoggingBuilder::from_config(&config.logging).try_init()?;
        }
        info!(
            log_level = %config.logging.level,
            handler_timeout_ms = ?config.delivery.handler_timeout_ms,
            max_queued_events = ?config.delivery.max_queued_events,
            "Courier runtime configured"
        );

        Ok(self.assemble(config))
    }

    fn assemble(self, config: CourierConfig) -> EventRuntime {
        let mut handlers = self.handlers;
        if config.delivery.echo {
            handlers.push(Arc::new(EchoHandler::new()));
        }

        let cx = DeliveryContext::new()
            .with_resources(self.resources)
            .with_handler_timeout(self.handler_timeout.or(config.delivery.handler_timeout()));

        EventRuntime {
            engine: DeliveryEngine::new(handlers).with_context(cx),
            max_queued_events: self.max_queued_events.or(config.delivery.max_queued_events),
        }
    }
}
