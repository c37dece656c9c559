//! Courier Runtime - the host layer of the Courier event dispatcher.
//!
//! This crate provides:
//! - Unit-of-work orchestration ([`EventRuntime`], [`RuntimeBuilder`])
//! - Tower middleware running each request as a unit of work ([`EventLayer`])
//! - Layered configuration ([`ConfigLoader`], [`CourierConfig`])
//! - Logging setup ([`LoggingBuilder`], [`SpanEvents`])
//! - An in-memory trace collector for tests ([`SpanCollector`])
//!
//! ```ignore
//! use courier_runtime::EventRuntime;
//! use courier_runtime::config::load_config;
//!
//! let config = load_config()?;
//! let runtime = EventRuntime::from_config(&config, [Arc::new(handler) as _])?;
//!
//! let service = tower::ServiceBuilder::new()
//!     .layer(runtime.layer())
//!     .service(app);
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod runtime;
pub mod telemetry;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, CourierConfig, DeliveryConfig, LoggingConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use middleware::{EventLayer, EventService};
pub use runtime::{EventRuntime, RuntimeBuilder};
pub use telemetry::{FinishedSpan, SpanCollector};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;
