//! # Courier
//!
//! Pattern-matched, in-process event dispatch.
//!
//! Application code dispatches named events while it handles a unit of work
//! (typically one request). Once that work has succeeded, every queued event
//! is delivered, in dispatch order, to the handlers whose patterns match it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐ dispatch ┌────────────┐  flush  ┌────────────────┐
//! │ unit of work │─────────▶│ EventQueue │────────▶│ DeliveryEngine │──▶ LocalHandler ──▶ handlers
//! │  (request)   │          │ (per unit) │         │ (one span per  │──▶ EchoHandler
//! └──────────────┘          └────────────┘         │  invocation)   │
//!                                                  └────────────────┘
//! ```
//!
//! - **core**: events, wildcard patterns, the queue and [`dispatch`](prelude::dispatch)
//! - **framework**: handler registration, parameter extraction, delivery, spans
//! - **runtime**: unit-of-work orchestration, tower middleware, config, logging
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! async fn on_cat(event: Event) {
//!     info!(event = %event.name(), "a cat did something");
//! }
//!
//! fn audit(event: Event) {
//!     debug!(event = %event.name(), "seen");
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handler = LocalHandler::new();
//!     handler.register("cat_*", on_cat);
//!     handler.register_all(audit);
//!
//!     let runtime = EventRuntime::builder()
//!         .handler(handler)
//!         .config_loader(ConfigLoader::new())
//!         .with_logging()
//!         .try_build()?;
//!
//!     runtime
//!         .unit_of_work(async { dispatch("cat_ate_a_fish") })
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: load `courier.toml` files (default)
//! - `json-log`: JSON log output

pub use courier_core as core;
pub use courier_framework as framework;
pub use courier_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    // Dispatch surface
    pub use courier_core::{
        DispatchError, Event, EventName, NamedEvent, Payload, Pattern, dispatch,
        dispatch_serialized, dispatch_with,
    };

    // Handler sets and extractors
    pub use courier_framework::{
        Dependency, Depends, EchoHandler, EventHandler, ExtractError, ExtractResult,
        HandlerContext, Json, LocalHandler, Shared,
    };

    // Runtime
    pub use courier_runtime::{ConfigLoader, CourierConfig, EventLayer, EventRuntime};

    // Logging macros
    pub use courier_runtime::tracing::{debug, error, info, trace, warn};
}
