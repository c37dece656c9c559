//! # Courier Framework
//!
//! Handler registration and delivery for the Courier event dispatcher.
//!
//! This layer provides:
//! - [`Handler`] - plain sync or async functions with injected parameters
//! - [`FromContext`] / [`Dependency`] - async, nested, per-invocation
//!   parameter resolution
//! - [`LocalHandler`] - an in-process handler set with wildcard registration
//! - [`DeliveryEngine`] - flushes a unit of work's queue through every
//!   attached [`EventHandler`], one span per invocation
//!
//! ```rust,ignore
//! let handler = LocalHandler::new();
//!
//! handler.on("cat_*", |event: Event| async move {
//!     tracing::info!(event = %event.name(), "a cat did something");
//! });
//!
//! handler.on_all(|event: Event| {
//!     tracing::debug!(event = %event.name(), "seen");
//! });
//! ```

pub mod context;
pub mod delivery;
pub mod echo;
pub mod error;
pub mod event_handler;
pub mod extractor;
pub mod handler;
pub mod local;
pub mod registry;
pub mod span;

pub use context::{HandlerContext, Resources};
pub use delivery::{DeliveryContext, DeliveryEngine, DeliveryReport};
pub use echo::EchoHandler;
pub use error::{ExtractError, ExtractResult, HandlerError, HandlerResult};
pub use event_handler::{BoxedEventHandler, EventHandler};
pub use extractor::{Dependency, Depends, FromContext, Json, Shared};
pub use handler::{Handler, HandlerDescriptor, HandlerKind, HandlerOutcome};
pub use local::LocalHandler;
pub use registry::{Registration, Registry};
pub use span::SpanAttributes;
