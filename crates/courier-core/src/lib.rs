//! # Courier Core
//!
//! The core data model of the Courier in-process event dispatcher.
//!
//! This crate contains everything that does not depend on how handlers are
//! invoked:
//!
//! - **Events**: named occurrences with a JSON payload ([`Event`], [`EventName`],
//!   [`NamedEvent`], [`Payload`])
//! - **Patterns**: wildcard subscription patterns ([`Pattern`], [`matches`])
//! - **Queue**: the per-unit-of-work buffer and the ambient dispatch surface
//!   ([`EventQueue`], [`dispatch`], [`dispatch_with`], [`current_queue`])
//!
//! ## Data Flow
//!
//! ```text
//! caller ──dispatch()──▶ EventQueue ──seal()──▶ DeliveryEngine ──▶ handlers
//!                        (one per unit of work)  (courier-framework)
//! ```
//!
//! Dispatching never invokes handlers directly: events are buffered until the
//! unit of work that produced them has finished, then flushed once.

pub mod error;
pub mod event;
pub mod pattern;
pub mod queue;

pub use error::{DispatchError, DispatchResult};
pub use event::{Event, EventName, NamedEvent, Payload};
pub use pattern::{Pattern, matches};
pub use queue::{EventQueue, current_queue, dispatch, dispatch_serialized, dispatch_with};
