//! Error types for the dispatch surface.
//!
//! Handler-side failures (`HandlerError`, `ExtractError`) live in
//! `courier-framework`; this crate only knows about getting events into a queue.

use thiserror::Error;

/// Errors raised at the call site of [`dispatch`](crate::dispatch) and
/// [`EventQueue::push`](crate::EventQueue::push).
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// `dispatch` was called while no unit of work was active.
    #[error("cannot dispatch '{event}': no unit of work is active on this task")]
    OutsideUnitOfWork {
        /// The event that could not be queued.
        event: String,
    },

    /// The queue has already been handed to the delivery engine.
    #[error("cannot dispatch '{event}': the unit of work is already being flushed")]
    QueueSealed {
        /// The event that could not be queued.
        event: String,
    },

    /// The queue reached its configured capacity.
    #[error("cannot dispatch '{event}': event queue is full ({capacity} events)")]
    QueueFull {
        /// The event that could not be queued.
        event: String,
        /// The configured capacity.
        capacity: usize,
    },

    /// A typed payload did not serialize to a JSON object.
    #[error("invalid payload for '{event}': {reason}")]
    InvalidPayload {
        /// The event whose payload was rejected.
        event: String,
        /// Why the payload was rejected.
        reason: String,
    },
}

/// Result type for dispatch operations.
pub type DispatchResult<T = ()> = Result<T, DispatchError>;
