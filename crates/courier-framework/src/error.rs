//! Error types for handler invocation.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while resolving a handler parameter.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// No shared resource of the requested type was registered.
    #[error("no shared resource of type '{0}' is registered")]
    ResourceNotFound(&'static str),

    /// The event payload could not be deserialized into the requested type.
    #[error("payload of '{event}' is not a valid '{expected}': {reason}")]
    Payload {
        /// The event whose payload was rejected.
        event: String,
        /// Expected type name.
        expected: &'static str,
        /// Deserialization error.
        reason: String,
    },

    /// A dependency failed to resolve.
    #[error("dependency '{dependency}' failed to resolve: {reason}")]
    Dependency {
        /// Dependency type name.
        dependency: &'static str,
        /// Reason for failure.
        reason: String,
    },

    /// Custom extraction error.
    #[error("{0}")]
    Custom(String),
}

impl ExtractError {
    /// Creates a dependency error for `T`.
    pub fn dependency<T: ?Sized>(reason: impl Into<String>) -> Self {
        Self::Dependency {
            dependency: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }

    /// Creates a custom extraction error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// A failed handler invocation.
///
/// Failures are contained per invocation: the delivery engine logs them,
/// records them on the invocation span and moves on to the next handler.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    /// A declared parameter could not be resolved.
    #[error(transparent)]
    Dependency(#[from] ExtractError),

    /// The handler returned an error.
    #[error("handler returned an error: {0}")]
    Failed(String),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// The handler exceeded the configured timeout.
    #[error("handler timed out after {0:?}")]
    TimedOut(Duration),
}

/// Result type for a single handler invocation.
pub type HandlerResult = Result<(), HandlerError>;
