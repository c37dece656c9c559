//! Handler functions and their type-erased descriptors.
//!
//! Any plain function or closure can be a handler, as long as every parameter
//! implements [`FromContext`] and the return value implements
//! [`HandlerOutcome`]. Both synchronous and asynchronous functions are
//! accepted; which one a function is gets decided once, at registration,
//! from its signature:
//!
//! ```rust,ignore
//! // HandlerKind::Sync - runs to completion without suspending
//! fn count(event: Event) {
//!     tracing::info!(event = %event.name(), "counted");
//! }
//!
//! // HandlerKind::Async - awaited by the delivery engine
//! async fn notify(Json(order): Json<Order>, Shared(mailer): Shared<Mailer>) -> Result<(), MailError> {
//!     mailer.send(order.owner).await
//! }
//! ```
//!
//! # Marker Types
//!
//! [`Handler`] is generic over a marker tuple, `(Blocking, T1, ..)` for
//! synchronous functions and `(Awaited, T1, ..)` for asynchronous ones. The
//! marker is inferred at the call site and never needs to be written out.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::HandlerContext;
use crate::error::{HandlerError, HandlerResult};
use crate::extractor::FromContext;

/// How a handler is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// A plain function, called directly.
    Sync,
    /// A function returning a future, awaited.
    Async,
}

impl HandlerKind {
    /// Returns the lowercase name used in span attributes.
    pub fn as_str(self) -> &'static str {
        match self {
            HandlerKind::Sync => "sync",
            HandlerKind::Async => "async",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker for handlers returning a future.
#[derive(Debug)]
pub struct Awaited;

/// Marker for handlers returning a value directly.
#[derive(Debug)]
pub struct Blocking;

// ============================================================================
// HandlerOutcome
// ============================================================================

/// A value a handler may return.
pub trait HandlerOutcome: Send + 'static {
    /// Converts the value into the invocation result.
    fn into_result(self) -> HandlerResult;
}

impl HandlerOutcome for () {
    fn into_result(self) -> HandlerResult {
        Ok(())
    }
}

/// `Err` marks the invocation as failed; the error's `Display` output is kept.
impl<E: fmt::Display + Send + 'static> HandlerOutcome for Result<(), E> {
    fn into_result(self) -> HandlerResult {
        self.map_err(|e| HandlerError::Failed(e.to_string()))
    }
}

// ============================================================================
// Handler Trait
// ============================================================================

/// A function usable as an event handler.
///
/// Implemented for functions and closures with 0-8 [`FromContext`]
/// parameters. Parameters are resolved in declaration order; the first one
/// that fails aborts the invocation with [`HandlerError::Dependency`].
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Whether the function is synchronous or asynchronous.
    const KIND: HandlerKind;

    /// Resolves the parameters and runs the function.
    fn call(self, ctx: Arc<HandlerContext>) -> BoxFuture<'static, HandlerResult>;
}

macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_variables)]
        impl<F, Fut, Res, $($ty,)*> Handler<(Awaited, $($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: HandlerOutcome,
            $( $ty: FromContext + 'static, )*
        {
            const KIND: HandlerKind = HandlerKind::Async;

            fn call(self, ctx: Arc<HandlerContext>) -> BoxFuture<'static, HandlerResult> {
                Box::pin(async move {
                    $(
                        let $ty = $ty::from_context(&ctx).await?;
                    )*
                    (self)($($ty,)*).await.into_result()
                })
            }
        }

        #[allow(non_snake_case, unused_variables)]
        impl<F, Res, $($ty,)*> Handler<(Blocking, $($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Res + Clone + Send + Sync + 'static,
            Res: HandlerOutcome,
            $( $ty: FromContext + 'static, )*
        {
            const KIND: HandlerKind = HandlerKind::Sync;

            fn call(self, ctx: Arc<HandlerContext>) -> BoxFuture<'static, HandlerResult> {
                Box::pin(async move {
                    $(
                        let $ty = $ty::from_context(&ctx).await?;
                    )*
                    (self)($($ty,)*).into_result()
                })
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);

// ============================================================================
// HandlerDescriptor
// ============================================================================

/// A type-erased handler invocation.
pub type BoxedHandler =
    Arc<dyn Fn(Arc<HandlerContext>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// A registered handler: the callable, its kind, and its identity.
#[derive(Clone)]
pub struct HandlerDescriptor {
    call: BoxedHandler,
    kind: HandlerKind,
    identity: &'static str,
}

impl HandlerDescriptor {
    /// Wraps a handler function.
    ///
    /// The identity is the function's type path, e.g. `app::handlers::on_signup`.
    pub fn new<F, T>(f: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        Self {
            call: Arc::new(move |ctx| f.clone().call(ctx)),
            kind: F::KIND,
            identity: type_name::<F>(),
        }
    }

    /// Returns how the handler is invoked.
    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    /// Returns the handler's fully qualified identity.
    pub fn identity(&self) -> &'static str {
        self.identity
    }

    /// Returns the last path segment of the identity.
    pub fn short_name(&self) -> &'static str {
        short_name(self.identity)
    }

    /// Starts one invocation. Nothing runs until the future is polled.
    pub fn invoke(&self, ctx: Arc<HandlerContext>) -> BoxFuture<'static, HandlerResult> {
        (self.call)(ctx)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("identity", &self.identity)
            .field("kind", &self.kind)
            .finish()
    }
}

// Closures are named `path::{{closure}}`; keep the enclosing function for those.
fn short_name(identity: &str) -> &str {
    let trimmed = identity.trim_end_matches("::{{closure}}");
    let trimmed = trimmed.split('<').next().unwrap_or(trimmed);
    trimmed.rsplit("::").next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Resources;
    use crate::error::ExtractError;
    use crate::extractor::Shared;
    use courier_core::{Event, EventName};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx() -> Arc<HandlerContext> {
        Arc::new(HandlerContext::new(
            Event::named("TEST_EVENT"),
            Resources::new(),
        ))
    }

    fn sync_handler(_event: Event) {}

    async fn async_handler(_event: Event) {}

    async fn failing_handler(name: EventName) -> Result<(), String> {
        Err(format!("cannot handle {name}"))
    }

    #[test]
    fn test_kind_detection() {
        assert_eq!(HandlerDescriptor::new(sync_handler).kind(), HandlerKind::Sync);
        assert_eq!(
            HandlerDescriptor::new(async_handler).kind(),
            HandlerKind::Async
        );
        assert_eq!(HandlerDescriptor::new(|| {}).kind(), HandlerKind::Sync);
        assert_eq!(
            HandlerDescriptor::new(|| async {}).kind(),
            HandlerKind::Async
        );
    }

    #[test]
    fn test_identity() {
        let descriptor = HandlerDescriptor::new(sync_handler);
        assert!(descriptor.identity().ends_with("handler::tests::sync_handler"));
        assert_eq!(descriptor.short_name(), "sync_handler");
    }

    #[test]
    fn test_short_name_of_closure() {
        assert_eq!(short_name("app::setup::{{closure}}"), "setup");
        assert_eq!(short_name("on_event"), "on_event");
    }

    #[tokio::test]
    async fn test_invoke_sync_and_async() {
        let counter = Arc::new(AtomicUsize::new(0));

        let c = counter.clone();
        let sync = HandlerDescriptor::new(move |_: Event| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let c = counter.clone();
        let async_ = HandlerDescriptor::new(move |_: Event| {
            let c = c.clone();
            async move {
                c.fetch_add(10, Ordering::SeqCst);
            }
        });

        sync.invoke(ctx()).await.unwrap();
        async_.invoke(ctx()).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn test_invoke_is_lazy() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let handler = HandlerDescriptor::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let pending = handler.invoke(ctx());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        pending.await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_outcome() {
        let err = HandlerDescriptor::new(failing_handler)
            .invoke(ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Failed(ref msg) if msg == "cannot handle TEST_EVENT"));
    }

    #[tokio::test]
    async fn test_extraction_failure_skips_body() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let handler = HandlerDescriptor::new(move |_: Shared<String>| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let err = handler.invoke(ctx()).await.unwrap_err();
        assert!(matches!(
            err,
            HandlerError::Dependency(ExtractError::ResourceNotFound(_))
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
