//! Tower middleware running each request as a unit of work.
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .layer(runtime.layer())
//!     .service(my_service);
//! ```
//!
//! Every call gets a fresh queue. The inner service is called inside the
//! queue scope, so it can [`dispatch`](courier_core::dispatch) both while
//! building its future and while that future runs. The response is returned
//! after the queued events have been delivered; an `Err` response discards
//! them.

use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tower::{Layer, Service};

use crate::runtime::EventRuntime;

/// A [`Layer`] wrapping services in [`EventService`].
#[derive(Debug, Clone)]
pub struct EventLayer {
    runtime: EventRuntime,
}

impl EventLayer {
    /// Creates a layer delivering through `runtime`.
    pub fn new(runtime: EventRuntime) -> Self {
        Self { runtime }
    }
}

impl<S> Layer<S> for EventLayer {
    type Service = EventService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EventService {
            inner,
            runtime: self.runtime.clone(),
        }
    }
}

/// A service running each call of `S` as a unit of work.
#[derive(Debug, Clone)]
pub struct EventService<S> {
    inner: S,
    runtime: EventRuntime,
}

impl<S, Request> Service<Request> for EventService<S>
where
    S: Service<Request> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // The service polled ready is the one that must be called.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let runtime = self.runtime.clone();
        let queue = runtime.new_queue();
        let response = queue.sync_scope(|| inner.call(request));

        Box::pin(async move { runtime.run_in(&queue, response).await })
    }
}
