//! Extractor system for handler parameters.
//!
//! Any type implementing [`FromContext`] can be used as a handler parameter;
//! the delivery engine resolves every parameter before the handler runs.
//! Extraction is asynchronous, so a parameter may await I/O.
//!
//! # Built-in Extractors
//!
//! | Parameter      | Resolves to                                         |
//! |----------------|-----------------------------------------------------|
//! | [`Event`]      | the delivered event                                 |
//! | [`EventName`]  | its name (with the original enum value, if any)     |
//! | [`Payload`]    | its raw JSON payload                                |
//! | [`Json<T>`]    | the payload deserialized into `T`                   |
//! | [`Shared<T>`]  | an application resource registered at startup       |
//! | [`Depends<T>`] | a [`Dependency`], resolved once per invocation      |
//! | `Option<T>`    | `Some` if `T` resolves, otherwise `None`            |
//!
//! # Nested Dependencies
//!
//! ```rust,ignore
//! #[derive(Clone)]
//! struct Db(Arc<Pool>);
//!
//! #[async_trait]
//! impl Dependency for Db {
//!     async fn resolve(ctx: &HandlerContext) -> ExtractResult<Self> {
//!         let pool = ctx.require_resource::<Pool>()?;
//!         Ok(Db(pool))
//!     }
//! }
//!
//! #[derive(Clone)]
//! struct Users(Db);
//!
//! #[async_trait]
//! impl Dependency for Users {
//!     async fn resolve(ctx: &HandlerContext) -> ExtractResult<Self> {
//!         Ok(Users(ctx.resolve::<Db>().await?))
//!     }
//! }
//!
//! async fn on_signup(event: Event, Depends(users): Depends<Users>) { /* ... */ }
//! ```

use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::context::HandlerContext;
use crate::error::{ExtractError, ExtractResult};
use courier_core::{Event, EventName, Payload};

/// A trait for types that can be extracted from a [`HandlerContext`].
///
/// # Error Handling
///
/// If extraction fails the handler is not called and the invocation is
/// reported as failed; other handlers are unaffected.
#[async_trait]
pub trait FromContext: Sized + Send {
    /// Attempts to extract this type from the given context.
    async fn from_context(ctx: &HandlerContext) -> ExtractResult<Self>;
}

/// A value built on demand for a handler invocation.
///
/// Implementations may resolve other dependencies through
/// [`HandlerContext::resolve`]; each type resolves at most once per invocation.
#[async_trait]
pub trait Dependency: Clone + Send + Sync + 'static {
    /// Builds the value.
    async fn resolve(ctx: &HandlerContext) -> ExtractResult<Self>;
}

#[async_trait]
impl FromContext for Event {
    async fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        Ok(ctx.event().clone())
    }
}

#[async_trait]
impl FromContext for EventName {
    async fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        Ok(ctx.event().name().clone())
    }
}

#[async_trait]
impl FromContext for Payload {
    async fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        Ok(ctx.event().payload().clone())
    }
}

#[async_trait]
impl<T: FromContext> FromContext for Option<T> {
    async fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        Ok(T::from_context(ctx).await.ok())
    }
}

// ============================================================================
// Json
// ============================================================================

/// The event payload deserialized into `T`.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

#[async_trait]
impl<T: DeserializeOwned + Send> FromContext for Json<T> {
    async fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        let event = ctx.event();
        event
            .payload_as::<T>()
            .map(Json)
            .map_err(|e| ExtractError::Payload {
                event: event.name().to_string(),
                expected: std::any::type_name::<T>(),
                reason: e.to_string(),
            })
    }
}

// ============================================================================
// Shared
// ============================================================================

/// An application resource registered in [`Resources`](crate::Resources).
#[derive(Debug)]
pub struct Shared<T>(pub Arc<T>);

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> FromContext for Shared<T> {
    async fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        ctx.require_resource::<T>().map(Shared)
    }
}

// ============================================================================
// Depends
// ============================================================================

/// A resolved [`Dependency`].
#[derive(Debug, Clone)]
pub struct Depends<T>(pub T);

impl<T> Deref for Depends<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

#[async_trait]
impl<T: Dependency> FromContext for Depends<T> {
    async fn from_context(ctx: &HandlerContext) -> ExtractResult<Self> {
        ctx.resolve::<T>().await.map(Depends)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Resources;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx_with(payload: serde_json::Value, resources: Resources) -> HandlerContext {
        let serde_json::Value::Object(payload) = payload else {
            panic!("payload must be an object");
        };
        HandlerContext::new(Event::new("TEST_EVENT", payload), resources)
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Order {
        id: u64,
    }

    #[tokio::test]
    async fn test_json_extraction() {
        let ctx = ctx_with(json!({ "id": 3 }), Resources::new());
        let Json(order) = Json::<Order>::from_context(&ctx).await.unwrap();
        assert_eq!(order, Order { id: 3 });
    }

    #[tokio::test]
    async fn test_json_extraction_failure() {
        let ctx = ctx_with(json!({ "id": "three" }), Resources::new());
        let err = Json::<Order>::from_context(&ctx).await.unwrap_err();
        assert!(matches!(err, ExtractError::Payload { ref event, .. } if event == "TEST_EVENT"));
    }

    #[tokio::test]
    async fn test_optional_extraction_never_fails() {
        let ctx = ctx_with(json!({}), Resources::new());
        let missing = Option::<Shared<String>>::from_context(&ctx).await.unwrap();
        assert!(missing.is_none());
    }

    // Connection pool <- Db <- handler, with a counter on the pool lookups.
    struct Pool {
        lookups: AtomicUsize,
    }

    #[derive(Clone)]
    struct Connection(Arc<Pool>);

    #[async_trait]
    impl Dependency for Connection {
        async fn resolve(ctx: &HandlerContext) -> ExtractResult<Self> {
            let pool = ctx.require_resource::<Pool>()?;
            pool.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(Connection(pool))
        }
    }

    #[derive(Clone)]
    struct Db(Connection);

    #[async_trait]
    impl Dependency for Db {
        async fn resolve(ctx: &HandlerContext) -> ExtractResult<Self> {
            Ok(Db(ctx.resolve::<Connection>().await?))
        }
    }

    #[tokio::test]
    async fn test_nested_dependencies_resolve_once_per_invocation() {
        let pool = Arc::new(Pool {
            lookups: AtomicUsize::new(0),
        });
        let mut resources = Resources::new();
        resources.insert_arc(Arc::clone(&pool));
        let ctx = ctx_with(json!({}), resources);

        let Depends(db) = Depends::<Db>::from_context(&ctx).await.unwrap();
        let Depends(conn) = Depends::<Connection>::from_context(&ctx).await.unwrap();

        assert!(Arc::ptr_eq(&(db.0).0, &conn.0));
        assert_eq!(pool.lookups.load(Ordering::SeqCst), 1);
    }

    #[derive(Debug, Clone)]
    struct Broken;

    #[async_trait]
    impl Dependency for Broken {
        async fn resolve(_ctx: &HandlerContext) -> ExtractResult<Self> {
            Err(ExtractError::dependency::<Self>("backend unavailable"))
        }
    }

    #[tokio::test]
    async fn test_dependency_failure() {
        let ctx = ctx_with(json!({}), Resources::new());
        let err = Depends::<Broken>::from_context(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("backend unavailable"));
    }
}
