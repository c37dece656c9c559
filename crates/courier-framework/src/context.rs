//! Invocation context and shared resources.
//!
//! - [`Resources`] - application-wide values registered at startup (database
//!   pools, API clients, ...). Cheap to clone, read-only during delivery.
//! - [`HandlerContext`] - everything one handler invocation can extract from:
//!   the event, the resources, and a dependency cache scoped to the invocation.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{ExtractError, ExtractResult};
use crate::extractor::Dependency;
use courier_core::Event;

type AnyArc = Arc<dyn Any + Send + Sync>;

// =============================================================================
// Resources
// =============================================================================

/// A type map of application-wide values, one per type.
#[derive(Clone, Default)]
pub struct Resources {
    map: Arc<HashMap<TypeId, AnyArc>>,
}

impl Resources {
    /// Creates an empty resource map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.insert_arc(Arc::new(value));
    }

    /// Inserts an already shared value.
    pub fn insert_arc<T: Send + Sync + 'static>(&mut self, value: Arc<T>) {
        Arc::make_mut(&mut self.map).insert(TypeId::of::<T>(), value);
    }

    /// Inserts a value (builder pattern).
    pub fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    /// Looks up a value by type.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.map
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    /// Returns the number of registered resources.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if no resources are registered.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resources")
            .field("len", &self.map.len())
            .finish()
    }
}

// =============================================================================
// HandlerContext
// =============================================================================

/// The context of a single handler invocation.
///
/// A fresh context is built for every invocation, so a dependency resolved
/// here is shared by all parameters of that invocation (and by the nested
/// dependencies they pull in) but never leaks into the next handler.
pub struct HandlerContext {
    event: Event,
    resources: Resources,
    dependencies: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl HandlerContext {
    /// Creates the context for one invocation.
    pub fn new(event: Event, resources: Resources) -> Self {
        Self {
            event,
            resources,
            dependencies: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the event being delivered.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Returns the application resources.
    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Looks up a shared resource, failing if it is not registered.
    pub fn require_resource<T: Send + Sync + 'static>(&self) -> ExtractResult<Arc<T>> {
        self.resources
            .get::<T>()
            .ok_or(ExtractError::ResourceNotFound(std::any::type_name::<T>()))
    }

    /// Resolves a dependency, reusing the value if this invocation already
    /// resolved it.
    pub async fn resolve<T: Dependency>(&self) -> ExtractResult<T> {
        let cached = self
            .dependencies
            .lock()
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .cloned();
        if let Some(value) = cached {
            return Ok(value);
        }

        let value = T::resolve(self).await?;
        self.dependencies
            .lock()
            .insert(TypeId::of::<T>(), Box::new(value.clone()));
        Ok(value)
    }
}

impl fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerContext")
            .field("event", &self.event)
            .field("resources", &self.resources)
            .finish_non_exhaustive()
    }
}
