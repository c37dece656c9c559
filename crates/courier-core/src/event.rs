//! Event data model.
//!
//! - [`EventName`] - the name an event is dispatched under, optionally carrying
//!   the enumerated constant it was created from
//! - [`NamedEvent`] - implemented by application enums usable as event names
//! - [`Event`] - a name plus a JSON [`Payload`]
//!
//! # Enumerated Event Names
//!
//! ```rust,ignore
//! #[derive(Debug, Clone, PartialEq)]
//! enum UserEvent {
//!     Created,
//! }
//!
//! impl NamedEvent for UserEvent {
//!     fn event_name(&self) -> &'static str {
//!         match self {
//!             UserEvent::Created => "USER_CREATED",
//!         }
//!     }
//! }
//!
//! dispatch(UserEvent::Created)?;
//!
//! // In a handler:
//! assert!(event.name().is(&UserEvent::Created));
//! ```

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// The payload attached to an event. Defaults to an empty object.
pub type Payload = serde_json::Map<String, Value>;

/// An enumerated constant that can be used as an event name.
///
/// Matching always uses [`event_name`](Self::event_name); the original value
/// is kept alongside so handlers can compare against the enum itself.
pub trait NamedEvent: Any + Send + Sync + fmt::Debug {
    /// The string value used for pattern matching.
    fn event_name(&self) -> &'static str;
}

/// The name of a dispatched event.
///
/// Two names are equal when their string values are equal, regardless of
/// whether they were built from a string or from a [`NamedEvent`].
#[derive(Clone)]
pub struct EventName {
    name: Arc<str>,
    origin: Option<Arc<dyn Any + Send + Sync>>,
}

impl EventName {
    /// Creates a name from a plain string.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            origin: None,
        }
    }

    /// Creates a name from an enumerated constant, keeping the original value.
    pub fn from_named<T: NamedEvent>(value: T) -> Self {
        Self {
            name: Arc::from(value.event_name()),
            origin: Some(Arc::new(value)),
        }
    }

    /// Returns the string value used for matching.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Returns `true` if this name was created from a [`NamedEvent`].
    pub fn is_named(&self) -> bool {
        self.origin.is_some()
    }

    /// Returns the original enumerated value if it has type `T`.
    pub fn origin<T: 'static>(&self) -> Option<&T> {
        self.origin.as_deref().and_then(|o| o.downcast_ref::<T>())
    }

    /// Returns `true` if this name was created from exactly `value`.
    ///
    /// A plain string name never compares equal to an enum value, even when
    /// their string forms agree.
    pub fn is<T: PartialEq + 'static>(&self, value: &T) -> bool {
        self.origin::<T>() == Some(value)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventName")
            .field("name", &self.name)
            .field("named", &self.is_named())
            .finish()
    }
}

impl PartialEq for EventName {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EventName {}

impl Hash for EventName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialEq<str> for EventName {
    fn eq(&self, other: &str) -> bool {
        &*self.name == other
    }
}

impl PartialEq<&str> for EventName {
    fn eq(&self, other: &&str) -> bool {
        &*self.name == *other
    }
}

impl From<&str> for EventName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EventName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&String> for EventName {
    fn from(name: &String) -> Self {
        Self::new(name.as_str())
    }
}

impl<T: NamedEvent> From<T> for EventName {
    fn from(value: T) -> Self {
        Self::from_named(value)
    }
}

impl Serialize for EventName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

// ============================================================================
// Event
// ============================================================================

/// A dispatched event: an immutable name and its payload.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    name: EventName,
    payload: Payload,
}

impl Event {
    /// Creates a new event.
    pub fn new(name: impl Into<EventName>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Creates a new event with an empty payload.
    pub fn named(name: impl Into<EventName>) -> Self {
        Self::new(name, Payload::new())
    }

    /// Returns the event name.
    pub fn name(&self) -> &EventName {
        &self.name
    }

    /// Returns the event payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Deserializes the payload into `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.payload.clone()))
    }

    /// Splits the event into its name and payload.
    pub fn into_parts(self) -> (EventName, Payload) {
        (self.name, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    enum Lifecycle {
        Created,
        Updated,
    }

    impl NamedEvent for Lifecycle {
        fn event_name(&self) -> &'static str {
            match self {
                Lifecycle::Created => "CREATED",
                Lifecycle::Updated => "UPDATED",
            }
        }
    }

    #[test]
    fn test_string_name_has_no_origin() {
        let name = EventName::from("cat_ate_a_fish");
        assert_eq!(name, "cat_ate_a_fish");
        assert!(!name.is_named());
        assert!(!name.is(&Lifecycle::Created));
    }

    #[test]
    fn test_enum_name_keeps_original_value() {
        let name = EventName::from(Lifecycle::Created);
        assert_eq!(name.as_str(), "CREATED");
        assert!(name.is(&Lifecycle::Created));
        assert!(!name.is(&Lifecycle::Updated));
        assert_eq!(name.origin::<Lifecycle>(), Some(&Lifecycle::Created));
        assert_eq!(name.origin::<String>(), None);
    }

    #[test]
    fn test_names_compare_by_string_value() {
        assert_eq!(EventName::from(Lifecycle::Updated), EventName::from("UPDATED"));
        assert_ne!(EventName::from("updated"), EventName::from("UPDATED"));
    }

    #[test]
    fn test_event_defaults_to_empty_payload() {
        let event = Event::named("TEST_EVENT");
        assert!(event.payload().is_empty());
    }

    #[test]
    fn test_payload_as_typed_value() {
        #[derive(Deserialize)]
        struct Order {
            id: u64,
        }

        let Value::Object(payload) = json!({ "id": 7 }) else {
            panic!("not an object");
        };
        let event = Event::new("order_placed", payload);
        let order: Order = event.payload_as().unwrap();
        assert_eq!(order.id, 7);
    }

    #[test]
    fn test_event_serializes_name_as_string() {
        let event = Event::named(Lifecycle::Created);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({ "name": "CREATED", "payload": {} }));
    }
}
