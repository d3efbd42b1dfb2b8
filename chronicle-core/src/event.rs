//! Domain events.
//!
//! An [`Event`] is an immutable, versioned, timestamped fact about one
//! aggregate. Events travel through the repository as `Box<dyn Event>` so a
//! single aggregate can fold many unrelated event types; aggregates recover
//! the concrete type with [`downcast_ref`](trait.Event.html#method.downcast_ref).
//!
//! The type tag that routes stored bytes back to a concrete type lives on
//! [`DomainEvent`]. It defaults to the structural type name and can be
//! overridden per type. [`EventKind`] exposes the same tag on trait objects
//! and is implemented automatically.

use std::any::Any;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point in time at which an event occurred.
pub type Timestamp = DateTime<Utc>;

/// Returns the bare name of `T`: module path and generic arguments stripped.
///
/// ```
/// use chronicle_core::event::short_type_name;
///
/// struct OrderShipped;
/// assert_eq!(short_type_name::<OrderShipped>(), "OrderShipped");
/// assert_eq!(short_type_name::<Vec<String>>(), "Vec");
/// ```
#[must_use]
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Static type tag of an event type.
///
/// Implement this with an empty body to use the structural type name, or
/// override [`DomainEvent::type_tag`] to pin an explicit tag that survives
/// renames:
///
/// ```
/// use chronicle_core::event::DomainEvent;
///
/// struct Renamed;
/// impl DomainEvent for Renamed {}
///
/// struct Shipped;
/// impl DomainEvent for Shipped {
///     fn type_tag() -> &'static str {
///         "order.shipped"
///     }
/// }
///
/// assert_eq!(Renamed::type_tag(), "Renamed");
/// assert_eq!(Shipped::type_tag(), "order.shipped");
/// ```
pub trait DomainEvent {
    fn type_tag() -> &'static str {
        short_type_name::<Self>()
    }
}

/// Object-safe view of [`DomainEvent`].
///
/// **You never need to implement this trait yourself** - it is available on
/// every `'static` type that implements [`DomainEvent`], and always agrees
/// with [`DomainEvent::type_tag`].
pub trait EventKind {
    /// The tag used for serialization dispatch.
    fn event_type(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

impl<T: DomainEvent + Any> EventKind for T {
    fn event_type(&self) -> &'static str {
        T::type_tag()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A fact that happened to one aggregate.
///
/// Versions start at 1 and increase strictly within one aggregate. Derive it
/// with `#[derive(Event)]` or implement it by hand:
///
/// ```
/// use chrono::{DateTime, Utc};
/// use chronicle_core::event::{DomainEvent, Event};
///
/// #[derive(Debug)]
/// struct Created {
///     id: String,
///     version: u64,
///     at: DateTime<Utc>,
/// }
///
/// impl DomainEvent for Created {}
///
/// impl Event for Created {
///     fn aggregate_id(&self) -> &str {
///         &self.id
///     }
///
///     fn event_version(&self) -> u64 {
///         self.version
///     }
///
///     fn event_at(&self) -> DateTime<Utc> {
///         self.at
///     }
/// }
/// ```
pub trait Event: EventKind + Any + std::fmt::Debug + Send + Sync {
    fn aggregate_id(&self) -> &str;

    fn event_version(&self) -> u64;

    /// When the event occurred.
    fn event_at(&self) -> DateTime<Utc>;
}

impl dyn Event {
    /// Borrow the concrete event if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Event>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    #[must_use]
    pub fn is<T: Event>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Reusable event attributes.
///
/// Flatten it into an event struct to share the id/version/timestamp fields:
///
/// ```ignore
/// #[derive(Debug, Serialize, Deserialize, Event)]
/// struct OrderShipped {
///     #[serde(flatten)]
///     #[event(model)]
///     model: EventModel,
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventModel {
    pub id: String,
    pub version: u64,
    pub at: DateTime<Utc>,
}

impl EventModel {
    pub fn new(id: impl Into<String>, version: u64, at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            version,
            at,
        }
    }

    #[must_use]
    pub fn aggregate_id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn event_version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn event_at(&self) -> DateTime<Utc> {
        self.at
    }
}
