//! Conversion between events and records.
//!
//! A [`Serializer`] turns a `&dyn Event` into an opaque [`Record`] and back.
//! [`JsonSerializer`] is the reference implementation: every record holds the
//! JSON envelope `{"t": "<type tag>", "d": <event payload>}`, and decoding is
//! routed through a registry of bound event types owned by the serializer
//! instance.

use std::{collections::HashMap, fmt, sync::RwLock};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    event::{DomainEvent, Event, short_type_name},
    store::{History, Record},
};

/// Converts between events and their persisted form.
// ANCHOR: serializer_trait
pub trait Serializer: Send + Sync {
    /// Encode one event. The record's version is the event's version.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidEncoding`](crate::error::ErrorKind::InvalidEncoding)
    /// if the event cannot be encoded.
    fn marshal_event(&self, event: &dyn Event) -> Result<Record>;

    /// Decode one record back into the event type it was written from.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidEncoding`](crate::error::ErrorKind::InvalidEncoding)
    /// if the bytes cannot be decoded, or
    /// [`ErrorKind::UnboundEventType`](crate::error::ErrorKind::UnboundEventType)
    /// if the record's type tag is not known to this serializer.
    fn unmarshal_event(&self, record: &Record) -> Result<Box<dyn Event>>;

    /// Encode several events, preserving their order.
    ///
    /// # Errors
    ///
    /// Fails on the first event [`marshal_event`](Self::marshal_event)
    /// rejects.
    fn marshal_all(&self, events: &[Box<dyn Event>]) -> Result<History> {
        events
            .iter()
            .map(|event| self.marshal_event(event.as_ref()))
            .collect()
    }
}
// ANCHOR_END: serializer_trait

/// Persisted wrapper pairing a type tag with the encoded event.
#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "t")]
    event_type: String,
    #[serde(rename = "d")]
    data: Value,
}

type EncodeFn = fn(&dyn Event) -> serde_json::Result<Value>;
type DecodeFn = fn(Value) -> serde_json::Result<Box<dyn Event>>;

/// Encode and decode entry points for one bound event type.
#[derive(Clone, Copy)]
struct Binding {
    type_name: &'static str,
    encode: EncodeFn,
    decode: DecodeFn,
}

impl Binding {
    fn of<E>() -> Self
    where
        E: Event + Serialize + DeserializeOwned,
    {
        Self {
            type_name: short_type_name::<E>(),
            encode: encode::<E>,
            decode: decode::<E>,
        }
    }
}

fn encode<E>(event: &dyn Event) -> serde_json::Result<Value>
where
    E: Event + Serialize,
{
    match event.downcast_ref::<E>() {
        Some(event) => serde_json::to_value(event),
        None => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
            "tag `{}` is bound to {}, not to {event:?}",
            event.event_type(),
            short_type_name::<E>()
        ))),
    }
}

fn decode<E>(data: Value) -> serde_json::Result<Box<dyn Event>>
where
    E: Event + DeserializeOwned,
{
    let event: E = serde_json::from_value(data)?;
    Ok(Box::new(event))
}

/// JSON serializer with an explicit, instance-scoped type registry.
///
/// Event types must be bound before they can be marshaled or unmarshaled.
/// Binding is additive and may happen at any time, including after the
/// serializer has been handed to a repository; binding a second type under
/// an existing tag replaces the earlier binding.
///
/// ```ignore
/// let serializer = JsonSerializer::new();
/// serializer.bind::<OrderCreated>().bind::<OrderShipped>();
/// ```
#[derive(Default)]
pub struct JsonSerializer {
    bindings: RwLock<HashMap<&'static str, Binding>>,
}

impl JsonSerializer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `E` under its type tag.
    ///
    /// # Panics
    ///
    /// Panics if the registry lock was poisoned.
    pub fn bind<E>(&self) -> &Self
    where
        E: Event + DomainEvent + Serialize + DeserializeOwned,
    {
        let tag = E::type_tag();
        let previous = self
            .bindings
            .write()
            .expect("serializer registry lock poisoned")
            .insert(tag, Binding::of::<E>());
        if let Some(previous) = previous {
            tracing::debug!(
                event_type = tag,
                replaced = previous.type_name,
                "rebound event type"
            );
        } else {
            tracing::trace!(event_type = tag, "bound event type");
        }
        self
    }

    /// Whether a type is bound under `tag`.
    ///
    /// # Panics
    ///
    /// Panics if the registry lock was poisoned.
    #[must_use]
    pub fn is_bound(&self, tag: &str) -> bool {
        self.bindings
            .read()
            .expect("serializer registry lock poisoned")
            .contains_key(tag)
    }

    fn binding(&self, tag: &str) -> Option<Binding> {
        self.bindings
            .read()
            .expect("serializer registry lock poisoned")
            .get(tag)
            .copied()
    }
}

impl fmt::Debug for JsonSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&'static str> = self
            .bindings
            .read()
            .map(|bindings| bindings.keys().copied().collect())
            .unwrap_or_default();
        tags.sort_unstable();
        f.debug_struct("JsonSerializer")
            .field("bound", &tags)
            .finish()
    }
}

impl Serializer for JsonSerializer {
    fn marshal_event(&self, event: &dyn Event) -> Result<Record> {
        let event_type = event.event_type();
        let binding = self
            .binding(event_type)
            .ok_or_else(|| Error::unbound_event_type(event_type))?;

        let data = (binding.encode)(event)
            .map_err(|e| Error::invalid_encoding("unable to encode data", e))?;
        let bytes = serde_json::to_vec(&Envelope {
            event_type: event_type.to_string(),
            data,
        })
        .map_err(|e| Error::invalid_encoding("unable to encode event", e))?;

        Ok(Record {
            version: event.event_version(),
            data: bytes,
        })
    }

    fn unmarshal_event(&self, record: &Record) -> Result<Box<dyn Event>> {
        let envelope: Envelope = serde_json::from_slice(&record.data)
            .map_err(|e| Error::invalid_encoding("unable to unmarshal event", e))?;

        let binding = self
            .binding(&envelope.event_type)
            .ok_or_else(|| Error::unbound_event_type(&envelope.event_type))?;

        (binding.decode)(envelope.data).map_err(|e| {
            Error::invalid_encoding(
                format!(
                    "unable to unmarshal event data into {}",
                    binding.type_name
                ),
                e,
            )
        })
    }
}
