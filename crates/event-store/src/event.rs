use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::Actor;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AggregateId;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Version number of a stored event within its aggregate stream, used for
/// optimistic concurrency control.
///
/// Versions are contiguous and 1-based: the first event on a stream gets
/// version 1, and a stream's current version equals its event count.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) of a stream with no events.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the first version (1), assigned to a stream's first event.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A durable audit record: the versioned projection of a domain event
/// inside the event store.
///
/// Stored events are immutable once written. The store assigns the
/// aggregate id and version at append time; everything else comes from the
/// [`NewStoredEvent`] candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    /// The stream this event belongs to.
    pub aggregate_id: AggregateId,

    /// Unique identifier of the originating domain event.
    pub event_id: EventId,

    /// The type tag of the event (e.g. "ItemAdded").
    pub event_type: String,

    /// The kind of aggregate (e.g. "Cart", "Product").
    pub aggregate_type: String,

    /// The serialized event payload.
    pub payload: serde_json::Value,

    /// Position of this event within its stream (1-based, contiguous).
    pub version: Version,

    /// When the originating domain event occurred.
    pub occurred_on: DateTime<Utc>,

    /// Who caused the originating event.
    pub actor: Actor,

    /// Additional key-value metadata about the event.
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A stored-event candidate: everything a [`StoredEvent`] carries except
/// the stream position, which the store assigns during append.
#[derive(Debug, Clone)]
pub struct NewStoredEvent {
    pub event_id: EventId,
    pub event_type: String,
    pub aggregate_type: String,
    pub payload: serde_json::Value,
    pub occurred_on: DateTime<Utc>,
    pub actor: Actor,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl NewStoredEvent {
    /// Creates a new candidate builder.
    pub fn builder() -> NewStoredEventBuilder {
        NewStoredEventBuilder::default()
    }

    /// Stamps the candidate into a stored event at the given stream
    /// position. Called by store implementations during append.
    pub fn into_stored(self, aggregate_id: AggregateId, version: Version) -> StoredEvent {
        StoredEvent {
            aggregate_id,
            event_id: self.event_id,
            event_type: self.event_type,
            aggregate_type: self.aggregate_type,
            payload: self.payload,
            version,
            occurred_on: self.occurred_on,
            actor: self.actor,
            metadata: self.metadata,
        }
    }
}

/// Builder for constructing stored-event candidates.
#[derive(Debug, Default)]
pub struct NewStoredEventBuilder {
    event_id: Option<EventId>,
    event_type: Option<String>,
    aggregate_type: Option<String>,
    payload: Option<serde_json::Value>,
    occurred_on: Option<DateTime<Utc>>,
    actor: Actor,
    metadata: HashMap<String, serde_json::Value>,
}

impl NewStoredEventBuilder {
    /// Sets the event ID. If not set, a new ID is generated.
    pub fn event_id(mut self, id: EventId) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Sets the event type tag.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the aggregate type.
    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets when the originating event occurred. Defaults to now.
    pub fn occurred_on(mut self, timestamp: DateTime<Utc>) -> Self {
        self.occurred_on = Some(timestamp);
        self
    }

    /// Sets the actor metadata.
    pub fn actor(mut self, actor: Actor) -> Self {
        self.actor = actor;
        self
    }

    /// Adds a metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Builds the candidate, returning None if a required field
    /// (event_type, aggregate_type, payload) is missing.
    pub fn try_build(self) -> Option<NewStoredEvent> {
        Some(NewStoredEvent {
            event_id: self.event_id.unwrap_or_default(),
            event_type: self.event_type?,
            aggregate_type: self.aggregate_type?,
            payload: self.payload?,
            occurred_on: self.occurred_on.unwrap_or_else(Utc::now),
            actor: self.actor,
            metadata: self.metadata,
        })
    }

    /// Builds the candidate.
    ///
    /// # Panics
    ///
    /// Panics if event_type, aggregate_type, or payload are not set.
    pub fn build(self) -> NewStoredEvent {
        self.try_build().expect("missing required candidate fields")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_new_creates_unique_ids() {
        assert_ne!(EventId::new(), EventId::new());
    }

    #[test]
    fn version_ordering() {
        let v1 = Version::new(1);
        let v2 = Version::new(2);
        assert!(v1 < v2);
        assert_eq!(v1.next(), v2);
    }

    #[test]
    fn version_initial_and_first() {
        assert_eq!(Version::initial().as_i64(), 0);
        assert_eq!(Version::first().as_i64(), 1);
        assert_eq!(Version::initial().next(), Version::first());
    }

    #[test]
    fn candidate_builder_stamps_into_stored_event() {
        let candidate = NewStoredEvent::builder()
            .event_type("ItemAdded")
            .aggregate_type("Cart")
            .payload_raw(serde_json::json!({"product_id": 42}))
            .actor(Actor::user("u1", "Alice"))
            .metadata("source", serde_json::json!("test"))
            .build();

        let stored = candidate.into_stored(AggregateId::new("cart-u1"), Version::first());
        assert_eq!(stored.aggregate_id.as_str(), "cart-u1");
        assert_eq!(stored.event_type, "ItemAdded");
        assert_eq!(stored.aggregate_type, "Cart");
        assert_eq!(stored.version, Version::first());
        assert_eq!(stored.actor.user_id.as_deref(), Some("u1"));
        assert_eq!(stored.metadata.get("source"), Some(&serde_json::json!("test")));
    }

    #[test]
    fn try_build_returns_none_on_missing_fields() {
        assert!(NewStoredEvent::builder().try_build().is_none());
        assert!(
            NewStoredEvent::builder()
                .event_type("X")
                .try_build()
                .is_none()
        );
    }
}
