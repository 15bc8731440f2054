use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{AggregateId, EventQuery, NewStoredEvent, Result, StoredEvent, Version};

/// A stream of stored events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StoredEvent>> + Send>>;

/// Core trait for event store implementations.
///
/// An event store is an append-only log of audit events, partitioned into
/// per-aggregate streams. All implementations must be thread-safe
/// (Send + Sync), and the append path for one aggregate id must be a
/// single serialized check-and-append step while appends to different
/// aggregates proceed independently.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends candidate events to the given aggregate's stream.
    ///
    /// The append is atomic: either every candidate is stored with
    /// contiguous versions `expected_version + 1 ..= expected_version + n`,
    /// or nothing is stored. If the stream's current version differs from
    /// `expected_version` (0 for a stream that does not exist yet), the
    /// whole call fails with `ConcurrencyConflict`. An `expected_version`
    /// greater than zero against a nonexistent stream is also a conflict.
    ///
    /// An empty candidate list or an empty aggregate id is a caller error.
    ///
    /// Returns the stream's new current version.
    async fn append(
        &self,
        aggregate_id: &AggregateId,
        events: Vec<NewStoredEvent>,
        expected_version: Version,
    ) -> Result<Version>;

    /// Reads an aggregate's stream in version order, starting at
    /// `from_version` (inclusive).
    ///
    /// Returns an empty vec for an unknown aggregate id.
    async fn read(
        &self,
        aggregate_id: &AggregateId,
        from_version: Version,
    ) -> Result<Vec<StoredEvent>>;

    /// Reads every event ever appended, in global insertion order across
    /// the whole store (not grouped by aggregate, not merged by timestamp).
    async fn read_all(&self) -> Result<Vec<StoredEvent>>;

    /// Streams every event in global insertion order.
    async fn stream_all(&self) -> Result<EventStream>;

    /// Returns the current version of an aggregate's stream.
    ///
    /// Returns `Version::initial()` (0) for a stream with no events.
    async fn current_version(&self, aggregate_id: &AggregateId) -> Result<Version>;

    /// Retrieves events matching an audit query.
    async fn query(&self, query: EventQuery) -> Result<Vec<StoredEvent>>;
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends a single candidate event.
    async fn append_one(
        &self,
        aggregate_id: &AggregateId,
        event: NewStoredEvent,
        expected_version: Version,
    ) -> Result<Version> {
        self.append(aggregate_id, vec![event], expected_version).await
    }

    /// Checks whether an aggregate's stream has any events.
    async fn stream_exists(&self, aggregate_id: &AggregateId) -> Result<bool> {
        Ok(self.current_version(aggregate_id).await? > Version::initial())
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}
