use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;

use crate::{
    AggregateId, EventQuery, EventStoreError, NewStoredEvent, Result, StoredEvent, Version,
    store::{EventStore, EventStream},
};

/// In-memory event store.
///
/// Streams live in a concurrent map keyed by aggregate id, so the
/// check-and-append critical section for one aggregate does not block
/// appends to unrelated aggregates. A separate log records global
/// insertion order for cross-aggregate audit reads.
///
/// Constructed explicitly and injected where needed; there is no
/// process-global instance.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<DashMap<AggregateId, Vec<StoredEvent>>>,
    log: Arc<Mutex<Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub fn event_count(&self) -> usize {
        self.log.lock().len()
    }

    /// Returns the number of aggregate streams with at least one event.
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Clears all streams and the global log.
    pub fn clear(&self) {
        self.streams.clear();
        self.log.lock().clear();
    }

    fn stamp(
        aggregate_id: &AggregateId,
        expected_version: Version,
        events: Vec<NewStoredEvent>,
    ) -> Vec<StoredEvent> {
        events
            .into_iter()
            .enumerate()
            .map(|(i, candidate)| {
                let version = Version::new(expected_version.as_i64() + 1 + i as i64);
                candidate.into_stored(aggregate_id.clone(), version)
            })
            .collect()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        aggregate_id: &AggregateId,
        events: Vec<NewStoredEvent>,
        expected_version: Version,
    ) -> Result<Version> {
        if aggregate_id.is_empty() {
            return Err(EventStoreError::EmptyAggregateId);
        }
        if events.is_empty() {
            return Err(EventStoreError::EmptyAppend(aggregate_id.clone()));
        }

        let appended = events.len() as u64;
        let new_version = Version::new(expected_version.as_i64() + appended as i64);

        // The entry guard is the per-aggregate serialization point: the
        // version check and the append happen as one step, and the global
        // log is extended before the guard is released so global order
        // matches per-stream commit order.
        match self.streams.entry(aggregate_id.clone()) {
            Entry::Occupied(mut occupied) => {
                let actual = Version::new(occupied.get().len() as i64);
                if actual != expected_version {
                    tracing::warn!(
                        aggregate_id = %aggregate_id,
                        expected = %expected_version,
                        actual = %actual,
                        "append rejected: version mismatch"
                    );
                    return Err(EventStoreError::ConcurrencyConflict {
                        aggregate_id: aggregate_id.clone(),
                        expected: expected_version,
                        actual,
                    });
                }
                let stored = Self::stamp(aggregate_id, expected_version, events);
                occupied.get_mut().extend(stored.iter().cloned());
                self.log.lock().extend(stored);
            }
            Entry::Vacant(vacant) => {
                if expected_version != Version::initial() {
                    tracing::warn!(
                        aggregate_id = %aggregate_id,
                        expected = %expected_version,
                        "append rejected: stream does not exist"
                    );
                    return Err(EventStoreError::ConcurrencyConflict {
                        aggregate_id: aggregate_id.clone(),
                        expected: expected_version,
                        actual: Version::initial(),
                    });
                }
                let stored = Self::stamp(aggregate_id, expected_version, events);
                self.log.lock().extend(stored.iter().cloned());
                vacant.insert(stored);
            }
        }

        metrics::counter!("event_store_events_appended").increment(appended);
        Ok(new_version)
    }

    async fn read(
        &self,
        aggregate_id: &AggregateId,
        from_version: Version,
    ) -> Result<Vec<StoredEvent>> {
        Ok(self
            .streams
            .get(aggregate_id)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|e| e.version >= from_version)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn read_all(&self) -> Result<Vec<StoredEvent>> {
        Ok(self.log.lock().clone())
    }

    async fn stream_all(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.log.lock().clone();
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn current_version(&self, aggregate_id: &AggregateId) -> Result<Version> {
        Ok(self
            .streams
            .get(aggregate_id)
            .map(|stream| Version::new(stream.len() as i64))
            .unwrap_or_else(Version::initial))
    }

    async fn query(&self, query: EventQuery) -> Result<Vec<StoredEvent>> {
        let events = self.log.lock().clone();
        let matched = events.into_iter().filter(|e| query.matches(e));

        let matched: Vec<_> = matched.skip(query.offset.unwrap_or(0)).collect();
        let matched = if let Some(limit) = query.limit {
            matched.into_iter().take(limit).collect()
        } else {
            matched
        };

        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Actor;

    fn candidate(event_type: &str, aggregate_type: &str) -> NewStoredEvent {
        NewStoredEvent::builder()
            .event_type(event_type)
            .aggregate_type(aggregate_type)
            .payload_raw(serde_json::json!({"test": true}))
            .actor(Actor::system())
            .build()
    }

    #[tokio::test]
    async fn append_assigns_contiguous_versions_from_one() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("cart-u1");

        let batch = vec![candidate("A", "Cart"), candidate("B", "Cart"), candidate("C", "Cart")];
        let version = store.append(&id, batch, Version::initial()).await.unwrap();
        assert_eq!(version, Version::new(3));

        let more = vec![candidate("D", "Cart"), candidate("E", "Cart")];
        let version = store.append(&id, more, Version::new(3)).await.unwrap();
        assert_eq!(version, Version::new(5));

        let events = store.read(&id, Version::initial()).await.unwrap();
        assert_eq!(events.len(), 5);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.version, Version::new(i as i64 + 1));
        }
    }

    #[tokio::test]
    async fn append_rejects_stale_expected_version_without_changes() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("product-7");

        store
            .append(&id, vec![candidate("ProductCreated", "Product")], Version::initial())
            .await
            .unwrap();
        let before = store.read(&id, Version::initial()).await.unwrap();

        let result = store
            .append(&id, vec![candidate("ProductUpdated", "Product")], Version::initial())
            .await;
        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { expected, actual, .. })
                if expected == Version::initial() && actual == Version::first()
        ));

        let after = store.read(&id, Version::initial()).await.unwrap();
        assert_eq!(before.len(), after.len());
        assert_eq!(before[0].event_id, after[0].event_id);
    }

    #[tokio::test]
    async fn append_conflict_then_success_with_correct_version() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("x");

        store
            .append(&id, vec![candidate("EventA", "Cart")], Version::initial())
            .await
            .unwrap();

        let rejected = store
            .append(&id, vec![candidate("EventB", "Cart")], Version::initial())
            .await;
        assert!(rejected.is_err());
        assert_eq!(store.read(&id, Version::initial()).await.unwrap().len(), 1);

        let version = store
            .append(&id, vec![candidate("EventB", "Cart")], Version::first())
            .await
            .unwrap();
        assert_eq!(version, Version::new(2));

        let events = store.read(&id, Version::initial()).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].version, Version::new(1));
        assert_eq!(events[1].version, Version::new(2));
    }

    #[tokio::test]
    async fn nonzero_expected_version_against_missing_stream_conflicts() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("cart-nobody");

        let result = store
            .append(&id, vec![candidate("ItemAdded", "Cart")], Version::new(3))
            .await;
        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { actual, .. })
                if actual == Version::initial()
        ));
        assert_eq!(store.event_count(), 0);
    }

    #[tokio::test]
    async fn empty_append_is_a_caller_error() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("cart-u1");

        let result = store.append(&id, vec![], Version::initial()).await;
        assert!(matches!(result, Err(EventStoreError::EmptyAppend(_))));
    }

    #[tokio::test]
    async fn empty_aggregate_id_is_a_caller_error() {
        let store = InMemoryEventStore::new();

        let result = store
            .append(&AggregateId::new(""), vec![candidate("A", "Cart")], Version::initial())
            .await;
        assert!(matches!(result, Err(EventStoreError::EmptyAggregateId)));
    }

    #[tokio::test]
    async fn stream_exists_tracks_first_append() {
        use crate::store::EventStoreExt;

        let store = InMemoryEventStore::new();
        let id = AggregateId::new("cart-u1");
        assert!(!store.stream_exists(&id).await.unwrap());

        store
            .append_one(&id, candidate("CartCreated", "Cart"), Version::initial())
            .await
            .unwrap();
        assert!(store.stream_exists(&id).await.unwrap());
        assert!(!store.stream_exists(&AggregateId::new("cart-u2")).await.unwrap());
    }

    #[tokio::test]
    async fn read_unknown_aggregate_returns_empty() {
        let store = InMemoryEventStore::new();
        let events = store
            .read(&AggregateId::new("cart-missing"), Version::initial())
            .await
            .unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn read_from_version_skips_earlier_events() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("cart-u1");

        let batch = vec![candidate("A", "Cart"), candidate("B", "Cart"), candidate("C", "Cart")];
        store.append(&id, batch, Version::initial()).await.unwrap();

        let from_v2 = store.read(&id, Version::new(2)).await.unwrap();
        assert_eq!(from_v2.len(), 2);
        assert_eq!(from_v2[0].version, Version::new(2));
        assert_eq!(from_v2[1].version, Version::new(3));
    }

    #[tokio::test]
    async fn read_all_preserves_global_insertion_order() {
        let store = InMemoryEventStore::new();
        let cart = AggregateId::new("cart-u1");
        let product = AggregateId::new("product-42");

        store
            .append(&cart, vec![candidate("CartCreated", "Cart")], Version::initial())
            .await
            .unwrap();
        store
            .append(&product, vec![candidate("ProductCreated", "Product")], Version::initial())
            .await
            .unwrap();
        store
            .append(&cart, vec![candidate("ItemAdded", "Cart")], Version::first())
            .await
            .unwrap();

        let all = store.read_all().await.unwrap();
        let types: Vec<_> = all.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["CartCreated", "ProductCreated", "ItemAdded"]);
    }

    #[tokio::test]
    async fn concurrent_appends_to_distinct_aggregates_all_succeed() {
        let store = InMemoryEventStore::new();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let id = AggregateId::new(format!("cart-u{i}"));
                store
                    .append(&id, vec![candidate("CartCreated", "Cart")], Version::initial())
                    .await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(store.event_count(), 16);
        assert_eq!(store.stream_count(), 16);
    }

    #[tokio::test]
    async fn concurrent_appends_to_same_aggregate_let_exactly_one_win() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("cart-contended");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append(&id, vec![candidate("CartCreated", "Cart")], Version::initial())
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(store.read(&id, Version::initial()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn query_filters_by_type_and_version() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new("cart-u1");

        let batch = vec![
            candidate("CartCreated", "Cart"),
            candidate("ItemAdded", "Cart"),
            candidate("ItemAdded", "Cart"),
        ];
        store.append(&id, batch, Version::initial()).await.unwrap();

        let added = store
            .query(EventQuery::for_event_type("ItemAdded"))
            .await
            .unwrap();
        assert_eq!(added.len(), 2);

        let ranged = store
            .query(
                EventQuery::for_aggregate(id)
                    .from_version(Version::new(2))
                    .to_version(Version::new(2)),
            )
            .await
            .unwrap();
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].version, Version::new(2));
    }

    #[tokio::test]
    async fn stream_all_yields_every_event() {
        use futures_util::StreamExt;

        let store = InMemoryEventStore::new();
        store
            .append(
                &AggregateId::new("a"),
                vec![candidate("E1", "Cart")],
                Version::initial(),
            )
            .await
            .unwrap();
        store
            .append(
                &AggregateId::new("b"),
                vec![candidate("E2", "Product")],
                Version::initial(),
            )
            .await
            .unwrap();

        let stream = store.stream_all().await.unwrap();
        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 2);
    }
}
