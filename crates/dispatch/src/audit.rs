//! Audit bridge: translates domain events into stored audit records.

use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use domain::{DomainEvent, ShopEvent};
use event_store::{
    EventStore, EventStoreError, EventStoreExt, NewStoredEvent, StoredEvent,
};
use serde::Serialize;

use crate::dispatcher::EventConsumer;
use crate::{ConsumerError, Result};

/// Metadata key under which the generic fallback preserves the original
/// event.
pub const ORIGINAL_EVENT_KEY: &str = "original_event";

/// Audit payload for ProductCreated.
#[derive(Debug, Serialize)]
struct ProductCreatedAudit {
    product_id: u64,
    name: String,
    category: String,
    price_cents: i64,
}

/// Audit payload for ProductUpdated.
#[derive(Debug, Serialize)]
struct ProductUpdatedAudit {
    product_id: u64,
    name: String,
    category: String,
}

/// Audit payload for ProductPriceChanged.
#[derive(Debug, Serialize)]
struct ProductPriceChangedAudit {
    product_id: u64,
    old_price_cents: i64,
    new_price_cents: i64,
}

/// Audit payload for ProductDeleted.
#[derive(Debug, Serialize)]
struct ProductDeletedAudit {
    product_id: u64,
}

/// Audit payload for CartCreated.
#[derive(Debug, Serialize)]
struct CartCreatedAudit {
    user_id: String,
}

/// Audit payload for ItemAdded.
#[derive(Debug, Serialize)]
struct ItemAddedAudit {
    user_id: String,
    product_id: u64,
    product_name: String,
    quantity: u32,
    unit_price_cents: i64,
    line_total_cents: i64,
}

/// Audit payload for ItemRemoved.
#[derive(Debug, Serialize)]
struct ItemRemovedAudit {
    user_id: String,
    product_id: u64,
}

/// Audit payload for CartCheckedOut.
#[derive(Debug, Serialize)]
struct CartCheckedOutAudit {
    user_id: String,
    total_cents: i64,
    item_count: usize,
}

/// Generic catch-all audit payload for event types without a specific
/// mapping. Loses typed querying but guarantees every event is audited;
/// the full original event is preserved in the record's metadata.
#[derive(Debug, Serialize)]
struct GenericAudit {
    event_type: &'static str,
    entity_kind: &'static str,
    entity_id: String,
}

/// Best-effort extraction of the entity kind and id an event concerns.
fn entity_ref(event: &ShopEvent) -> Option<(&'static str, String)> {
    match event {
        ShopEvent::ProductCreated(d) => Some(("Product", d.product_id.to_string())),
        ShopEvent::ProductUpdated(d) => Some(("Product", d.product_id.to_string())),
        ShopEvent::ProductPriceChanged(d) => Some(("Product", d.product_id.to_string())),
        ShopEvent::ProductDeleted(d) => Some(("Product", d.product_id.to_string())),
        ShopEvent::CartCreated(d) => Some(("Cart", d.user_id.to_string())),
        ShopEvent::ItemAdded(d) => Some(("Cart", d.user_id.to_string())),
        ShopEvent::ItemRemoved(d) => Some(("Cart", d.user_id.to_string())),
        ShopEvent::ItemQuantityChanged(d) => Some(("Cart", d.user_id.to_string())),
        ShopEvent::CartCheckedOut(d) => Some(("Cart", d.user_id.to_string())),
        ShopEvent::CartCleared(d) => Some(("Cart", d.user_id.to_string())),
    }
}

/// Derives the stream key and aggregate type for an event.
///
/// The mapping is total: every event resolves to some aggregate id, with
/// `domain-event-{id}` as the last-resort stream for events naming no
/// entity.
fn derive_aggregate(event: &DomainEvent) -> (AggregateId, &'static str) {
    match entity_ref(&event.event) {
        Some(("Product", id)) => (AggregateId::new(format!("product-{id}")), "Product"),
        Some((_, id)) => (AggregateId::new(format!("cart-{id}")), "Cart"),
        None => (
            AggregateId::new(format!("domain-event-{}", event.event_id)),
            "Domain",
        ),
    }
}

/// Dispatcher consumer appending an audit record to the event store for
/// every domain event it receives.
///
/// Tracks each stream's real current version and appends against it, so
/// audit streams obey the store's optimistic-concurrency contract. A
/// conflict from a racing bridge append is retried once against the
/// refreshed version; a second conflict surfaces as a consumer failure,
/// which the dispatcher contains.
pub struct AuditBridge {
    store: Arc<dyn EventStore>,
}

impl AuditBridge {
    /// Creates a bridge appending to the given store.
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    fn translate(&self, event: &DomainEvent) -> Result<(AggregateId, NewStoredEvent)> {
        let (aggregate_id, aggregate_type) = derive_aggregate(event);

        let mut metadata = std::collections::HashMap::new();
        let payload = match &event.event {
            ShopEvent::ProductCreated(d) => serde_json::to_value(ProductCreatedAudit {
                product_id: d.product_id.value(),
                name: d.name.clone(),
                category: d.category.clone(),
                price_cents: d.unit_price.cents(),
            })?,
            ShopEvent::ProductUpdated(d) => serde_json::to_value(ProductUpdatedAudit {
                product_id: d.product_id.value(),
                name: d.name.clone(),
                category: d.category.clone(),
            })?,
            ShopEvent::ProductPriceChanged(d) => serde_json::to_value(ProductPriceChangedAudit {
                product_id: d.product_id.value(),
                old_price_cents: d.old_price.cents(),
                new_price_cents: d.new_price.cents(),
            })?,
            ShopEvent::ProductDeleted(d) => serde_json::to_value(ProductDeletedAudit {
                product_id: d.product_id.value(),
            })?,
            ShopEvent::CartCreated(d) => serde_json::to_value(CartCreatedAudit {
                user_id: d.user_id.to_string(),
            })?,
            ShopEvent::ItemAdded(d) => serde_json::to_value(ItemAddedAudit {
                user_id: d.user_id.to_string(),
                product_id: d.product_id.value(),
                product_name: d.product_name.clone(),
                quantity: d.quantity,
                unit_price_cents: d.unit_price.cents(),
                line_total_cents: d.unit_price.times(d.quantity).cents(),
            })?,
            ShopEvent::ItemRemoved(d) => serde_json::to_value(ItemRemovedAudit {
                user_id: d.user_id.to_string(),
                product_id: d.product_id.value(),
            })?,
            ShopEvent::CartCheckedOut(d) => serde_json::to_value(CartCheckedOutAudit {
                user_id: d.user_id.to_string(),
                total_cents: d.total.cents(),
                item_count: d.item_count,
            })?,
            // No specific mapping: generic shape, original preserved in
            // metadata so nothing is lost.
            other => {
                tracing::debug!(
                    event_type = event.event_type(),
                    "no specific audit mapping, recording generic shape"
                );
                metrics::counter!("audit_translation_fallbacks").increment(1);

                let (entity_kind, entity_id) = entity_ref(other)
                    .unwrap_or_else(|| ("Domain", event.event_id.to_string()));
                metadata.insert(
                    ORIGINAL_EVENT_KEY.to_string(),
                    serde_json::to_value(&event.event)?,
                );
                serde_json::to_value(GenericAudit {
                    event_type: event.event_type(),
                    entity_kind,
                    entity_id,
                })?
            }
        };

        let candidate = NewStoredEvent {
            event_id: event.event_id,
            event_type: event.event_type().to_string(),
            aggregate_type: aggregate_type.to_string(),
            payload,
            occurred_on: event.occurred_on,
            actor: event.actor.clone(),
            metadata,
        };
        Ok((aggregate_id, candidate))
    }
}

#[async_trait]
impl EventConsumer for AuditBridge {
    fn name(&self) -> &'static str {
        "audit-bridge"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<()> {
        let (aggregate_id, candidate) = self.translate(event)?;

        let current = self.store.current_version(&aggregate_id).await?;
        match self
            .store
            .append_one(&aggregate_id, candidate.clone(), current)
            .await
        {
            Ok(_) => {}
            Err(EventStoreError::ConcurrencyConflict { .. }) => {
                // A concurrent bridge append for the same stream got in
                // first; refresh the version and retry once.
                let refreshed = self.store.current_version(&aggregate_id).await?;
                self.store
                    .append_one(&aggregate_id, candidate, refreshed)
                    .await?;
            }
            Err(err) => return Err(err.into()),
        }

        metrics::counter!("audit_events_appended").increment(1);
        Ok(())
    }
}

/// Decodes the original domain events preserved by the generic fallback
/// out of a slice of audit records.
///
/// Records without preserved originals are skipped; a record whose
/// preserved payload no longer decodes is dropped from the result with a
/// warning rather than failing the whole read.
pub fn decode_preserved_events(events: &[StoredEvent]) -> Vec<ShopEvent> {
    events
        .iter()
        .filter_map(|stored| {
            let raw = stored.metadata.get(ORIGINAL_EVENT_KEY)?;
            match serde_json::from_value(raw.clone()) {
                Ok(event) => Some(event),
                Err(err) => {
                    tracing::warn!(
                        event_id = %stored.event_id,
                        error = %err,
                        "dropping audit record with undecodable preserved event"
                    );
                    None
                }
            }
        })
        .collect()
}
