//! Event dispatcher with an explicit registration table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{DomainEvent, EventSink, ShopEvent};

use crate::Result;

/// A consumer of dispatched domain events.
#[async_trait]
pub trait EventConsumer: Send + Sync {
    /// Returns the consumer's identity, used in failure logs.
    fn name(&self) -> &'static str;

    /// Handles one event. A returned error is contained at the
    /// dispatcher boundary.
    async fn handle(&self, event: &DomainEvent) -> Result<()>;
}

/// Fan-out broadcaster delivering each event to every consumer
/// registered for that event's type.
///
/// The registration table is built once at startup; dispatch itself is
/// stateless per call. Registration order is invocation order for a
/// given type. Each consumer invocation is wrapped individually: a
/// failing consumer is logged and skipped, and neither stops the
/// remaining consumers nor propagates to the caller.
#[derive(Default)]
pub struct EventDispatcher {
    consumers: HashMap<&'static str, Vec<Arc<dyn EventConsumer>>>,
}

impl EventDispatcher {
    /// Creates a dispatcher with no registrations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a consumer for one event type. The same consumer may be
    /// registered for several types, and several consumers for one type.
    pub fn register(&mut self, event_type: &'static str, consumer: Arc<dyn EventConsumer>) {
        self.consumers.entry(event_type).or_default().push(consumer);
    }

    /// Registers a consumer for every domain event type.
    pub fn register_for_all(&mut self, consumer: Arc<dyn EventConsumer>) {
        for event_type in ShopEvent::ALL_TYPES {
            self.register(event_type, Arc::clone(&consumer));
        }
    }

    /// Returns how many consumers are registered for an event type.
    pub fn consumer_count(&self, event_type: &str) -> usize {
        self.consumers.get(event_type).map_or(0, Vec::len)
    }

    /// Delivers one event to every consumer registered for its type.
    ///
    /// Always succeeds from the caller's perspective.
    #[tracing::instrument(skip_all, fields(event_type = event.event_type()))]
    pub async fn dispatch(&self, event: &DomainEvent) {
        let Some(consumers) = self.consumers.get(event.event_type()) else {
            tracing::debug!("no consumers registered for event type");
            return;
        };

        for consumer in consumers {
            match consumer.handle(event).await {
                Ok(()) => {
                    metrics::counter!("dispatch_deliveries").increment(1);
                }
                Err(err) => {
                    metrics::counter!("dispatch_consumer_failures").increment(1);
                    tracing::error!(
                        consumer = consumer.name(),
                        event_id = %event.event_id,
                        error = %err,
                        "consumer failed, continuing with remaining consumers"
                    );
                }
            }
        }
    }

    /// Delivers each event in order. A failure while handling event *i*
    /// does not prevent dispatch of event *i + 1*.
    pub async fn dispatch_all(&self, events: &[DomainEvent]) {
        for event in events {
            self.dispatch(event).await;
        }
    }
}

#[async_trait]
impl EventSink for EventDispatcher {
    async fn deliver_all(&self, events: &[DomainEvent]) {
        self.dispatch_all(events).await;
    }
}
