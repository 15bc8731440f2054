//! Write-operation orchestration: mutate, persist, dispatch, clear.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::buffer::EventSource;
use crate::error::DomainError;
use crate::event::DomainEvent;

/// Error from an entity repository.
///
/// Entity persistence itself is an external collaborator; this is the
/// only shape of failure the orchestration layer needs from it.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RepositoryError(pub String);

/// Persistence seam for aggregate entities. Implementations live outside
/// this core.
#[async_trait]
pub trait Repository<E: EventSource>: Send + Sync {
    /// Persists the entity's current state.
    async fn save(&self, entity: &E) -> Result<(), RepositoryError>;
}

/// Delivery seam for staged events, implemented by the event dispatcher.
///
/// Delivery is infallible from the caller's perspective: the write is
/// already durable when events are handed over, so consumer failures are
/// contained on the other side of this boundary.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers the events, in order, to all interested consumers.
    async fn deliver_all(&self, events: &[DomainEvent]);
}

/// Orchestrates a single write operation against an aggregate entity.
///
/// Order is fixed: run the business operation (which stages events), then
/// persist, then hand the staged events to the sink, leaving the buffer
/// empty. If the operation or persistence fails, staged events are
/// discarded and nothing is dispatched.
pub struct WriteExecutor {
    sink: Arc<dyn EventSink>,
}

impl WriteExecutor {
    /// Creates an executor delivering to the given sink.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Runs one write operation end to end.
    ///
    /// Cancellation is honored before the mutation and before
    /// persistence; once the entity is persisted the staged events are
    /// always dispatched, since the write is already visible.
    #[tracing::instrument(skip_all)]
    pub async fn execute<E, R, F>(
        &self,
        entity: &mut E,
        repository: &R,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<(), DomainError>
    where
        E: EventSource + Send,
        R: Repository<E>,
        F: FnOnce(&mut E) -> Result<(), DomainError>,
    {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }

        if let Err(err) = operation(entity) {
            entity.clear_events();
            return Err(err);
        }

        if cancel.is_cancelled() {
            entity.clear_events();
            return Err(DomainError::Cancelled);
        }

        if let Err(err) = repository.save(entity).await {
            entity.clear_events();
            return Err(err.into());
        }

        let events = entity.take_events();
        if events.is_empty() {
            return Ok(());
        }

        tracing::debug!(count = events.len(), "write persisted, dispatching staged events");
        metrics::counter!("write_operations_completed").increment(1);
        self.sink.deliver_all(&events).await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::Cart;
    use crate::event::{Money, ProductId, UserId};
    use common::Actor;
    use tokio::sync::Mutex;

    struct OkRepository;

    #[async_trait]
    impl Repository<Cart> for OkRepository {
        async fn save(&self, _entity: &Cart) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    struct FailingRepository;

    #[async_trait]
    impl Repository<Cart> for FailingRepository {
        async fn save(&self, _entity: &Cart) -> Result<(), RepositoryError> {
            Err(RepositoryError("disk full".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn deliver_all(&self, events: &[DomainEvent]) {
            let mut delivered = self.delivered.lock().await;
            delivered.extend(events.iter().map(|e| e.event_type()));
        }
    }

    fn open_cart() -> Cart {
        let mut cart = Cart::new(UserId::new("u1"), Actor::system());
        cart.clear_events();
        cart
    }

    #[tokio::test]
    async fn execute_persists_then_dispatches_and_clears_buffer() {
        let sink = Arc::new(RecordingSink::default());
        let executor = WriteExecutor::new(sink.clone());
        let mut cart = open_cart();

        executor
            .execute(&mut cart, &OkRepository, &CancellationToken::new(), |cart| {
                cart.add_item(
                    ProductId::new(42),
                    "Widget",
                    2,
                    Money::from_cents(1500),
                    Actor::system(),
                )?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(cart.pending_events().is_empty());
        assert_eq!(*sink.delivered.lock().await, vec!["ItemAdded"]);
    }

    #[tokio::test]
    async fn failed_operation_discards_staged_events() {
        let sink = Arc::new(RecordingSink::default());
        let executor = WriteExecutor::new(sink.clone());
        let mut cart = open_cart();

        let result = executor
            .execute(&mut cart, &OkRepository, &CancellationToken::new(), |cart| {
                cart.add_item(
                    ProductId::new(1),
                    "Widget",
                    1,
                    Money::from_cents(100),
                    Actor::system(),
                )?;
                // Second mutation violates a business rule.
                cart.remove_item(ProductId::new(99), Actor::system())?;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(DomainError::Cart(_))));
        assert!(cart.pending_events().is_empty());
        assert!(sink.delivered.lock().await.is_empty());
    }

    #[tokio::test]
    async fn failed_persistence_dispatches_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let executor = WriteExecutor::new(sink.clone());
        let mut cart = open_cart();

        let result = executor
            .execute(
                &mut cart,
                &FailingRepository,
                &CancellationToken::new(),
                |cart| {
                    cart.add_item(
                        ProductId::new(1),
                        "Widget",
                        1,
                        Money::from_cents(100),
                        Actor::system(),
                    )?;
                    Ok(())
                },
            )
            .await;

        assert!(matches!(result, Err(DomainError::Repository(_))));
        assert!(sink.delivered.lock().await.is_empty());
        assert!(cart.pending_events().is_empty());
    }

    #[tokio::test]
    async fn cancelled_token_aborts_before_mutation() {
        let sink = Arc::new(RecordingSink::default());
        let executor = WriteExecutor::new(sink.clone());
        let mut cart = open_cart();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = executor
            .execute(&mut cart, &OkRepository, &cancel, |cart| {
                cart.add_item(
                    ProductId::new(1),
                    "Widget",
                    1,
                    Money::from_cents(100),
                    Actor::system(),
                )?;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(DomainError::Cancelled)));
        assert!(cart.items().is_empty());
        assert!(sink.delivered.lock().await.is_empty());
    }

    #[tokio::test]
    async fn operation_staging_nothing_skips_the_sink() {
        let sink = Arc::new(RecordingSink::default());
        let executor = WriteExecutor::new(sink.clone());
        let mut cart = open_cart();

        executor
            .execute(&mut cart, &OkRepository, &CancellationToken::new(), |_| Ok(()))
            .await
            .unwrap();

        assert!(sink.delivered.lock().await.is_empty());
    }
}
