//! Per-entity staging area for uncommitted domain events.

use crate::event::DomainEvent;

/// FIFO buffer accumulating the domain events an entity has raised since
/// the last clear.
///
/// Owned 1:1 by a single entity instance and never shared across
/// threads: it lives and dies with the entity in one logical write
/// operation. Insertion order is dispatch order.
#[derive(Debug, Default)]
pub struct EventBuffer {
    staged: Vec<DomainEvent>,
}

impl EventBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages an event at the end of the buffer.
    pub fn stage(&mut self, event: DomainEvent) {
        self.staged.push(event);
    }

    /// Returns the staged events in insertion order.
    pub fn pending(&self) -> &[DomainEvent] {
        &self.staged
    }

    /// Removes and returns all staged events, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.staged)
    }

    /// Discards all staged events.
    pub fn clear(&mut self) {
        self.staged.clear();
    }

    /// Returns the number of staged events.
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    /// Returns true if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }
}

/// The buffer contract every aggregate entity implements.
///
/// Business-rule methods stage events; the orchestration layer reads and
/// clears them immediately after the entity is persisted.
pub trait EventSource {
    /// Returns the entity's event buffer.
    fn buffer(&self) -> &EventBuffer;

    /// Returns the entity's event buffer mutably.
    fn buffer_mut(&mut self) -> &mut EventBuffer;

    /// Stages a domain event on this entity.
    fn stage_event(&mut self, event: DomainEvent) {
        self.buffer_mut().stage(event);
    }

    /// Returns the events staged since the last clear, in dispatch order.
    fn pending_events(&self) -> &[DomainEvent] {
        self.buffer().pending()
    }

    /// Removes and returns all staged events.
    fn take_events(&mut self) -> Vec<DomainEvent> {
        self.buffer_mut().take()
    }

    /// Discards all staged events.
    fn clear_events(&mut self) {
        self.buffer_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CartClearedData, ShopEvent, UserId};
    use common::Actor;

    fn cleared_event() -> DomainEvent {
        DomainEvent::record(
            Actor::system(),
            ShopEvent::CartCleared(CartClearedData {
                user_id: UserId::new("u1"),
            }),
        )
    }

    #[test]
    fn buffer_preserves_insertion_order() {
        let mut buffer = EventBuffer::new();
        let first = cleared_event();
        let second = cleared_event();
        let first_id = first.event_id;
        let second_id = second.event_id;

        buffer.stage(first);
        buffer.stage(second);

        let pending = buffer.pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].event_id, first_id);
        assert_eq!(pending[1].event_id, second_id);
    }

    #[test]
    fn clear_empties_the_buffer_and_new_events_stage_fresh() {
        let mut buffer = EventBuffer::new();
        buffer.stage(cleared_event());
        buffer.stage(cleared_event());
        buffer.stage(cleared_event());
        assert_eq!(buffer.len(), 3);

        buffer.clear();
        assert!(buffer.pending().is_empty());

        let after = cleared_event();
        let after_id = after.event_id;
        buffer.stage(after);
        assert_eq!(buffer.pending().len(), 1);
        assert_eq!(buffer.pending()[0].event_id, after_id);
    }

    #[test]
    fn take_drains_and_leaves_buffer_empty() {
        let mut buffer = EventBuffer::new();
        buffer.stage(cleared_event());
        buffer.stage(cleared_event());

        let taken = buffer.take();
        assert_eq!(taken.len(), 2);
        assert!(buffer.is_empty());
    }
}
