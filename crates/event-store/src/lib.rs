pub mod error;
pub mod event;
pub mod memory;
pub mod query;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventId, NewStoredEvent, NewStoredEventBuilder, StoredEvent, Version};
pub use memory::InMemoryEventStore;
pub use query::EventQuery;
pub use store::{EventStore, EventStoreExt, EventStream};
