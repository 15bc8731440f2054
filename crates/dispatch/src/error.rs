//! Consumer error types.

use thiserror::Error;

/// A failure inside a registered consumer.
///
/// These are caught and logged at the dispatcher boundary. They never
/// reach the caller that triggered dispatch: the originating write is
/// already durable, so a consumer failure can only mean a missing side
/// effect, not a rolled-back write.
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// The event store rejected or failed an append.
    #[error("Event store error: {0}")]
    Store(#[from] event_store::EventStoreError),

    /// An event payload could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A consumer-specific failure.
    #[error("{0}")]
    Failed(String),
}

/// Result type for consumer operations.
pub type Result<T> = std::result::Result<T, ConsumerError>;
