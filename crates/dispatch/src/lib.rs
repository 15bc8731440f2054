//! Fan-out dispatch of domain events to independent consumers.
//!
//! This crate provides:
//! - [`EventDispatcher`]: a registration table mapping event type tags to
//!   consumers, with per-consumer failure isolation
//! - [`AuditBridge`]: a consumer translating domain events into audit
//!   records appended to the event store
//! - [`CacheInvalidator`]: a consumer evicting cache entries affected by
//!   an event

pub mod audit;
pub mod dispatcher;
pub mod error;
pub mod invalidation;

pub use audit::{AuditBridge, decode_preserved_events};
pub use dispatcher::{EventConsumer, EventDispatcher};
pub use error::{ConsumerError, Result};
pub use invalidation::CacheInvalidator;
