//! Shared types used across the cart event pipeline.

pub mod types;

pub use types::{Actor, AggregateId};
