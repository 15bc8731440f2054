//! Domain layer for the cart event pipeline.
//!
//! This crate provides:
//! - The [`ShopEvent`] tagged union of domain facts and the
//!   [`DomainEvent`] record wrapping one with identity and actor metadata
//! - The [`EventBuffer`] staging area and the [`EventSource`] contract
//!   every aggregate entity implements
//! - The [`Product`] and [`Cart`] entities whose business methods stage
//!   events
//! - The [`WriteExecutor`] orchestration layer: mutate, persist, dispatch

pub mod buffer;
pub mod cart;
pub mod error;
pub mod event;
pub mod executor;
pub mod product;

pub use buffer::{EventBuffer, EventSource};
pub use cart::{Cart, CartError, CartItem};
pub use error::DomainError;
pub use event::{DomainEvent, Money, ProductId, ShopEvent, UserId};
pub use executor::{EventSink, Repository, RepositoryError, WriteExecutor};
pub use product::{Product, ProductError};
