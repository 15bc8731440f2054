//! Domain error types.

use thiserror::Error;

use crate::cart::CartError;
use crate::executor::RepositoryError;
use crate::product::ProductError;

/// Errors that can occur during a write operation.
///
/// Consumer failures during dispatch never appear here: they are
/// contained at the dispatcher boundary and cannot fail a committed
/// write.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A product business rule was violated.
    #[error("Product error: {0}")]
    Product(#[from] ProductError),

    /// A cart business rule was violated.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Persisting the entity failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// The write operation was cancelled before completing.
    #[error("Operation cancelled")]
    Cancelled,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
