use thiserror::Error;

/// Errors that can occur in a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend failed to complete the operation.
    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
