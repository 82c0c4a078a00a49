//! Error type shared by every round-store backend.

use std::error::Error;
use thiserror::Error;

/// Result alias for round-store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error raised by the round store regardless of the backing implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("round store unavailable: {message}")]
    Unavailable {
        /// Human-readable description of the failure.
        message: String,
        /// Underlying backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A document could not be encoded before writing it.
    #[error("failed to encode document")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StoreError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
