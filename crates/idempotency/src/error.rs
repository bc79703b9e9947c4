//! Idempotency error types.

use thiserror::Error;

/// Errors from the idempotency store.
#[derive(Debug, Error)]
pub enum IdempotencyError {
    /// A record for this key already exists (unique-constraint race).
    #[error("idempotency key already exists")]
    DuplicateKey,

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored response could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
