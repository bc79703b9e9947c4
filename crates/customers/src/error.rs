//! Customer directory error types.

use thiserror::Error;

/// Errors from the directory store or from remote directory lookups.
#[derive(Debug, Error)]
pub enum CustomerError {
    /// The email is already registered to another customer.
    #[error("email is already registered")]
    DuplicateEmail,

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The remote directory answered with an unexpected status.
    #[error("customer directory returned status {status}")]
    Unavailable { status: u16 },

    /// The remote directory could not be reached (connect error, timeout).
    #[error("customer directory unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}
