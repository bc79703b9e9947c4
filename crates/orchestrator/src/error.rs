//! Step failure types.

use thiserror::Error;

/// Failure of one remote step.
#[derive(Debug, Error)]
pub enum StepError {
    /// The remote service answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The remote service could not be reached.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}
