//! Idempotency coordination for state-changing operations.
//!
//! A caller-supplied key moves through `absent → processing → completed`.
//! The unique constraint on the key is the mutual-exclusion primitive: a
//! racing duplicate insert loses and is answered with a conflict, and a
//! completed key replays its stored response verbatim without re-invoking
//! the wrapped operation.

pub mod coordinator;
pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use coordinator::IdempotencyCoordinator;
pub use error::IdempotencyError;
pub use memory::InMemoryIdempotencyStore;
pub use model::{IdempotencyRecord, KeyStatus, StoredResponse};
pub use postgres::PostgresIdempotencyStore;
pub use store::IdempotencyStore;
