//! Customer directory service.
//!
//! Exposes two faces of the same contract:
//!
//! - [`CustomerDirectory`] — the narrow read contract consumed by the order
//!   ledger and the saga orchestrator ("does this customer exist"), with an
//!   HTTP client implementation for cross-service calls.
//! - [`CustomerStore`] — the directory's own storage, serving the
//!   `customers-api` binary's CRUD surface.

pub mod config;
pub mod directory;
pub mod error;
pub mod model;
pub mod postgres;
pub mod routes;
pub mod store;

pub use directory::{CustomerDirectory, HttpCustomerDirectory};
pub use error::CustomerError;
pub use model::{Customer, CustomerUpdate, NewCustomer};
pub use postgres::PostgresCustomerStore;
pub use store::{CustomerStore, InMemoryCustomerStore};
