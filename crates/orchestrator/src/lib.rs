//! Saga orchestrator.
//!
//! Drives the full purchase flow across the customer directory and the
//! orders-api: validate the customer, create the order, confirm it under an
//! idempotency key. Steps run strictly in order; the first failure aborts
//! the saga and is surfaced as-is, with no compensation and no retries.

pub mod clients;
pub mod config;
pub mod error;
pub mod http;
pub mod routes;
pub mod saga;

pub use clients::{InMemoryOrdersClient, OrderLine, OrderSummary, OrdersClient};
pub use error::StepError;
pub use http::HttpOrdersClient;
pub use saga::{OrchestrationRequest, Orchestrator, SagaFailure, SagaSuccess};
