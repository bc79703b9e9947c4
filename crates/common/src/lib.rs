//! Shared types for the order platform services.

pub mod auth;
pub mod pagination;
pub mod types;

pub use auth::{ServiceToken, require_service_token};
pub use pagination::Page;
pub use types::{CustomerId, OrderId, ProductId};
