//! Ledger error types.
//!
//! Domain failures are distinct, structured variants carrying typed fields
//! (never product ids embedded in message text); the service boundary maps
//! them to status codes.

use common::{CustomerId, OrderId, ProductId};
use customers::CustomerError;
use thiserror::Error;

use crate::model::OrderStatus;

/// Errors from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The customer id did not resolve in the directory.
    #[error("customer not found: {0}")]
    CustomerNotFound(CustomerId),

    /// The customer directory could not answer the lookup.
    #[error("customer directory unavailable")]
    CustomerUnavailable(#[source] CustomerError),

    /// A referenced product does not exist.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// Requested quantity exceeds available stock.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// The sku is already registered.
    #[error("sku is already registered: {0}")]
    DuplicateSku(String),

    /// No order with this id.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order's current status does not allow the transition.
    #[error("order {order_id} cannot transition from {status}")]
    InvalidOrderStatus {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// A confirmed order can only be canceled within the cancellation window.
    #[error("cancellation window expired for order {order_id}")]
    CancelWindowExpired { order_id: OrderId },

    /// Malformed request input.
    #[error("{0}")]
    Validation(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
