//! Storage contract for the ledger.

use async_trait::async_trait;
use chrono::TimeDelta;
use common::{CustomerId, OrderId, Page, ProductId};

use crate::error::LedgerError;
use crate::model::{NewOrderItem, NewProduct, Order, OrderFilter, OrderWithItems, Product};

/// How long after creation a CONFIRMED order may still be canceled.
pub const CANCEL_WINDOW: TimeDelta = TimeDelta::minutes(10);

/// Atomic ledger operations.
///
/// Every mutating operation is all-or-nothing: any failure rolls back the
/// whole transaction and leaves no partial writes visible. Implementations
/// must hold exclusive locks on every row they mutate for the duration of
/// the operation; `create_order` acquires all referenced product rows in a
/// single locking read to avoid lock-ordering deadlocks between concurrent
/// orders sharing products.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Creates an order in status CREATED, snapshotting unit prices and
    /// decrementing stock for every item.
    ///
    /// Fails with `ProductNotFound` or `InsufficientStock` without touching
    /// any state. Does not validate the customer; that happens before the
    /// transaction (see `OrderService`).
    async fn create_order(
        &self,
        customer_id: CustomerId,
        items: &[NewOrderItem],
    ) -> Result<OrderWithItems, LedgerError>;

    /// CREATED→CONFIRMED. Confirming an already-CONFIRMED order is a no-op
    /// returning the current state; a CANCELED order is `InvalidOrderStatus`.
    async fn confirm_order(&self, order_id: OrderId) -> Result<OrderWithItems, LedgerError>;

    /// Cancels an order, restoring each item's quantity to product stock in
    /// the same transaction as the status change. Already-CANCELED is a
    /// no-op; a CONFIRMED order older than [`CANCEL_WINDOW`] fails with
    /// `CancelWindowExpired` and mutates nothing.
    async fn cancel_order(&self, order_id: OrderId) -> Result<OrderWithItems, LedgerError>;

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderWithItems>, LedgerError>;

    /// Cursor-paginated listing ordered by ascending id.
    async fn list_orders(&self, filter: &OrderFilter) -> Result<Page<Order>, LedgerError>;

    async fn create_product(&self, new: NewProduct) -> Result<Product, LedgerError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, LedgerError>;

    async fn list_products(
        &self,
        cursor: Option<i64>,
        limit: usize,
    ) -> Result<Page<Product>, LedgerError>;
}
