//! Order service: customer validation in front of the ledger store.

use common::{CustomerId, OrderId, Page, ProductId};
use customers::{Customer, CustomerDirectory};

use crate::error::LedgerError;
use crate::model::{NewOrderItem, NewProduct, Order, OrderFilter, OrderWithItems, Product};
use crate::store::LedgerStore;

/// Fronts a [`LedgerStore`] with request validation and customer resolution.
///
/// The customer must resolve via the directory collaborator before any
/// storage mutation; a failed resolution aborts with no state touched.
pub struct OrderService<L, C> {
    ledger: L,
    customers: C,
}

impl<L: LedgerStore, C: CustomerDirectory> OrderService<L, C> {
    pub fn new(ledger: L, customers: C) -> Self {
        Self { ledger, customers }
    }

    /// Resolves the customer, used by handlers that need the profile.
    pub async fn resolve_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Customer, LedgerError> {
        self.customers
            .find(customer_id)
            .await
            .map_err(LedgerError::CustomerUnavailable)?
            .ok_or(LedgerError::CustomerNotFound(customer_id))
    }

    #[tracing::instrument(skip(self, items), fields(customer_id = %customer_id))]
    pub async fn create_order(
        &self,
        customer_id: CustomerId,
        items: Vec<NewOrderItem>,
    ) -> Result<OrderWithItems, LedgerError> {
        if items.is_empty() {
            return Err(LedgerError::Validation(
                "order must contain at least one item".to_string(),
            ));
        }
        if items.iter().any(|i| i.qty <= 0) {
            return Err(LedgerError::Validation(
                "item quantity must be positive".to_string(),
            ));
        }

        self.resolve_customer(customer_id).await?;

        let order = self.ledger.create_order(customer_id, &items).await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.order.id,
            total_cents = order.order.total_cents,
            "order created"
        );
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    pub async fn confirm_order(&self, order_id: OrderId) -> Result<OrderWithItems, LedgerError> {
        let order = self.ledger.confirm_order(order_id).await?;
        metrics::counter!("orders_confirmed_total").increment(1);
        tracing::info!(order_id = %order_id, "order confirmed");
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<OrderWithItems, LedgerError> {
        let order = self.ledger.cancel_order(order_id).await?;
        metrics::counter!("orders_canceled_total").increment(1);
        tracing::info!(order_id = %order_id, "order canceled");
        Ok(order)
    }

    pub async fn get_order(
        &self,
        order_id: OrderId,
    ) -> Result<Option<OrderWithItems>, LedgerError> {
        self.ledger.get_order(order_id).await
    }

    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Page<Order>, LedgerError> {
        self.ledger.list_orders(filter).await
    }

    pub async fn create_product(&self, new: NewProduct) -> Result<Product, LedgerError> {
        if new.price_cents <= 0 {
            return Err(LedgerError::Validation(
                "price_cents must be positive".to_string(),
            ));
        }
        if new.stock < 0 {
            return Err(LedgerError::Validation(
                "stock must not be negative".to_string(),
            ));
        }
        self.ledger.create_product(new).await
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, LedgerError> {
        self.ledger.get_product(id).await
    }

    pub async fn list_products(
        &self,
        cursor: Option<i64>,
        limit: usize,
    ) -> Result<Page<Product>, LedgerError> {
        self.ledger.list_products(cursor, limit).await
    }
}
