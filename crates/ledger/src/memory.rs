//! In-memory ledger for testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId, Page, ProductId};

use crate::error::LedgerError;
use crate::model::{
    NewOrderItem, NewProduct, Order, OrderFilter, OrderItem, OrderStatus, OrderWithItems, Product,
};
use crate::store::{CANCEL_WINDOW, LedgerStore};

#[derive(Debug, Default)]
struct State {
    products: BTreeMap<i64, Product>,
    orders: BTreeMap<i64, Order>,
    items: Vec<OrderItem>,
    next_product_id: i64,
    next_order_id: i64,
}

impl State {
    fn items_for(&self, order_id: OrderId) -> Vec<OrderItem> {
        self.items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect()
    }
}

/// In-memory implementation of [`LedgerStore`].
///
/// A single mutex over the whole state serializes operations, standing in
/// for row-level locking: each operation observes and mutates a consistent
/// snapshot, and failed operations return before mutating anything, which
/// preserves the all-or-nothing property.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<State>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a product with a fixed id, bypassing the create path.
    pub fn insert_product(&self, product: Product) {
        let mut state = self.state.lock().unwrap();
        state.next_product_id = state.next_product_id.max(product.id.get());
        state.products.insert(product.id.get(), product);
    }

    /// Rewrites an order's creation time. Test hook for exercising the
    /// cancellation window.
    pub fn set_order_created_at(&self, order_id: OrderId, created_at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        if let Some(order) = state.orders.get_mut(&order_id.get()) {
            order.created_at = created_at;
        }
    }

    /// Current stock of a product, if it exists.
    pub fn stock_of(&self, id: ProductId) -> Option<i64> {
        self.state
            .lock()
            .unwrap()
            .products
            .get(&id.get())
            .map(|p| p.stock)
    }

    /// Number of orders ever created.
    pub fn order_count(&self) -> usize {
        self.state.lock().unwrap().orders.len()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn create_order(
        &self,
        customer_id: CustomerId,
        items: &[NewOrderItem],
    ) -> Result<OrderWithItems, LedgerError> {
        let mut state = self.state.lock().unwrap();

        // Validate every line before mutating anything.
        let mut remaining: HashMap<i64, i64> = HashMap::new();
        let mut total_cents = 0i64;
        let mut lines = Vec::with_capacity(items.len());

        for item in items {
            let product = state
                .products
                .get(&item.product_id.get())
                .ok_or(LedgerError::ProductNotFound(item.product_id))?;

            let available = remaining
                .entry(item.product_id.get())
                .or_insert(product.stock);
            if *available < item.qty {
                return Err(LedgerError::InsufficientStock {
                    product_id: item.product_id,
                    requested: item.qty,
                    available: *available,
                });
            }
            *available -= item.qty;

            let subtotal_cents = product.price_cents * item.qty;
            total_cents += subtotal_cents;
            lines.push((item.product_id, item.qty, product.price_cents, subtotal_cents));
        }

        state.next_order_id += 1;
        let order = Order {
            id: OrderId::new(state.next_order_id),
            customer_id,
            status: OrderStatus::Created,
            total_cents,
            created_at: Utc::now(),
        };
        state.orders.insert(order.id.get(), order.clone());

        let mut order_items = Vec::with_capacity(lines.len());
        for (product_id, qty, unit_price_cents, subtotal_cents) in lines {
            if let Some(product) = state.products.get_mut(&product_id.get()) {
                product.stock -= qty;
            }
            let item = OrderItem {
                order_id: order.id,
                product_id,
                qty,
                unit_price_cents,
                subtotal_cents,
            };
            state.items.push(item.clone());
            order_items.push(item);
        }

        Ok(OrderWithItems {
            order,
            items: order_items,
        })
    }

    async fn confirm_order(&self, order_id: OrderId) -> Result<OrderWithItems, LedgerError> {
        let mut state = self.state.lock().unwrap();
        let order = state
            .orders
            .get_mut(&order_id.get())
            .ok_or(LedgerError::OrderNotFound(order_id))?;

        match order.status {
            OrderStatus::Confirmed => {}
            OrderStatus::Canceled => {
                return Err(LedgerError::InvalidOrderStatus {
                    order_id,
                    status: order.status,
                });
            }
            OrderStatus::Created => order.status = OrderStatus::Confirmed,
        }

        let order = order.clone();
        let items = state.items_for(order_id);
        Ok(OrderWithItems { order, items })
    }

    async fn cancel_order(&self, order_id: OrderId) -> Result<OrderWithItems, LedgerError> {
        let mut state = self.state.lock().unwrap();
        let order = state
            .orders
            .get(&order_id.get())
            .ok_or(LedgerError::OrderNotFound(order_id))?
            .clone();
        let items = state.items_for(order_id);

        match order.status {
            OrderStatus::Canceled => return Ok(OrderWithItems { order, items }),
            OrderStatus::Confirmed => {
                if Utc::now() - order.created_at > CANCEL_WINDOW {
                    return Err(LedgerError::CancelWindowExpired { order_id });
                }
            }
            OrderStatus::Created => {}
        }

        for item in &items {
            if let Some(product) = state.products.get_mut(&item.product_id.get()) {
                product.stock += item.qty;
            }
        }
        let order = {
            let stored = state.orders.get_mut(&order_id.get()).expect("order exists");
            stored.status = OrderStatus::Canceled;
            stored.clone()
        };

        Ok(OrderWithItems { order, items })
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderWithItems>, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state.orders.get(&order_id.get()).map(|order| OrderWithItems {
            order: order.clone(),
            items: state.items_for(order_id),
        }))
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Page<Order>, LedgerError> {
        let state = self.state.lock().unwrap();
        let rows: Vec<Order> = state
            .orders
            .values()
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .filter(|o| filter.from.is_none_or(|from| o.created_at.date_naive() >= from))
            .filter(|o| filter.to.is_none_or(|to| o.created_at.date_naive() <= to))
            .filter(|o| filter.cursor.is_none_or(|cur| o.id.get() > cur))
            .take(filter.limit + 1)
            .cloned()
            .collect();

        Ok(Page::from_rows(rows, filter.limit, |o| o.id.get()))
    }

    async fn create_product(&self, new: NewProduct) -> Result<Product, LedgerError> {
        let mut state = self.state.lock().unwrap();
        if state.products.values().any(|p| p.sku == new.sku) {
            return Err(LedgerError::DuplicateSku(new.sku));
        }
        state.next_product_id += 1;
        let product = Product {
            id: ProductId::new(state.next_product_id),
            sku: new.sku,
            name: new.name,
            price_cents: new.price_cents,
            stock: new.stock,
        };
        state.products.insert(product.id.get(), product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, LedgerError> {
        Ok(self.state.lock().unwrap().products.get(&id.get()).cloned())
    }

    async fn list_products(
        &self,
        cursor: Option<i64>,
        limit: usize,
    ) -> Result<Page<Product>, LedgerError> {
        let state = self.state.lock().unwrap();
        let rows: Vec<Product> = state
            .products
            .values()
            .filter(|p| cursor.is_none_or(|cur| p.id.get() > cur))
            .take(limit + 1)
            .cloned()
            .collect();
        Ok(Page::from_rows(rows, limit, |p| p.id.get()))
    }
}
