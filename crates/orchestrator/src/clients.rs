//! The orders-api client contract, plus an in-memory double for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{CustomerId, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::StepError;

/// A requested order line, as sent to the ledger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub qty: i64,
}

/// The slice of an order the orchestrator cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub status: String,
    pub total_cents: i64,
}

/// Remote contract of the orders-api.
///
/// A rejected call carries the remote status and message as
/// [`StepError::Rejected`]; transport faults are `StepError::Transport`.
#[async_trait]
pub trait OrdersClient: Send + Sync {
    async fn create_order(
        &self,
        customer_id: CustomerId,
        items: &[OrderLine],
    ) -> Result<OrderSummary, StepError>;

    /// Confirms an order under the caller-supplied idempotency key.
    async fn confirm_order(
        &self,
        order_id: OrderId,
        idempotency_key: &str,
    ) -> Result<OrderSummary, StepError>;
}

#[derive(Debug, Default)]
struct State {
    orders: Vec<OrderSummary>,
    next_id: i64,
    fail_create: Option<(u16, String)>,
    fail_confirm: Option<(u16, String)>,
    create_calls: usize,
    confirm_calls: usize,
}

/// In-memory [`OrdersClient`] with failure hooks and call counters.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrdersClient {
    state: Arc<Mutex<State>>,
}

impl InMemoryOrdersClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next create calls fail with this remote outcome.
    pub fn fail_create(&self, status: u16, message: impl Into<String>) {
        self.state.lock().unwrap().fail_create = Some((status, message.into()));
    }

    /// Makes the next confirm calls fail with this remote outcome.
    pub fn fail_confirm(&self, status: u16, message: impl Into<String>) {
        self.state.lock().unwrap().fail_confirm = Some((status, message.into()));
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    pub fn confirm_calls(&self) -> usize {
        self.state.lock().unwrap().confirm_calls
    }

    /// Orders created so far, in creation order.
    pub fn orders(&self) -> Vec<OrderSummary> {
        self.state.lock().unwrap().orders.clone()
    }
}

#[async_trait]
impl OrdersClient for InMemoryOrdersClient {
    async fn create_order(
        &self,
        customer_id: CustomerId,
        items: &[OrderLine],
    ) -> Result<OrderSummary, StepError> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        if let Some((status, message)) = state.fail_create.clone() {
            return Err(StepError::Rejected { status, message });
        }

        state.next_id += 1;
        let order = OrderSummary {
            id: OrderId::new(state.next_id),
            customer_id,
            status: "CREATED".to_string(),
            // Line prices are out of scope for the double; count items only.
            total_cents: items.iter().map(|i| i.qty).sum::<i64>() * 100,
        };
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn confirm_order(
        &self,
        order_id: OrderId,
        _idempotency_key: &str,
    ) -> Result<OrderSummary, StepError> {
        let mut state = self.state.lock().unwrap();
        state.confirm_calls += 1;
        if let Some((status, message)) = state.fail_confirm.clone() {
            return Err(StepError::Rejected { status, message });
        }

        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or(StepError::Rejected {
                status: 404,
                message: "order not found".to_string(),
            })?;
        order.status = "CONFIRMED".to_string();
        Ok(order.clone())
    }
}
