//! The saga itself: validate customer, create order, confirm order.

use std::time::Instant;

use common::CustomerId;
use customers::{Customer, CustomerDirectory, CustomerError};

use crate::clients::{OrderLine, OrderSummary, OrdersClient};
use crate::error::StepError;

/// One orchestration request, as received from the entrypoint.
#[derive(Debug, Clone)]
pub struct OrchestrationRequest {
    pub customer_id: CustomerId,
    pub items: Vec<OrderLine>,
    pub idempotency_key: String,
    pub correlation_id: String,
}

/// Aggregated result of a completed saga.
#[derive(Debug, Clone)]
pub struct SagaSuccess {
    pub customer: Customer,
    pub order: OrderSummary,
}

/// The first failing step's outcome. The saga stops here; there is nothing
/// to compensate because order creation is atomic on the ledger side and a
/// failed confirmation leaves the order in CREATED, still cancelable.
#[derive(Debug, Clone)]
pub struct SagaFailure {
    pub status: u16,
    pub message: String,
}

impl From<StepError> for SagaFailure {
    fn from(err: StepError) -> Self {
        match err {
            StepError::Rejected { status, message } => SagaFailure { status, message },
            StepError::Transport(e) => {
                tracing::error!(error = %e, "saga step transport failure");
                SagaFailure {
                    status: 500,
                    message: "upstream service unreachable".to_string(),
                }
            }
        }
    }
}

/// Runs the three-step saga against the two collaborators.
pub struct Orchestrator<C, O> {
    customers: C,
    orders: O,
}

impl<C: CustomerDirectory, O: OrdersClient> Orchestrator<C, O> {
    pub fn new(customers: C, orders: O) -> Self {
        Self { customers, orders }
    }

    /// Executes the saga, stopping at the first failing step.
    ///
    /// Steps run strictly in order and are never retried here; the
    /// confirmation step carries the caller's idempotency key so that a
    /// caller-level retry of the whole saga replays the confirmation instead
    /// of re-executing it.
    #[tracing::instrument(
        skip(self, request),
        fields(correlation_id = %request.correlation_id, customer_id = %request.customer_id)
    )]
    pub async fn run(&self, request: &OrchestrationRequest) -> Result<SagaSuccess, SagaFailure> {
        metrics::counter!("saga_executions_total").increment(1);
        let started = Instant::now();

        let result = self.run_steps(request).await;

        metrics::histogram!("saga_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(success) => {
                tracing::info!(order_id = %success.order.id, "saga completed");
            }
            Err(failure) => {
                metrics::counter!("saga_failures_total").increment(1);
                tracing::warn!(status = failure.status, message = %failure.message, "saga aborted");
            }
        }
        result
    }

    async fn run_steps(&self, request: &OrchestrationRequest) -> Result<SagaSuccess, SagaFailure> {
        let customer = self.validate_customer(request.customer_id).await?;

        let order = self
            .orders
            .create_order(request.customer_id, &request.items)
            .await?;

        let order = self
            .orders
            .confirm_order(order.id, &request.idempotency_key)
            .await?;

        Ok(SagaSuccess { customer, order })
    }

    async fn validate_customer(&self, customer_id: CustomerId) -> Result<Customer, SagaFailure> {
        match self.customers.find(customer_id).await {
            Ok(Some(customer)) => Ok(customer),
            Ok(None) => Err(SagaFailure {
                status: 404,
                message: format!("customer {customer_id} not found"),
            }),
            Err(CustomerError::Unavailable { status }) => Err(SagaFailure {
                status,
                message: "customer directory rejected the lookup".to_string(),
            }),
            Err(e) => {
                tracing::error!(error = %e, "customer lookup failed");
                Err(SagaFailure {
                    status: 500,
                    message: "upstream service unreachable".to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;
    use customers::InMemoryCustomerStore;

    use crate::clients::InMemoryOrdersClient;

    fn request() -> OrchestrationRequest {
        OrchestrationRequest {
            customer_id: CustomerId::new(5),
            items: vec![OrderLine {
                product_id: ProductId::new(10),
                qty: 2,
            }],
            idempotency_key: "key-1".to_string(),
            correlation_id: "corr-1".to_string(),
        }
    }

    fn directory_with_customer() -> InMemoryCustomerStore {
        let directory = InMemoryCustomerStore::new();
        directory.insert(Customer {
            id: CustomerId::new(5),
            name: "Ana".to_string(),
            email: "ana@test.dev".to_string(),
            phone: None,
        });
        directory
    }

    #[tokio::test]
    async fn happy_path_creates_and_confirms() {
        let orders = InMemoryOrdersClient::new();
        let saga = Orchestrator::new(directory_with_customer(), orders.clone());

        let success = saga.run(&request()).await.unwrap();

        assert_eq!(success.customer.id, CustomerId::new(5));
        assert_eq!(success.order.status, "CONFIRMED");
        assert_eq!(orders.create_calls(), 1);
        assert_eq!(orders.confirm_calls(), 1);
    }

    #[tokio::test]
    async fn unknown_customer_aborts_before_any_order_call() {
        let orders = InMemoryOrdersClient::new();
        let saga = Orchestrator::new(InMemoryCustomerStore::new(), orders.clone());

        let failure = saga.run(&request()).await.unwrap_err();

        assert_eq!(failure.status, 404);
        assert_eq!(orders.create_calls(), 0);
        assert_eq!(orders.confirm_calls(), 0);
    }

    #[tokio::test]
    async fn unreachable_directory_aborts_with_500() {
        let directory = InMemoryCustomerStore::new();
        directory.set_unavailable(true);
        let orders = InMemoryOrdersClient::new();
        let saga = Orchestrator::new(directory, orders.clone());

        let failure = saga.run(&request()).await.unwrap_err();

        assert_eq!(failure.status, 500);
        assert_eq!(orders.create_calls(), 0);
    }

    #[tokio::test]
    async fn create_rejection_aborts_with_remote_status() {
        let orders = InMemoryOrdersClient::new();
        orders.fail_create(409, "insufficient stock");
        let saga = Orchestrator::new(directory_with_customer(), orders.clone());

        let failure = saga.run(&request()).await.unwrap_err();

        assert_eq!(failure.status, 409);
        assert_eq!(failure.message, "insufficient stock");
        assert_eq!(orders.confirm_calls(), 0);
    }

    #[tokio::test]
    async fn confirm_rejection_surfaces_without_compensation() {
        let orders = InMemoryOrdersClient::new();
        orders.fail_confirm(409, "idempotency conflict");
        let saga = Orchestrator::new(directory_with_customer(), orders.clone());

        let failure = saga.run(&request()).await.unwrap_err();

        assert_eq!(failure.status, 409);
        // The created order is left as-is: exactly one create, no retries,
        // no cancel call.
        assert_eq!(orders.create_calls(), 1);
        assert_eq!(orders.confirm_calls(), 1);
        assert_eq!(orders.orders().len(), 1);
        assert_eq!(orders.orders()[0].status, "CREATED");
    }
}
