//! HTTP entrypoint for the saga.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use common::CustomerId;
use customers::CustomerDirectory;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::clients::{OrderLine, OrdersClient};
use crate::saga::{OrchestrationRequest, Orchestrator};

/// Inbound saga trigger body.
#[derive(Deserialize)]
pub struct SagaRequest {
    pub customer_id: CustomerId,
    pub items: Vec<OrderLine>,
    pub idempotency_key: String,
    /// Caller-supplied tracing id; generated when absent.
    pub correlation_id: Option<String>,
}

pub fn create_router<C, O>(
    orchestrator: Arc<Orchestrator<C, O>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    C: CustomerDirectory + 'static,
    O: OrdersClient + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(health))
        .route("/saga", post(run_saga::<C, O>))
        .with_state(orchestrator)
        .merge(metrics_router)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}

fn failure_response(status: u16, correlation_id: &str, message: &str) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = serde_json::json!({
        "success": false,
        "correlationId": correlation_id,
        "message": message,
    });
    (status, Json(body)).into_response()
}

/// POST /saga — runs the full orchestration and answers with one unified
/// envelope carrying the caller's correlation id.
#[tracing::instrument(skip(orchestrator, req))]
async fn run_saga<C, O>(
    State(orchestrator): State<Arc<Orchestrator<C, O>>>,
    Json(req): Json<SagaRequest>,
) -> Response
where
    C: CustomerDirectory + 'static,
    O: OrdersClient + 'static,
{
    let correlation_id = req
        .correlation_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    if req.idempotency_key.is_empty() {
        return failure_response(400, &correlation_id, "idempotency_key is required");
    }
    if req.items.is_empty() {
        return failure_response(400, &correlation_id, "order must contain at least one item");
    }

    let request = OrchestrationRequest {
        customer_id: req.customer_id,
        items: req.items,
        idempotency_key: req.idempotency_key,
        correlation_id: correlation_id.clone(),
    };

    match orchestrator.run(&request).await {
        Ok(success) => {
            let body = serde_json::json!({
                "success": true,
                "correlationId": correlation_id,
                "data": { "customer": success.customer, "order": success.order },
            });
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(failure) => failure_response(failure.status, &correlation_id, &failure.message),
    }
}
