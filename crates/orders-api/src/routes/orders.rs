//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use common::{CustomerId, OrderId};
use customers::CustomerDirectory;
use idempotency::{IdempotencyCoordinator, IdempotencyStore, StoredResponse};
use ledger::{LedgerError, LedgerStore, NewOrderItem, OrderFilter, OrderService, OrderStatus};
use serde::Deserialize;

use crate::error::{ApiError, ledger_error_response};

/// Header carrying the caller-supplied idempotency key.
pub const IDEMPOTENCY_HEADER: &str = "x-idempotency-key";

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

/// Shared application state accessible from all handlers.
pub struct AppState<L, C, I> {
    pub service: OrderService<L, C>,
    pub coordinator: IdempotencyCoordinator<I>,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: CustomerId,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    status: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    cursor: Option<i64>,
    limit: Option<usize>,
}

pub(crate) fn success(status: StatusCode, data: impl serde::Serialize) -> Response {
    let body = serde_json::json!({ "status": "success", "data": data });
    (status, Json(body)).into_response()
}

/// Renders a stored response exactly as captured.
fn replay(stored: StoredResponse) -> Response {
    let status =
        StatusCode::from_u16(stored.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(stored.body)).into_response()
}

/// POST /orders — create an order in status CREATED.
#[tracing::instrument(skip(state, req))]
pub async fn create<L: LedgerStore, C: CustomerDirectory, I: IdempotencyStore>(
    State(state): State<Arc<AppState<L, C, I>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Response, ApiError> {
    let order = state.service.create_order(req.customer_id, req.items).await?;
    Ok(success(StatusCode::CREATED, order))
}

/// GET /orders/:id
#[tracing::instrument(skip(state))]
pub async fn get_by_id<L: LedgerStore, C: CustomerDirectory, I: IdempotencyStore>(
    State(state): State<Arc<AppState<L, C, I>>>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let order_id = OrderId::new(id);
    match state.service.get_order(order_id).await? {
        Some(order) => Ok(success(StatusCode::OK, order)),
        None => Err(LedgerError::OrderNotFound(order_id).into()),
    }
}

/// GET /orders — cursor-paginated listing with status and date filters.
#[tracing::instrument(skip(state))]
pub async fn list<L: LedgerStore, C: CustomerDirectory, I: IdempotencyStore>(
    State(state): State<Arc<AppState<L, C, I>>>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(LedgerError::Validation)?;

    let filter = OrderFilter {
        status,
        from: query.from,
        to: query.to,
        cursor: query.cursor,
        limit: query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
    };
    let page = state.service.list_orders(&filter).await?;
    Ok(success(StatusCode::OK, page))
}

/// POST /orders/:id/confirm — idempotent confirmation.
///
/// The confirm operation runs under the idempotency coordinator: its full
/// outcome, business failures included, is captured once per key and every
/// retry replays the stored (status, body) verbatim.
#[tracing::instrument(skip(state, headers))]
pub async fn confirm<L: LedgerStore, C: CustomerDirectory, I: IdempotencyStore>(
    State(state): State<Arc<AppState<L, C, I>>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|k| !k.is_empty())
        .ok_or(ApiError::MissingIdempotencyKey)?;

    let order_id = OrderId::new(id);
    let service = &state.service;
    let stored = state
        .coordinator
        .execute(key, "order_confirmation", id, || async move {
            match service.confirm_order(order_id).await {
                Ok(order) => StoredResponse::new(
                    StatusCode::OK.as_u16(),
                    serde_json::json!({ "status": "success", "data": order }),
                ),
                Err(err) => {
                    let (status, body) = ledger_error_response(&err);
                    StoredResponse::new(status.as_u16(), body)
                }
            }
        })
        .await?;

    Ok(replay(stored))
}

/// POST /orders/:id/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel<L: LedgerStore, C: CustomerDirectory, I: IdempotencyStore>(
    State(state): State<Arc<AppState<L, C, I>>>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let order = state.service.cancel_order(OrderId::new(id)).await?;
    Ok(success(StatusCode::OK, order))
}
