//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use common::ProductId;
use customers::CustomerDirectory;
use idempotency::IdempotencyStore;
use ledger::{LedgerError, LedgerStore, NewProduct};
use serde::Deserialize;

use crate::error::ApiError;
use crate::routes::orders::{AppState, success};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    cursor: Option<i64>,
    limit: Option<usize>,
}

/// POST /products
#[tracing::instrument(skip(state, new))]
pub async fn create<L: LedgerStore, C: CustomerDirectory, I: IdempotencyStore>(
    State(state): State<Arc<AppState<L, C, I>>>,
    Json(new): Json<NewProduct>,
) -> Result<Response, ApiError> {
    let product = state.service.create_product(new).await?;
    tracing::info!(product_id = %product.id, sku = %product.sku, "product registered");
    Ok(success(StatusCode::CREATED, product))
}

/// GET /products/:id
#[tracing::instrument(skip(state))]
pub async fn get_by_id<L: LedgerStore, C: CustomerDirectory, I: IdempotencyStore>(
    State(state): State<Arc<AppState<L, C, I>>>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let product_id = ProductId::new(id);
    match state.service.get_product(product_id).await? {
        Some(product) => Ok(success(StatusCode::OK, product)),
        None => Err(LedgerError::ProductNotFound(product_id).into()),
    }
}

/// GET /products
#[tracing::instrument(skip(state))]
pub async fn list<L: LedgerStore, C: CustomerDirectory, I: IdempotencyStore>(
    State(state): State<Arc<AppState<L, C, I>>>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let page = state.service.list_products(query.cursor, limit).await?;
    Ok(success(StatusCode::OK, page))
}
