//! HTTP surface of the order ledger.
//!
//! Exposes order create/confirm/cancel, the product catalog, and listing
//! endpoints, with structured logging (tracing) and Prometheus metrics.
//! Confirmation runs under the idempotency coordinator; everything except
//! `/health` and `/metrics` sits behind the internal service token.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use axum::middleware;
use common::{ServiceToken, require_service_token};
use customers::CustomerDirectory;
use idempotency::IdempotencyStore;
use ledger::LedgerStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L, C, I>(
    state: Arc<AppState<L, C, I>>,
    token: ServiceToken,
    metrics_handle: PrometheusHandle,
) -> Router
where
    L: LedgerStore + 'static,
    C: CustomerDirectory + 'static,
    I: IdempotencyStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let protected = Router::new()
        .route(
            "/orders",
            post(routes::orders::create::<L, C, I>).get(routes::orders::list::<L, C, I>),
        )
        .route("/orders/{id}", get(routes::orders::get_by_id::<L, C, I>))
        .route("/orders/{id}/confirm", post(routes::orders::confirm::<L, C, I>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<L, C, I>))
        .route(
            "/products",
            post(routes::products::create::<L, C, I>).get(routes::products::list::<L, C, I>),
        )
        .route("/products/{id}", get(routes::products::get_by_id::<L, C, I>))
        .layer(middleware::from_fn_with_state(token, require_service_token))
        .with_state(state);

    Router::new()
        .route("/health", get(routes::health::check))
        .merge(protected)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
