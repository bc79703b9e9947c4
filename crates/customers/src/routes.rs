//! HTTP surface of the customer directory.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router, middleware};
use common::{CustomerId, ServiceToken, require_service_token};
use serde::Deserialize;

use crate::error::CustomerError;
use crate::model::{CustomerUpdate, NewCustomer};
use crate::store::CustomerStore;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

fn success(status: StatusCode, data: impl serde::Serialize) -> Response {
    let body = serde_json::json!({ "status": "success", "data": data });
    (status, Json(body)).into_response()
}

fn failure(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({ "status": "error", "message": message });
    (status, Json(body)).into_response()
}

impl IntoResponse for CustomerError {
    fn into_response(self) -> Response {
        match self {
            CustomerError::DuplicateEmail => failure(StatusCode::CONFLICT, &self.to_string()),
            other => {
                tracing::error!(error = %other, "customer store failure");
                failure(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    search: Option<String>,
    cursor: Option<i64>,
    limit: Option<usize>,
}

/// Builds the directory router with all routes behind the service token,
/// except `/health`.
pub fn create_router<S: CustomerStore + 'static>(store: Arc<S>, token: ServiceToken) -> Router {
    let protected = Router::new()
        .route("/customers", get(list::<S>).post(create::<S>))
        .route(
            "/customers/{id}",
            get(get_by_id::<S>).patch(update::<S>).delete(delete::<S>),
        )
        .layer(middleware::from_fn_with_state(token, require_service_token))
        .with_state(store);

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[tracing::instrument(skip(store, new))]
async fn create<S: CustomerStore>(
    State(store): State<Arc<S>>,
    Json(new): Json<NewCustomer>,
) -> Result<Response, CustomerError> {
    if new.name.trim().is_empty() || !new.email.contains('@') {
        return Ok(failure(StatusCode::BAD_REQUEST, "invalid customer payload"));
    }
    let customer = store.create(new).await?;
    tracing::info!(customer_id = %customer.id, "customer created");
    Ok(success(StatusCode::CREATED, customer))
}

#[tracing::instrument(skip(store))]
async fn get_by_id<S: CustomerStore>(
    State(store): State<Arc<S>>,
    Path(id): Path<i64>,
) -> Result<Response, CustomerError> {
    match store.get(CustomerId::new(id)).await? {
        Some(customer) => Ok(success(StatusCode::OK, customer)),
        None => Ok(failure(StatusCode::NOT_FOUND, "customer not found")),
    }
}

#[tracing::instrument(skip(store, update))]
async fn update<S: CustomerStore>(
    State(store): State<Arc<S>>,
    Path(id): Path<i64>,
    Json(update): Json<CustomerUpdate>,
) -> Result<Response, CustomerError> {
    match store.update(CustomerId::new(id), update).await? {
        Some(customer) => Ok(success(StatusCode::OK, customer)),
        None => Ok(failure(StatusCode::NOT_FOUND, "customer not found")),
    }
}

#[tracing::instrument(skip(store))]
async fn delete<S: CustomerStore>(
    State(store): State<Arc<S>>,
    Path(id): Path<i64>,
) -> Result<Response, CustomerError> {
    if store.delete(CustomerId::new(id)).await? {
        Ok(success(StatusCode::OK, serde_json::json!({ "deleted": true })))
    } else {
        Ok(failure(StatusCode::NOT_FOUND, "customer not found"))
    }
}

#[tracing::instrument(skip(store))]
async fn list<S: CustomerStore>(
    State(store): State<Arc<S>>,
    Query(query): Query<ListQuery>,
) -> Result<Response, CustomerError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let page = store.list(query.search, query.cursor, limit).await?;
    Ok(success(StatusCode::OK, page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryCustomerStore;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const TOKEN: &str = "test-token";

    fn app() -> (Router, Arc<InMemoryCustomerStore>) {
        let store = Arc::new(InMemoryCustomerStore::new());
        let router = create_router(store.clone(), ServiceToken::new(TOKEN));
        (router, store)
    }

    fn authed(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {TOKEN}"))
            .header("content-type", "application/json");
        match body {
            Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_then_get_roundtrip() {
        let (app, _) = app();

        let response = app
            .clone()
            .oneshot(authed(
                "POST",
                "/customers",
                Some(serde_json::json!({ "name": "Ana", "email": "ana@test.dev" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let id = created["data"]["id"].as_i64().unwrap();

        let response = app
            .oneshot(authed("GET", &format!("/customers/{id}"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = body_json(response).await;
        assert_eq!(fetched["data"]["email"], "ana@test.dev");
    }

    #[tokio::test]
    async fn missing_customer_is_404() {
        let (app, _) = app();
        let response = app
            .oneshot(authed("GET", "/customers/999", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_email_is_409() {
        let (app, store) = app();
        store
            .create(NewCustomer {
                name: "Ana".into(),
                email: "ana@test.dev".into(),
                phone: None,
            })
            .await
            .unwrap();

        let response = app
            .oneshot(authed(
                "POST",
                "/customers",
                Some(serde_json::json!({ "name": "Ana2", "email": "ana@test.dev" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn requests_without_token_are_rejected() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/customers/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_payload_is_400() {
        let (app, _) = app();
        let response = app
            .oneshot(authed(
                "POST",
                "/customers",
                Some(serde_json::json!({ "name": "", "email": "not-an-email" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
