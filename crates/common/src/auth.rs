//! Service-to-service authentication.
//!
//! Internal endpoints are guarded by a static shared-secret bearer token
//! compared by exact match. A missing `Authorization` header yields 401;
//! a present-but-wrong token yields 403.

use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// The shared secret expected on internal requests.
#[derive(Debug, Clone)]
pub struct ServiceToken(String);

impl ServiceToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Formats the token as an `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }
}

fn reject(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({ "status": "error", "message": message });
    (status, axum::Json(body)).into_response()
}

/// Middleware enforcing the bearer-token check.
///
/// Attach with `axum::middleware::from_fn_with_state(token, require_service_token)`.
pub async fn require_service_token(
    State(expected): State<ServiceToken>,
    request: Request,
    next: Next,
) -> Response {
    let Some(header_value) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return reject(StatusCode::UNAUTHORIZED, "missing authorization header");
    };

    let token = header_value.strip_prefix("Bearer ").unwrap_or("");
    if !expected.matches(token) {
        return reject(StatusCode::FORBIDDEN, "invalid service token");
    }

    next.run(request).await
}
