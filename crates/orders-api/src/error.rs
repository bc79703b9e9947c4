//! API error types with HTTP response mapping.
//!
//! Ledger failures arrive as structured variants and are translated here,
//! never inferred from message text. Each failure maps to a wire status and
//! a machine-readable code; the human-readable message rides alongside.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use idempotency::IdempotencyError;
use ledger::LedgerError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// The `X-Idempotency-Key` header is required but absent.
    MissingIdempotencyKey,
    /// Ledger operation failure.
    Ledger(LedgerError),
    /// Idempotency store failure.
    Idempotency(IdempotencyError),
}

/// Wire status and code for a ledger failure.
pub fn ledger_error_parts(err: &LedgerError) -> (StatusCode, &'static str) {
    match err {
        LedgerError::CustomerNotFound(_) => (StatusCode::NOT_FOUND, "CLIENT_NOT_FOUND"),
        LedgerError::ProductNotFound(_) => (StatusCode::NOT_FOUND, "PRODUCT_NOT_FOUND"),
        LedgerError::OrderNotFound(_) => (StatusCode::NOT_FOUND, "ORDER_NOT_FOUND"),
        LedgerError::InsufficientStock { .. } => (StatusCode::CONFLICT, "INSUFFICIENT_STOCK"),
        LedgerError::DuplicateSku(_) => (StatusCode::CONFLICT, "DUPLICATE_SKU"),
        LedgerError::InvalidOrderStatus { .. } => (StatusCode::CONFLICT, "INVALID_ORDER_STATUS"),
        LedgerError::CancelWindowExpired { .. } => (StatusCode::CONFLICT, "CANCEL_WINDOW_EXPIRED"),
        LedgerError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        LedgerError::CustomerUnavailable(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "CLIENT_UNAVAILABLE")
        }
        LedgerError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

pub fn error_body(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({ "status": "error", "code": code, "message": message })
}

/// Renders a ledger failure as its wire (status, body) pair. Server-side
/// faults are logged and answered with a generic message.
pub fn ledger_error_response(err: &LedgerError) -> (StatusCode, serde_json::Value) {
    let (status, code) = ledger_error_parts(err);
    if status.is_server_error() {
        tracing::error!(error = %err, "ledger failure");
        (status, error_body(code, "internal server error"))
    } else {
        (status, error_body(code, &err.to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingIdempotencyKey => (
                StatusCode::BAD_REQUEST,
                axum::Json(error_body(
                    "IDEMPOTENCY_KEY_REQUIRED",
                    "X-Idempotency-Key header is required",
                )),
            )
                .into_response(),
            ApiError::Ledger(err) => {
                let (status, body) = ledger_error_response(&err);
                (status, axum::Json(body)).into_response()
            }
            ApiError::Idempotency(err) => {
                tracing::error!(error = %err, "idempotency store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(error_body("INTERNAL_ERROR", "internal server error")),
                )
                    .into_response()
            }
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<IdempotencyError> for ApiError {
    fn from(err: IdempotencyError) -> Self {
        ApiError::Idempotency(err)
    }
}
