//! API error types with HTTP response mapping.
//!
//! Every error body carries a stable machine-readable `kind` plus a
//! human-readable `message`; callers dispatch on the kind, never on the
//! message text.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::{CartError, OrderError};
use settlement::SettlementError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Checkout pipeline error.
    Checkout(CheckoutError),
    /// Settlement query error.
    Settlement(SettlementError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Settlement(err) => {
                tracing::error!(error = %err, "settlement query failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    err.to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
            }
        };

        let body = serde_json::json!({ "error": { "kind": kind, "message": message } });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        CheckoutError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error", message),
        CheckoutError::ProductUnavailable(_) => {
            (StatusCode::CONFLICT, "product_unavailable", message)
        }
        CheckoutError::InsufficientStock { .. } => {
            (StatusCode::CONFLICT, "insufficient_stock", message)
        }
        CheckoutError::StockUpdateFailed(_) => {
            (StatusCode::CONFLICT, "stock_update_failed", message)
        }
        CheckoutError::OrderNumberExhausted => (
            StatusCode::SERVICE_UNAVAILABLE,
            "order_number_exhausted",
            message,
        ),
        CheckoutError::OrderNotFound(_) => (StatusCode::NOT_FOUND, "not_found", message),
        CheckoutError::Order(OrderError::InvalidStatus { .. }) => {
            (StatusCode::CONFLICT, "invalid_status", message)
        }
        CheckoutError::Order(_) => (StatusCode::BAD_REQUEST, "validation_error", message),
        CheckoutError::Cart(CartError::LineNotFound(_)) => {
            (StatusCode::NOT_FOUND, "not_found", message)
        }
        CheckoutError::Cart(CartError::InvalidQuantity { .. }) => {
            (StatusCode::BAD_REQUEST, "validation_error", message)
        }
        CheckoutError::Storage(storage::StorageError::CartConflict { .. }) => {
            (StatusCode::CONFLICT, "cart_conflict", message)
        }
        CheckoutError::Storage(storage::StorageError::StatusConflict { .. }) => {
            (StatusCode::CONFLICT, "status_conflict", message)
        }
        CheckoutError::Storage(_) | CheckoutError::Catalog(_) => {
            tracing::error!(error = %message, "storage failure surfaced to API");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        ApiError::Settlement(err)
    }
}
