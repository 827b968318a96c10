//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;
use crate::engine::MovementError;
use crate::store::StoreError;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    // Movement errors
    #[error(transparent)]
    Movement(#[from] MovementError),

    // Server errors (5xx)
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        AppError::Movement(MovementError::Domain(err))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

fn domain_status(err: &DomainError) -> (StatusCode, &'static str) {
    match err {
        DomainError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),
        DomainError::AccountNotFound { .. } => (StatusCode::NOT_FOUND, "account_not_found"),
        DomainError::RecipientNotFound(_) => (StatusCode::NOT_FOUND, "recipient_not_found"),
        DomainError::RecipientAccountMissing(_) => {
            (StatusCode::BAD_REQUEST, "recipient_account_missing")
        }
        DomainError::InsufficientFunds { .. } => (StatusCode::BAD_REQUEST, "insufficient_funds"),
        DomainError::SelfTransferNotAllowed => (StatusCode::BAD_REQUEST, "self_transfer"),
        DomainError::SameCurrencyExchange => (StatusCode::BAD_REQUEST, "same_currency_exchange"),
        DomainError::PersistenceConflict(_) => (StatusCode::CONFLICT, "persistence_conflict"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 404 Not Found
            AppError::AccountNotFound(id) => {
                (StatusCode::NOT_FOUND, "account_not_found", Some(id.clone()))
            }

            AppError::Movement(MovementError::Domain(domain_err)) => {
                let (status, code) = domain_status(domain_err);
                if status == StatusCode::CONFLICT {
                    tracing::warn!("Movement gave up after conflicts: {}", domain_err);
                }
                (status, code, None)
            }
            AppError::Movement(e) => {
                tracing::error!("Movement failed: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "movement_failed", None)
            }

            // 409 or 500
            AppError::Store(e) if e.is_conflict() => {
                (StatusCode::CONFLICT, "persistence_conflict", None)
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "store_error", None)
            }
        };

        // Server-side failures do not leak their cause
        let error = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
