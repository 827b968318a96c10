//! API Routes
//!
//! HTTP endpoint definitions.

use std::str::FromStr;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{Account, Currency, DomainError, Money, OperationContext, Transaction, TransactionKind};
use crate::engine::{retry, ExchangeCommand, TransferCommand};
use crate::error::AppError;
use crate::history::{HistoryQuery, TransactionPage};

use super::middleware::AuthenticatedUser;
use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

/// Amounts stay raw JSON (string or number) so a malformed value is
/// reported as an invalid amount rather than a malformed body.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub recipient_email: String,
    pub amount: Value,
    pub currency: Currency,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    pub from_currency: Currency,
    pub to_currency: Currency,
    pub from_amount: Value,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AccountsResponse {
    pub accounts: Vec<Account>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub account_id: Uuid,
    pub currency: Currency,
    pub balance: Money,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(request)| request)
        .map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))
}

fn parse_amount(field: &str, raw: &Value) -> Result<Decimal, AppError> {
    let text = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(DomainError::invalid_amount(format!("{} must be a decimal, got {}", field, other)).into())
        }
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| DomainError::invalid_amount(format!("{} is not a decimal: {:?}", field, text)).into())
}

/// Minimal shape check: one '@' with a non-empty local part and domain
fn validate_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email.to_string())
        }
        _ => Err(AppError::InvalidRequest(format!(
            "recipient_email is not a valid email address: {}",
            raw
        ))),
    }
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/transactions/transfer", post(transfer))
        .route("/transactions/exchange", post(exchange))
        .route("/transactions", get(list_transactions))
        .route("/accounts", get(list_accounts))
        .route("/accounts/:account_id/balance", get(get_account_balance))
}

// =========================================================================
// POST /transactions/transfer
// =========================================================================

/// Transfer to another user by email
async fn transfer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Extension(context): Extension<OperationContext>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let request = body(payload)?;
    let recipient_email = validate_email(&request.recipient_email)?;
    let amount = parse_amount("amount", &request.amount)?;

    let command = TransferCommand::new(user.user_id, recipient_email, amount, request.currency);

    let transaction = retry::with_retry(&state.retry, || state.engine.transfer(&command, &context)).await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

// =========================================================================
// POST /transactions/exchange
// =========================================================================

/// Exchange between the caller's own accounts
async fn exchange(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Extension(context): Extension<OperationContext>,
    payload: Result<Json<ExchangeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let request = body(payload)?;
    let from_amount = parse_amount("from_amount", &request.from_amount)?;

    let command = ExchangeCommand::new(
        user.user_id,
        request.from_currency,
        request.to_currency,
        from_amount,
    );

    let transaction = retry::with_retry(&state.retry, || state.engine.exchange(&command, &context)).await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

// =========================================================================
// GET /transactions
// =========================================================================

/// Caller's transaction history, newest first
async fn list_transactions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<TransactionPage>, AppError> {
    let kind = params
        .kind
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| TransactionKind::from_str(&s.to_uppercase()))
        .transpose()
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;

    let query = HistoryQuery {
        kind,
        page: params.page,
        limit: params.limit,
    };

    let page = state.history.list(user.user_id, &query).await?;

    Ok(Json(page))
}

// =========================================================================
// GET /accounts
// =========================================================================

async fn list_accounts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<AccountsResponse>, AppError> {
    let accounts = state.store.list_accounts(user.user_id).await?;
    Ok(Json(AccountsResponse { accounts }))
}

// =========================================================================
// GET /accounts/:account_id/balance
// =========================================================================

/// Balance of one of the caller's accounts
async fn get_account_balance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<BalanceResponse>, AppError> {
    let account = state
        .store
        .find_user_account(user.user_id, account_id)
        .await?
        .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;

    Ok(Json(BalanceResponse {
        account_id: account.id,
        currency: account.currency,
        balance: account.balance,
    }))
}
