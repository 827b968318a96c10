//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use super::Currency;

/// Money movement failures as seen by a caller.
///
/// Every variant except `PersistenceConflict` is detected before any write
/// and is terminal for the request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Non-positive, unparsable or non-finite amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The acting user has no account in this currency
    #[error("Account not found for user {user_id} in {currency}")]
    AccountNotFound { user_id: Uuid, currency: Currency },

    /// The recipient exists but holds no account in this currency
    #[error("Recipient does not have a {0} account")]
    RecipientAccountMissing(Currency),

    /// Balance does not cover the debit
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    /// No user with this email
    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    #[error("Cannot transfer to yourself")]
    SelfTransferNotAllowed,

    #[error("Cannot exchange to the same currency")]
    SameCurrencyExchange,

    /// The unit of work could not commit because of contention. Safe to retry.
    #[error("Persistence conflict: {0}")]
    PersistenceConflict(String),
}

impl DomainError {
    /// Create an insufficient funds error
    pub fn insufficient_funds(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }

    pub fn invalid_amount(reason: impl Into<String>) -> Self {
        Self::InvalidAmount(reason.into())
    }

    /// Check if retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceConflict(_))
    }
}
