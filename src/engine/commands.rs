//! Command definitions
//!
//! Commands represent intentions to move money. The caller has already
//! authenticated the acting user.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Currency;

// =========================================================================
// TransferCommand
// =========================================================================

/// Command to move money to another user in one currency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    pub sender_id: Uuid,
    pub recipient_email: String,
    /// Raw amount; normalized to two places by the engine
    pub amount: Decimal,
    pub currency: Currency,
}

impl TransferCommand {
    pub fn new(
        sender_id: Uuid,
        recipient_email: impl Into<String>,
        amount: Decimal,
        currency: Currency,
    ) -> Self {
        Self {
            sender_id,
            recipient_email: recipient_email.into(),
            amount,
            currency,
        }
    }
}

// =========================================================================
// ExchangeCommand
// =========================================================================

/// Command to convert money between two of the user's own accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeCommand {
    pub user_id: Uuid,
    pub from_currency: Currency,
    pub to_currency: Currency,
    /// Raw source amount; normalized to two places by the engine
    pub from_amount: Decimal,
}

impl ExchangeCommand {
    pub fn new(user_id: Uuid, from_currency: Currency, to_currency: Currency, from_amount: Decimal) -> Self {
        Self {
            user_id,
            from_currency,
            to_currency,
            from_amount,
        }
    }
}
