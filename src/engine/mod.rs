//! Money Movement Engine
//!
//! Transfers and exchanges. Each operation validates, mutates balances and
//! writes its transaction and ledger legs inside a single unit of work; any
//! early return drops the unit of work and rolls everything back.

mod commands;
mod error;
mod exchange;
pub mod retry;
mod transfer;


use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::{DomainError, Money, RateProvider};
use crate::store::Store;

pub use commands::{ExchangeCommand, TransferCommand};
pub use error::MovementError;
pub use retry::RetryPolicy;

/// Orchestrates money movement against a store
#[derive(Clone)]
pub struct MovementEngine {
    store: Arc<dyn Store>,
    rates: Arc<dyn RateProvider>,
}

impl MovementEngine {
    pub fn new(store: Arc<dyn Store>, rates: Arc<dyn RateProvider>) -> Self {
        Self { store, rates }
    }
}

/// Reject non-positive amounts and amounts that vanish at two decimal places.
fn positive_amount(raw: Decimal) -> Result<Money, DomainError> {
    if raw <= Decimal::ZERO {
        return Err(DomainError::invalid_amount(format!(
            "Amount must be positive (got {})",
            raw
        )));
    }

    let amount = Money::new(raw);
    if amount.is_zero() {
        return Err(DomainError::invalid_amount(format!(
            "Amount {} rounds to zero",
            raw
        )));
    }

    Ok(amount)
}
