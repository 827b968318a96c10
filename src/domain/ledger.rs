//! Ledger leg rules
//!
//! Checked by the engine before entries are handed to the ledger writer.

use uuid::Uuid;

use super::{Currency, Money, TransactionKind};

/// An entry to be written, before it has an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryDraft {
    pub account_id: Uuid,
    pub currency: Currency,
    pub amount: Money,
}

impl EntryDraft {
    pub fn new(account_id: Uuid, currency: Currency, amount: Money) -> Self {
        Self {
            account_id,
            currency,
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Expected 2 ledger legs, got {0}")]
    LegCount(usize),

    #[error("Transfer legs must share a currency ({0} vs {1})")]
    CurrencyMismatch(Currency, Currency),

    #[error("Transfer legs do not sum to zero (sum {0})")]
    Unbalanced(Money),

    #[error("Exchange legs must be in different currencies")]
    SameCurrency,

    #[error("Source leg must be a debit and target leg a credit")]
    LegDirection,

    #[error("Ledger arithmetic overflow")]
    Overflow,
}

/// Validate the legs of one transaction, source leg first.
///
/// Transfer: two legs, one currency, exact negatives.
/// Exchange: two legs, distinct currencies, debit then credit. The amounts are
/// in different units and are not compared.
pub fn check_legs(kind: TransactionKind, legs: &[EntryDraft]) -> Result<(), LedgerError> {
    let [source, target] = legs else {
        return Err(LedgerError::LegCount(legs.len()));
    };

    if !source.amount.is_negative() || !target.amount.is_positive() {
        return Err(LedgerError::LegDirection);
    }

    match kind {
        TransactionKind::Transfer => {
            if source.currency != target.currency {
                return Err(LedgerError::CurrencyMismatch(source.currency, target.currency));
            }
            let sum = source
                .amount
                .checked_add(target.amount)
                .map_err(|_| LedgerError::Overflow)?;
            if !sum.is_zero() {
                return Err(LedgerError::Unbalanced(sum));
            }
        }
        TransactionKind::Exchange => {
            if source.currency == target.currency {
                return Err(LedgerError::SameCurrency);
            }
        }
    }

    Ok(())
}
