//! Movement Errors

use crate::domain::{DomainError, LedgerError, MoneyError, RateError};
use crate::store::StoreError;

/// Everything a transfer or exchange can fail with
#[derive(Debug, thiserror::Error)]
pub enum MovementError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Non-transient storage failure
    #[error(transparent)]
    Store(StoreError),

    /// Ledger legs broke an invariant; nothing was committed
    #[error("Ledger invariant violated: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Rate unavailable: {0}")]
    Rate(#[from] RateError),
}

impl MovementError {
    /// The domain error, if this is one
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            MovementError::Domain(err) => Some(err),
            _ => None,
        }
    }

    /// Only persistence conflicts may be retried
    pub fn is_retryable(&self) -> bool {
        self.domain().map_or(false, DomainError::is_retryable)
    }
}

impl From<StoreError> for MovementError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(reason) => {
                MovementError::Domain(DomainError::PersistenceConflict(reason))
            }
            other => MovementError::Store(other),
        }
    }
}

impl From<MoneyError> for MovementError {
    fn from(err: MoneyError) -> Self {
        MovementError::Domain(DomainError::InvalidAmount(err.to_string()))
    }
}
