//! Domain module
//!
//! Core domain types and business rules.

pub mod context;
pub mod currency;
pub mod error;
pub mod ledger;
pub mod model;
pub mod money;
pub mod rate;

pub use context::OperationContext;
pub use currency::{Currency, UnknownCurrency};
pub use error::DomainError;
pub use ledger::{check_legs, EntryDraft, LedgerError};
pub use model::{Account, LedgerEntry, Transaction, TransactionKind, User};
pub use money::{Money, MoneyError, MONEY_SCALE};
pub use rate::{FixedRateProvider, Rate, RateError, RateProvider};
