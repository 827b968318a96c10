//! wallet_ledger Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod history;
pub mod store;

mod error;

pub use config::Config;
pub use domain::{Currency, DomainError, Money, OperationContext, Transaction, TransactionKind};
pub use engine::{MovementEngine, MovementError, RetryPolicy};
pub use error::AppError;
pub use history::{HistoryQuery, TransactionHistory, TransactionPage};
