//! Storage module
//!
//! The atomic unit of work and the account/ledger access it exposes.
//! A unit of work rolls back when dropped; only `commit` makes its writes
//! visible.

mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Account, Currency, EntryDraft, LedgerEntry, Money, Transaction, TransactionKind, User};

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Account reads and the single balance mutation path.
///
/// Reads lock the returned account row until the unit of work ends.
#[async_trait]
pub trait AccountStore: Send {
    async fn find_account(
        &mut self,
        user_id: Uuid,
        currency: Currency,
    ) -> Result<Option<Account>, StoreError>;

    async fn find_account_by_id(&mut self, account_id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError>;

    /// Apply a signed delta to a balance and return the updated account.
    async fn adjust_balance(&mut self, account_id: Uuid, delta: Money) -> Result<Account, StoreError>;
}

/// Transaction and ledger entry persistence.
#[async_trait]
pub trait LedgerWriter: Send {
    /// Create the transaction record. The returned value has no entries yet.
    async fn record_transaction(
        &mut self,
        kind: TransactionKind,
        amount: Money,
    ) -> Result<Transaction, StoreError>;

    /// Append entries in leg order.
    async fn append_entries(
        &mut self,
        transaction_id: Uuid,
        entries: &[EntryDraft],
    ) -> Result<Vec<LedgerEntry>, StoreError>;
}

/// One atomic, isolated group of reads and writes.
#[async_trait]
pub trait UnitOfWork: AccountStore + LedgerWriter {
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Filter for the transaction history read path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryFilter {
    pub user_id: Uuid,
    pub kind: Option<TransactionKind>,
    pub offset: i64,
    pub limit: i64,
}

/// A persistent wallet store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a unit of work.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    async fn list_accounts(&self, user_id: Uuid) -> Result<Vec<Account>, StoreError>;

    /// Account by id, only if owned by `user_id`.
    async fn find_user_account(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> Result<Option<Account>, StoreError>;

    /// Newest-first page of the user's transactions plus the total match count.
    async fn list_transactions(
        &self,
        filter: &HistoryFilter,
    ) -> Result<(Vec<Transaction>, i64), StoreError>;

    /// Resolve a hashed bearer token to its user.
    async fn find_user_by_token(&self, token_hash: &str) -> Result<Option<Uuid>, StoreError>;
}
