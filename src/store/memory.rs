//! In-memory store
//!
//! A unit of work takes the store-wide lock and writes in place, logging how
//! to undo each write. `commit` forgets the log; dropping without commit
//! replays it backwards. Units of work are therefore fully serialized.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::{
    Account, Currency, EntryDraft, LedgerEntry, Money, Transaction, TransactionKind, User,
};

use super::{AccountStore, HistoryFilter, LedgerWriter, Store, StoreError, UnitOfWork};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    accounts: HashMap<Uuid, Account>,
    /// Insertion order = creation order
    transactions: Vec<Transaction>,
    tokens: HashMap<String, Uuid>,
}

impl MemoryState {
    fn account_for(&self, user_id: Uuid, currency: Currency) -> Option<&Account> {
        self.accounts
            .values()
            .find(|a| a.user_id == user_id && a.currency == currency)
    }
}

/// Store backed by process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a user. Emails are unique.
    pub async fn create_user(&self, email: &str) -> Result<User, StoreError> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == email) {
            return Err(StoreError::InvalidData(format!("email already registered: {}", email)));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Provision an account with an opening balance. One per (user, currency).
    pub async fn open_account(
        &self,
        user_id: Uuid,
        currency: Currency,
        balance: Money,
    ) -> Result<Account, StoreError> {
        let mut state = self.state.lock().await;
        if state.account_for(user_id, currency).is_some() {
            return Err(StoreError::InvalidData(format!(
                "user {} already has a {} account",
                user_id, currency
            )));
        }
        let account = Account {
            id: Uuid::new_v4(),
            user_id,
            currency,
            balance,
        };
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    pub async fn issue_token(&self, user_id: Uuid, token_hash: &str) {
        let mut state = self.state.lock().await;
        state.tokens.insert(token_hash.to_string(), user_id);
    }

    pub async fn account(&self, account_id: Uuid) -> Option<Account> {
        self.state.lock().await.accounts.get(&account_id).cloned()
    }

    pub async fn transaction_count(&self) -> usize {
        self.state.lock().await.transactions.len()
    }

    /// Sum of all balances in one currency
    pub async fn currency_total(&self, currency: Currency) -> Money {
        let state = self.state.lock().await;
        state
            .accounts
            .values()
            .filter(|a| a.currency == currency)
            .fold(Money::zero(), |acc, a| {
                acc.checked_add(a.balance).unwrap_or(acc)
            })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            undo: Vec::new(),
        }))
    }

    async fn list_accounts(&self, user_id: Uuid) -> Result<Vec<Account>, StoreError> {
        let state = self.state.lock().await;
        let mut accounts: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        accounts.sort_by_key(|a| a.currency);
        Ok(accounts)
    }

    async fn find_user_account(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> Result<Option<Account>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .get(&account_id)
            .filter(|a| a.user_id == user_id)
            .cloned())
    }

    async fn list_transactions(
        &self,
        filter: &HistoryFilter,
    ) -> Result<(Vec<Transaction>, i64), StoreError> {
        let state = self.state.lock().await;
        let owned = |account_id: &Uuid| {
            state
                .accounts
                .get(account_id)
                .map_or(false, |a| a.user_id == filter.user_id)
        };

        let matching: Vec<&Transaction> = state
            .transactions
            .iter()
            .rev()
            .filter(|t| filter.kind.map_or(true, |kind| t.kind == kind))
            .filter(|t| t.entries.iter().any(|e| owned(&e.account_id)))
            .collect();

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn find_user_by_token(&self, token_hash: &str) -> Result<Option<Uuid>, StoreError> {
        Ok(self.state.lock().await.tokens.get(token_hash).copied())
    }
}

/// How to revert one write
#[derive(Debug)]
enum Undo {
    Balance { account_id: Uuid, previous: Money },
    Transaction(Uuid),
    Entries { transaction_id: Uuid, previous_len: usize },
}

/// Unit of work holding the store lock
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    undo: Vec<Undo>,
}

impl Drop for MemoryUnitOfWork {
    fn drop(&mut self) {
        let state = &mut *self.guard;
        while let Some(undo) = self.undo.pop() {
            match undo {
                Undo::Balance { account_id, previous } => {
                    if let Some(account) = state.accounts.get_mut(&account_id) {
                        account.balance = previous;
                    }
                }
                Undo::Transaction(id) => {
                    if state.transactions.last().map(|t| t.id) == Some(id) {
                        state.transactions.pop();
                    }
                }
                Undo::Entries { transaction_id, previous_len } => {
                    if let Some(t) = state.transactions.iter_mut().rev().find(|t| t.id == transaction_id) {
                        t.entries.truncate(previous_len);
                    }
                }
            }
        }
    }
}

#[async_trait]
impl AccountStore for MemoryUnitOfWork {
    async fn find_account(
        &mut self,
        user_id: Uuid,
        currency: Currency,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self.guard.account_for(user_id, currency).cloned())
    }

    async fn find_account_by_id(&mut self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.guard.accounts.get(&account_id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .guard
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn adjust_balance(&mut self, account_id: Uuid, delta: Money) -> Result<Account, StoreError> {
        let account = self
            .guard
            .accounts
            .get_mut(&account_id)
            .ok_or(StoreError::AccountMissing(account_id))?;
        let previous = account.balance;
        account.balance = previous
            .checked_add(delta)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let updated = account.clone();

        self.undo.push(Undo::Balance { account_id, previous });
        Ok(updated)
    }
}

#[async_trait]
impl LedgerWriter for MemoryUnitOfWork {
    async fn record_transaction(
        &mut self,
        kind: TransactionKind,
        amount: Money,
    ) -> Result<Transaction, StoreError> {
        let transaction = Transaction {
            id: Uuid::new_v4(),
            kind,
            amount,
            created_at: Utc::now(),
            entries: Vec::new(),
        };
        self.guard.transactions.push(transaction.clone());
        self.undo.push(Undo::Transaction(transaction.id));
        Ok(transaction)
    }

    async fn append_entries(
        &mut self,
        transaction_id: Uuid,
        entries: &[EntryDraft],
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        for draft in entries {
            if !self.guard.accounts.contains_key(&draft.account_id) {
                return Err(StoreError::AccountMissing(draft.account_id));
            }
        }

        let written: Vec<LedgerEntry> = entries
            .iter()
            .map(|draft| LedgerEntry {
                id: Uuid::new_v4(),
                transaction_id,
                account_id: draft.account_id,
                currency: draft.currency,
                amount: draft.amount,
            })
            .collect();

        // Newest first: the transaction was almost always just recorded
        let transaction = self
            .guard
            .transactions
            .iter_mut()
            .rev()
            .find(|t| t.id == transaction_id)
            .ok_or_else(|| StoreError::InvalidData(format!("unknown transaction {}", transaction_id)))?;
        let previous_len = transaction.entries.len();
        transaction.entries.extend(written.iter().cloned());

        self.undo.push(Undo::Entries {
            transaction_id,
            previous_len,
        });

        Ok(written)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut this = self;
        this.undo.clear();
        Ok(())
    }
}
