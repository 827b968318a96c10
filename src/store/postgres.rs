//! PostgreSQL store
//!
//! Units of work run at READ COMMITTED. Every account read inside a unit of
//! work takes a row lock (`FOR UPDATE`), so two debits of the same account
//! serialize on that row and the second one sees the committed balance.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction as PgTransaction};
use uuid::Uuid;

use crate::domain::{
    Account, Currency, EntryDraft, LedgerEntry, Money, Transaction, TransactionKind, User,
};

use super::{AccountStore, HistoryFilter, LedgerWriter, Store, StoreError, UnitOfWork};

type AccountRow = (Uuid, Uuid, String, Decimal);
type TransactionRow = (Uuid, String, Decimal, DateTime<Utc>);
type EntryRow = (Uuid, Uuid, Uuid, String, Decimal);

fn parse_currency(raw: &str) -> Result<Currency, StoreError> {
    Currency::from_str(raw).map_err(|e| StoreError::InvalidData(e.to_string()))
}

fn account_from_row((id, user_id, currency, balance): AccountRow) -> Result<Account, StoreError> {
    Ok(Account {
        id,
        user_id,
        currency: parse_currency(&currency)?,
        balance: Money::new(balance),
    })
}

fn transaction_from_row((id, kind, amount, created_at): TransactionRow) -> Result<Transaction, StoreError> {
    Ok(Transaction {
        id,
        kind: TransactionKind::from_str(&kind).map_err(|e| StoreError::InvalidData(e.to_string()))?,
        amount: Money::new(amount),
        created_at,
        entries: Vec::new(),
    })
}

fn entry_from_row((id, transaction_id, account_id, currency, amount): EntryRow) -> Result<LedgerEntry, StoreError> {
    Ok(LedgerEntry {
        id,
        transaction_id,
        account_id,
        currency: parse_currency(&currency)?,
        amount: Money::new(amount),
    })
}

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl PgStore {
    /// Create a new PgStore with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout_ms: 0,
        }
    }

    /// Abort lock waits inside a unit of work after `ms` milliseconds (0 = wait forever).
    pub fn with_lock_timeout(mut self, ms: u64) -> Self {
        self.lock_timeout_ms = ms;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    // Provisioning (used by the seed binary and tests)
    // =========================================================================

    /// Insert a user, one account per `(currency, opening balance)` and an
    /// access token hash in a single transaction. Nothing is kept if any
    /// insert fails.
    pub async fn provision_user(
        &self,
        email: &str,
        balances: &[(Currency, Money)],
        token_hash: &str,
    ) -> Result<(User, Vec<Account>), StoreError> {
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO users (email)
            VALUES ($1)
            RETURNING id
            "#,
        )
        .bind(email)
        .fetch_one(&mut *tx)
        .await?;

        let mut accounts = Vec::with_capacity(balances.len());
        for (currency, balance) in balances {
            let row: AccountRow = sqlx::query_as(
                r#"
                INSERT INTO accounts (user_id, currency, balance)
                VALUES ($1, $2, $3)
                RETURNING id, user_id, currency, balance
                "#,
            )
            .bind(id)
            .bind(currency.as_str())
            .bind(balance.value())
            .fetch_one(&mut *tx)
            .await?;
            accounts.push(account_from_row(row)?);
        }

        sqlx::query(
            r#"
            INSERT INTO access_tokens (token_hash, user_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(token_hash)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let user = User {
            id,
            email: email.to_string(),
        };
        Ok((user, accounts))
    }

    pub async fn find_user_id_by_email(&self, email: &str) -> Result<Option<Uuid>, StoreError> {
        let id = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    /// Load ledger entries for a set of transactions, in leg order
    async fn load_entries(&self, transaction_ids: &[Uuid]) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows: Vec<EntryRow> = sqlx::query_as(
            r#"
            SELECT le.id, le.transaction_id, le.account_id, a.currency, le.amount
            FROM ledger_entries le
            JOIN accounts a ON a.id = le.account_id
            WHERE le.transaction_id = ANY($1)
            ORDER BY le.transaction_id, le.leg
            "#,
        )
        .bind(transaction_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(entry_from_row).collect()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let mut tx = self.pool.begin().await?;

        if self.lock_timeout_ms > 0 {
            // SET does not take bind parameters
            sqlx::query(&format!("SET LOCAL lock_timeout = {}", self.lock_timeout_ms))
                .execute(&mut *tx)
                .await?;
        }

        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn list_accounts(&self, user_id: Uuid) -> Result<Vec<Account>, StoreError> {
        let rows: Vec<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, currency, balance
            FROM accounts
            WHERE user_id = $1
            ORDER BY currency
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(account_from_row).collect()
    }

    async fn find_user_account(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, currency, balance
            FROM accounts
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(account_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(account_from_row).transpose()
    }

    async fn list_transactions(
        &self,
        filter: &HistoryFilter,
    ) -> Result<(Vec<Transaction>, i64), StoreError> {
        let kind = filter.kind.map(|k| k.as_str());

        let rows: Vec<TransactionRow> = sqlx::query_as(
            r#"
            SELECT t.id, t.kind, t.amount, t.created_at
            FROM transactions t
            WHERE EXISTS (
                SELECT 1 FROM ledger_entries le
                JOIN accounts a ON a.id = le.account_id
                WHERE le.transaction_id = t.id AND a.user_id = $1
            )
            AND ($2::text IS NULL OR t.kind = $2)
            ORDER BY t.created_at DESC, t.seq DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.user_id)
        .bind(kind)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM transactions t
            WHERE EXISTS (
                SELECT 1 FROM ledger_entries le
                JOIN accounts a ON a.id = le.account_id
                WHERE le.transaction_id = t.id AND a.user_id = $1
            )
            AND ($2::text IS NULL OR t.kind = $2)
            "#,
        )
        .bind(filter.user_id)
        .bind(kind)
        .fetch_one(&self.pool)
        .await?;

        let mut transactions = rows
            .into_iter()
            .map(transaction_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let ids: Vec<Uuid> = transactions.iter().map(|t| t.id).collect();
        for entry in self.load_entries(&ids).await? {
            if let Some(t) = transactions.iter_mut().find(|t| t.id == entry.transaction_id) {
                t.entries.push(entry);
            }
        }

        Ok((transactions, total))
    }

    async fn find_user_by_token(&self, token_hash: &str) -> Result<Option<Uuid>, StoreError> {
        let user_id = sqlx::query_scalar(
            r#"
            SELECT user_id FROM access_tokens
            WHERE token_hash = $1 AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user_id)
    }
}

/// Unit of work over one database transaction.
/// Dropping it without `commit` rolls the transaction back.
pub struct PgUnitOfWork {
    tx: PgTransaction<'static, Postgres>,
}

#[async_trait]
impl AccountStore for PgUnitOfWork {
    async fn find_account(
        &mut self,
        user_id: Uuid,
        currency: Currency,
    ) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, currency, balance
            FROM accounts
            WHERE user_id = $1 AND currency = $2
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(currency.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(account_from_row).transpose()
    }

    async fn find_account_by_id(&mut self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, currency, balance
            FROM accounts
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(account_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(account_from_row).transpose()
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        let row: Option<(Uuid, String)> = sqlx::query_as("SELECT id, email FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(|(id, email)| User { id, email }))
    }

    async fn adjust_balance(&mut self, account_id: Uuid, delta: Money) -> Result<Account, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            UPDATE accounts
            SET balance = balance + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, currency, balance
            "#,
        )
        .bind(account_id)
        .bind(delta.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(account_from_row)
            .transpose()?
            .ok_or(StoreError::AccountMissing(account_id))
    }
}

#[async_trait]
impl LedgerWriter for PgUnitOfWork {
    async fn record_transaction(
        &mut self,
        kind: TransactionKind,
        amount: Money,
    ) -> Result<Transaction, StoreError> {
        let row: TransactionRow = sqlx::query_as(
            r#"
            INSERT INTO transactions (kind, amount)
            VALUES ($1, $2)
            RETURNING id, kind, amount, created_at
            "#,
        )
        .bind(kind.as_str())
        .bind(amount.value())
        .fetch_one(&mut *self.tx)
        .await?;

        transaction_from_row(row)
    }

    async fn append_entries(
        &mut self,
        transaction_id: Uuid,
        entries: &[EntryDraft],
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let mut written = Vec::with_capacity(entries.len());

        for (leg, draft) in entries.iter().enumerate() {
            let id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO ledger_entries (transaction_id, account_id, leg, amount)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(transaction_id)
            .bind(draft.account_id)
            .bind(leg as i16)
            .bind(draft.amount.value())
            .fetch_one(&mut *self.tx)
            .await?;

            written.push(LedgerEntry {
                id,
                transaction_id,
                account_id: draft.account_id,
                currency: draft.currency,
                amount: draft.amount,
            });
        }

        Ok(written)
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let PgUnitOfWork { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}
