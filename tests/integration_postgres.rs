//! PostgreSQL Integration Tests
//!
//! Run only when DATABASE_URL is set. Every test provisions its own users
//! with unique emails, so no truncation is needed between runs.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;

use wallet_ledger::domain::DomainError;
use wallet_ledger::engine::retry::with_retry;
use wallet_ledger::engine::{ExchangeCommand, TransferCommand};
use wallet_ledger::store::{PgStore, Store};
use wallet_ledger::{
    Currency, HistoryQuery, Money, MovementEngine, MovementError, OperationContext, RetryPolicy,
    TransactionHistory, TransactionKind,
};

mod common;

use common::{pg_pool, seed_pg_user, usd_eur};

fn engine(store: &PgStore) -> MovementEngine {
    MovementEngine::new(Arc::new(store.clone()), Arc::new(usd_eur(dec!(0.92))))
}

async fn balance(store: &PgStore, user_id: uuid::Uuid, account_id: uuid::Uuid) -> Money {
    store
        .find_user_account(user_id, account_id)
        .await
        .unwrap()
        .expect("account exists")
        .balance
}

async fn ledger_rows_for(store: &PgStore, account_id: uuid::Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM ledger_entries WHERE account_id = $1")
        .bind(account_id)
        .fetch_one(store.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_schema_is_complete_after_migrations() {
    let Some(pool) = pg_pool().await else { return };

    assert!(wallet_ledger::db::check_schema(&pool).await.unwrap());
}

#[tokio::test]
async fn test_failed_provisioning_keeps_nothing() {
    let Some(pool) = pg_pool().await else { return };
    let store = PgStore::new(pool);
    let email = format!("user-{}@example.com", uuid::Uuid::new_v4().simple());

    // The second USD account violates UNIQUE(user_id, currency)
    let result = store
        .provision_user(
            &email,
            &[(Currency::Usd, Money::new(dec!(10))), (Currency::Usd, Money::zero())],
            &format!("hash-{}", uuid::Uuid::new_v4().simple()),
        )
        .await;

    assert!(result.is_err());
    assert_eq!(store.find_user_id_by_email(&email).await.unwrap(), None);
}

#[tokio::test]
async fn test_transfer_and_exchange_persist() {
    let Some(pool) = pg_pool().await else { return };
    let store = PgStore::new(pool);
    let engine = engine(&store);
    let alice = seed_pg_user(&store, Money::new(dec!(1000)), Money::new(dec!(500))).await;
    let bob = seed_pg_user(&store, Money::new(dec!(1000)), Money::new(dec!(500))).await;
    let ctx = OperationContext::new();

    let command = TransferCommand::new(alice.id, bob.email.clone(), dec!(200), Currency::Usd);
    let tx = engine.transfer(&command, &ctx).await.unwrap();
    assert_eq!(tx.entries.len(), 2);

    let command = ExchangeCommand::new(alice.id, Currency::Usd, Currency::Eur, dec!(100));
    engine.exchange(&command, &ctx).await.unwrap();

    assert_eq!(balance(&store, alice.id, alice.usd.id).await.to_string(), "700.00");
    assert_eq!(balance(&store, alice.id, alice.eur.id).await.to_string(), "592.00");
    assert_eq!(balance(&store, bob.id, bob.usd.id).await.to_string(), "1200.00");

    let history = TransactionHistory::new(Arc::new(store.clone()));
    let page = history.list(alice.id, &HistoryQuery::default()).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].kind, TransactionKind::Exchange);
    assert_eq!(page.items[0].entries[0].amount.to_string(), "-100.00");
    assert_eq!(page.items[0].entries[1].amount.to_string(), "92.00");
    assert_eq!(page.items[1].kind, TransactionKind::Transfer);

    let user_id = store.find_user_by_token(&wallet_ledger::api::hash_token(&alice.token)).await.unwrap();
    assert_eq!(user_id, Some(alice.id));
}

#[tokio::test]
async fn test_rejected_transfer_leaves_no_rows() {
    let Some(pool) = pg_pool().await else { return };
    let store = PgStore::new(pool);
    let engine = engine(&store);
    let alice = seed_pg_user(&store, Money::new(dec!(50)), Money::zero()).await;
    let bob = seed_pg_user(&store, Money::zero(), Money::zero()).await;

    let command = TransferCommand::new(alice.id, bob.email.clone(), dec!(50.01), Currency::Usd);
    let err = engine.transfer(&command, &OperationContext::new()).await.unwrap_err();

    assert!(matches!(
        err.domain(),
        Some(DomainError::InsufficientFunds { .. })
    ));
    assert_eq!(balance(&store, alice.id, alice.usd.id).await, Money::new(dec!(50)));
    assert_eq!(ledger_rows_for(&store, alice.usd.id).await, 0);
    assert_eq!(ledger_rows_for(&store, bob.usd.id).await, 0);
}

#[tokio::test]
async fn test_concurrent_debits_serialize_on_row_lock() {
    let Some(pool) = pg_pool().await else { return };
    let store = PgStore::new(pool);
    let engine = engine(&store);
    let alice = seed_pg_user(&store, Money::new(dec!(500)), Money::zero()).await;
    let bob = seed_pg_user(&store, Money::zero(), Money::zero()).await;
    let retry = RetryPolicy::new(5, Duration::from_millis(10));

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let engine = engine.clone();
            let email = bob.email.clone();
            let sender = alice.id;
            tokio::spawn(async move {
                let command = TransferCommand::new(sender, email, dec!(100), Currency::Usd);
                let ctx = OperationContext::new();
                with_retry(&retry, || engine.transfer(&command, &ctx)).await
            })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(MovementError::Domain(DomainError::InsufficientFunds { .. })) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(succeeded, 5);
    assert!(balance(&store, alice.id, alice.usd.id).await.is_zero());
    assert_eq!(balance(&store, bob.id, bob.usd.id).await, Money::new(dec!(500)));
    assert_eq!(ledger_rows_for(&store, alice.usd.id).await, 5);
}

#[tokio::test]
async fn test_opposing_transfers_conserve_total() {
    let Some(pool) = pg_pool().await else { return };
    let store = PgStore::new(pool).with_lock_timeout(2_000);
    let engine = engine(&store);
    let alice = seed_pg_user(&store, Money::new(dec!(1000)), Money::zero()).await;
    let bob = seed_pg_user(&store, Money::new(dec!(1000)), Money::zero()).await;
    let retry = RetryPolicy::new(10, Duration::from_millis(5));

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let engine = engine.clone();
            let (sender, recipient) = if i % 2 == 0 {
                (alice.id, bob.email.clone())
            } else {
                (bob.id, alice.email.clone())
            };
            tokio::spawn(async move {
                let command = TransferCommand::new(sender, recipient, dec!(10), Currency::Usd);
                let ctx = OperationContext::new();
                with_retry(&retry, || engine.transfer(&command, &ctx)).await
            })
        })
        .collect();

    for handle in handles {
        // Deadlocks are retried; exhausting retries is the only acceptable failure
        if let Err(err) = handle.await.unwrap() {
            assert!(err.is_retryable(), "unexpected error: {:?}", err);
        }
    }

    let total = balance(&store, alice.id, alice.usd.id)
        .await
        .checked_add(balance(&store, bob.id, bob.usd.id).await)
        .unwrap();
    assert_eq!(total, Money::new(dec!(2000)));
}
