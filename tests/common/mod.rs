//! Common test utilities
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use rust_decimal_macros::dec;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::util::ServiceExt;
use uuid::Uuid;

use wallet_ledger::api::{self, hash_token, AppState};
use wallet_ledger::domain::{Account, FixedRateProvider, Rate};
use wallet_ledger::store::{MemoryStore, PgStore};
use wallet_ledger::{Currency, Money, RetryPolicy};

pub struct SeededUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
    pub usd: Account,
    pub eur: Account,
}

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub alice: SeededUser,
    pub bob: SeededUser,
}

pub fn usd_eur(rate: rust_decimal::Decimal) -> FixedRateProvider {
    FixedRateProvider::usd_eur(Rate::new(rate).unwrap())
}

async fn seed_memory_user(store: &MemoryStore, email: &str) -> SeededUser {
    let user = store.create_user(email).await.unwrap();
    let usd = store
        .open_account(user.id, Currency::Usd, Money::new(dec!(1000.00)))
        .await
        .unwrap();
    let eur = store
        .open_account(user.id, Currency::Eur, Money::new(dec!(500.00)))
        .await
        .unwrap();
    let token = format!("token-{}", Uuid::new_v4().simple());
    store.issue_token(user.id, &hash_token(&token)).await;
    SeededUser {
        id: user.id,
        email: email.to_string(),
        token,
        usd,
        eur,
    }
}

/// Router over a fresh MemoryStore with Alice and Bob (USD 1000.00, EUR 500.00 each)
pub async fn memory_app() -> TestApp {
    let store = MemoryStore::new();
    let alice = seed_memory_user(&store, "alice@example.com").await;
    let bob = seed_memory_user(&store, "bob@example.com").await;

    let state = AppState::new(
        Arc::new(store.clone()),
        Arc::new(usd_eur(dec!(0.92))),
        RetryPolicy::new(3, Duration::from_millis(5)),
    );

    TestApp {
        router: api::build_router(state),
        store,
        alice,
        bob,
    }
}

/// Send a request and decode the JSON body (Null when empty or not JSON)
pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Connect and migrate when DATABASE_URL is set; None skips the test
pub async fn pg_pool() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping PostgreSQL test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    wallet_ledger::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

/// A user with unique email so tests never collide on a shared database
pub async fn seed_pg_user(store: &PgStore, usd: Money, eur: Money) -> SeededUser {
    let email = format!("user-{}@example.com", Uuid::new_v4().simple());
    let token = format!("token-{}", Uuid::new_v4().simple());
    let (user, accounts) = store
        .provision_user(
            &email,
            &[(Currency::Usd, usd), (Currency::Eur, eur)],
            &hash_token(&token),
        )
        .await
        .unwrap();
    let (usd, eur) = (accounts[0].clone(), accounts[1].clone());
    SeededUser {
        id: user.id,
        email,
        token,
        usd,
        eur,
    }
}
