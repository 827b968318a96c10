//! Seed Tool
//!
//! Applies migrations and provisions demo users with USD and EUR accounts.
//! Each new user gets one access token, printed once; only its hash is stored.
//!
//! Run with: cargo run --bin seed

use rand::RngCore;
use rust_decimal::Decimal;

use wallet_ledger::api::hash_token;
use wallet_ledger::store::PgStore;
use wallet_ledger::{db, Config, Currency, Money};

const DEMO_USERS: [&str; 3] = ["alice@example.com", "bob@example.com", "charlie@example.com"];

fn opening_balance(currency: Currency) -> Money {
    match currency {
        Currency::Usd => Money::new(Decimal::new(100_000, 2)),
        Currency::Eur => Money::new(Decimal::new(50_000, 2)),
    }
}

fn new_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    println!("Connecting to database...");
    let pool = db::connect(&config).await?;

    println!("Running migrations...");
    db::run_migrations(&pool).await?;

    let store = PgStore::new(pool.clone());

    println!("\n=== Seeded Users ===");
    for email in DEMO_USERS {
        if store.find_user_id_by_email(email).await?.is_some() {
            println!("{:<24} already exists, skipped", email);
            continue;
        }

        let balances: Vec<(Currency, Money)> = Currency::ALL
            .into_iter()
            .map(|currency| (currency, opening_balance(currency)))
            .collect();

        let token = new_token();
        let (user, _) = store
            .provision_user(email, &balances, &hash_token(&token))
            .await?;

        println!("{:<24} user_id={} token={}", email, user.id, token);
    }

    pool.close().await;
    Ok(())
}
