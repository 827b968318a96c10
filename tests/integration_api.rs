//! API Integration Tests
//!
//! Drive the full router (auth, handlers, retry, error mapping) over the
//! in-memory store.

use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use wallet_ledger::Currency;

mod common;

use common::{memory_app, send};

#[tokio::test]
async fn test_health_needs_no_auth() {
    let app = memory_app().await;

    let response = tower::util::ServiceExt::oneshot(
        app.router.clone(),
        axum::http::Request::builder()
            .uri("/health")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_correlation_id_is_echoed_or_generated() {
    let app = memory_app().await;
    let request = |correlation: Option<&str>| {
        let mut builder = axum::http::Request::builder()
            .uri("/api/v1/accounts")
            .header("authorization", format!("Bearer {}", app.alice.token));
        if let Some(id) = correlation {
            builder = builder.header("x-correlation-id", id);
        }
        builder.body(axum::body::Body::empty()).unwrap()
    };

    let given = Uuid::new_v4().to_string();
    let response = tower::util::ServiceExt::oneshot(app.router.clone(), request(Some(&given)))
        .await
        .unwrap();
    assert_eq!(response.headers()["x-correlation-id"], given.as_str());

    let response = tower::util::ServiceExt::oneshot(app.router.clone(), request(None))
        .await
        .unwrap();
    let generated = response.headers()["x-correlation-id"].to_str().unwrap();
    assert!(Uuid::parse_str(generated).is_ok());
}

#[tokio::test]
async fn test_requests_without_valid_token_are_rejected() {
    let app = memory_app().await;

    let (status, body) = send(&app.router, "GET", "/api/v1/accounts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "missing_token");

    let (status, body) = send(&app.router, "GET", "/api/v1/accounts", Some("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "invalid_token");
}

#[tokio::test]
async fn test_transfer_then_exchange_e2e() {
    let app = memory_app().await;
    let alice = &app.alice;

    // 1. Alice sends Bob 200.00 USD
    let (status, tx) = send(
        &app.router,
        "POST",
        "/api/v1/transactions/transfer",
        Some(&alice.token),
        Some(json!({
            "recipient_email": "bob@example.com",
            "amount": "200.00",
            "currency": "USD"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "Transfer failed: {}", tx);
    assert_eq!(tx["type"], "TRANSFER");
    assert_eq!(tx["amount"], "200.00");
    assert_eq!(tx["entries"][0]["amount"], "-200.00");
    assert_eq!(tx["entries"][1]["amount"], "200.00");

    // 2. Alice exchanges 100.00 USD into EUR
    let (status, tx) = send(
        &app.router,
        "POST",
        "/api/v1/transactions/exchange",
        Some(&alice.token),
        Some(json!({
            "from_currency": "USD",
            "to_currency": "EUR",
            "from_amount": 100
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "Exchange failed: {}", tx);
    assert_eq!(tx["type"], "EXCHANGE");
    assert_eq!(tx["amount"], "100.00");
    assert_eq!(tx["entries"][0]["currency"], "USD");
    assert_eq!(tx["entries"][0]["amount"], "-100.00");
    assert_eq!(tx["entries"][1]["currency"], "EUR");
    assert_eq!(tx["entries"][1]["amount"], "92.00");

    // 3. Balances
    let (status, body) = send(
        &app.router,
        "GET",
        &format!("/api/v1/accounts/{}/balance", alice.usd.id),
        Some(&alice.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], "700.00");
    assert_eq!(body["currency"], "USD");

    let (_, body) = send(
        &app.router,
        "GET",
        &format!("/api/v1/accounts/{}/balance", alice.eur.id),
        Some(&alice.token),
        None,
    )
    .await;
    assert_eq!(body["balance"], "592.00");

    let (_, body) = send(
        &app.router,
        "GET",
        &format!("/api/v1/accounts/{}/balance", app.bob.usd.id),
        Some(&app.bob.token),
        None,
    )
    .await;
    assert_eq!(body["balance"], "1200.00");
}

#[tokio::test]
async fn test_transfer_error_mapping() {
    let app = memory_app().await;
    let token = app.alice.token.as_str();

    let cases: Vec<(Value, StatusCode, &str)> = vec![
        (
            json!({"recipient_email": "bob@example.com", "amount": "0", "currency": "USD"}),
            StatusCode::BAD_REQUEST,
            "invalid_amount",
        ),
        (
            json!({"recipient_email": "bob@example.com", "amount": "5000", "currency": "USD"}),
            StatusCode::BAD_REQUEST,
            "insufficient_funds",
        ),
        (
            json!({"recipient_email": "ghost@example.com", "amount": "1", "currency": "USD"}),
            StatusCode::NOT_FOUND,
            "recipient_not_found",
        ),
        (
            json!({"recipient_email": "alice@example.com", "amount": "1", "currency": "EUR"}),
            StatusCode::BAD_REQUEST,
            "self_transfer",
        ),
        (
            json!({"recipient_email": "not-an-email", "amount": "1", "currency": "USD"}),
            StatusCode::BAD_REQUEST,
            "invalid_request",
        ),
        (
            json!({"recipient_email": "bob@example.com", "amount": "1", "currency": "JPY"}),
            StatusCode::BAD_REQUEST,
            "invalid_request",
        ),
    ];

    for (body, expected_status, expected_code) in cases {
        let (status, response) = send(
            &app.router,
            "POST",
            "/api/v1/transactions/transfer",
            Some(token),
            Some(body.clone()),
        )
        .await;
        assert_eq!(status, expected_status, "body {} -> {}", body, response);
        assert_eq!(response["error_code"], expected_code, "body {}", body);
    }

    assert_eq!(app.store.transaction_count().await, 0);
}

#[tokio::test]
async fn test_unparsable_amounts_are_invalid_amount() {
    let app = memory_app().await;
    let token = app.alice.token.as_str();

    for raw in ["abc", "NaN", ""] {
        let (status, body) = send(
            &app.router,
            "POST",
            "/api/v1/transactions/transfer",
            Some(token),
            Some(json!({"recipient_email": "bob@example.com", "amount": raw, "currency": "USD"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "transfer amount {:?}", raw);
        assert_eq!(body["error_code"], "invalid_amount", "transfer amount {:?}", raw);

        let (status, body) = send(
            &app.router,
            "POST",
            "/api/v1/transactions/exchange",
            Some(token),
            Some(json!({"from_currency": "USD", "to_currency": "EUR", "from_amount": raw})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "exchange amount {:?}", raw);
        assert_eq!(body["error_code"], "invalid_amount", "exchange amount {:?}", raw);
    }

    assert_eq!(app.store.transaction_count().await, 0);
}

#[tokio::test]
async fn test_recipient_without_account_in_currency() {
    let app = memory_app().await;
    let carol = app.store.create_user("carol@example.com").await.unwrap();
    app.store
        .open_account(carol.id, Currency::Eur, wallet_ledger::Money::zero())
        .await
        .unwrap();

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/transactions/transfer",
        Some(&app.alice.token),
        Some(json!({"recipient_email": "carol@example.com", "amount": "10", "currency": "USD"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "recipient_account_missing");
}

#[tokio::test]
async fn test_same_currency_exchange_rejected() {
    let app = memory_app().await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/v1/transactions/exchange",
        Some(&app.alice.token),
        Some(json!({"from_currency": "EUR", "to_currency": "EUR", "from_amount": "10"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "same_currency_exchange");
}

#[tokio::test]
async fn test_history_pagination_and_filter() {
    let app = memory_app().await;
    let token = app.alice.token.as_str();

    for amount in ["1.00", "2.00", "3.00"] {
        let (status, _) = send(
            &app.router,
            "POST",
            "/api/v1/transactions/transfer",
            Some(token),
            Some(json!({"recipient_email": "bob@example.com", "amount": amount, "currency": "USD"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = send(
        &app.router,
        "POST",
        "/api/v1/transactions/exchange",
        Some(token),
        Some(json!({"from_currency": "EUR", "to_currency": "USD", "from_amount": "4.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, page) = send(&app.router, "GET", "/api/v1/transactions?page=1&limit=2", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 4);
    assert_eq!(page["last_page"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["items"][0]["type"], "EXCHANGE");
    assert_eq!(page["items"][1]["amount"], "3.00");

    let (_, page) = send(&app.router, "GET", "/api/v1/transactions?type=TRANSFER", Some(token), None).await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["limit"], 10);

    // Out-of-range limit is clamped
    let (_, page) = send(&app.router, "GET", "/api/v1/transactions?limit=500", Some(token), None).await;
    assert_eq!(page["limit"], 100);

    let (status, body) = send(&app.router, "GET", "/api/v1/transactions?type=REFUND", Some(token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_request");

    // Bob only sees the transfers he received
    let (_, page) = send(&app.router, "GET", "/api/v1/transactions", Some(&app.bob.token), None).await;
    assert_eq!(page["total"], 3);
}

#[tokio::test]
async fn test_accounts_are_scoped_to_caller() {
    let app = memory_app().await;

    let (status, body) = send(&app.router, "GET", "/api/v1/accounts", Some(&app.alice.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let accounts = body["accounts"].as_array().unwrap();
    assert_eq!(accounts.len(), 2);
    assert!(accounts
        .iter()
        .all(|a| a["user_id"] == app.alice.id.to_string()));

    // Bob's account is invisible to Alice
    let (status, body) = send(
        &app.router,
        "GET",
        &format!("/api/v1/accounts/{}/balance", app.bob.usd.id),
        Some(&app.alice.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "account_not_found");

    let (status, _) = send(
        &app.router,
        "GET",
        &format!("/api/v1/accounts/{}/balance", Uuid::new_v4()),
        Some(&app.alice.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_transfers_over_http() {
    let app = memory_app().await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let router = app.router.clone();
            let token = app.alice.token.clone();
            tokio::spawn(async move {
                send(
                    &router,
                    "POST",
                    "/api/v1/transactions/transfer",
                    Some(&token),
                    Some(json!({"recipient_email": "bob@example.com", "amount": "300", "currency": "USD"})),
                )
                .await
                .0
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::BAD_REQUEST => {}
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(created, 3);
    let balance = app.store.account(app.alice.usd.id).await.unwrap().balance;
    assert_eq!(balance.to_string(), "100.00");
}
