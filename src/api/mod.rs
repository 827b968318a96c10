//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::domain::RateProvider;
use crate::engine::{MovementEngine, RetryPolicy};
use crate::history::TransactionHistory;
use crate::store::Store;

pub use middleware::{hash_token, AuthenticatedUser};
pub use routes::create_router;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub engine: MovementEngine,
    pub history: TransactionHistory,
    pub retry: RetryPolicy,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, rates: Arc<dyn RateProvider>, retry: RetryPolicy) -> Self {
        Self {
            engine: MovementEngine::new(store.clone(), rates),
            history: TransactionHistory::new(store.clone()),
            store,
            retry,
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Axum layers run last-added first: logging -> auth -> handler
    let protected_routes = create_router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::logging_middleware));

    Router::new()
        // Health check (no auth)
        .route("/health", axum::routing::get(health_check))
        .nest("/api/v1", protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
