//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, bonus, cases, health, settlements};
use crate::state::AppState;

/// Maximum concurrent requests for settlement endpoints.
/// Settlements serialize per account anyway; this caps queue depth.
const SETTLEMENT_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Settlements (service API key)
/// - `POST /v1/topups/confirm` - Settle a confirmed top-up
/// - `POST /v1/purchases/complete` - Settle a completed purchase
///
/// ## Accounts (service API key; reconcile is admin)
/// - `GET /v1/accounts/:id/balance` - Current balance
/// - `GET /v1/accounts/:id/ledger` - Ledger history, newest first
/// - `GET /v1/accounts/:id/reconcile` - Balance vs. ledger sum
///
/// ## Cases (service API key; decisions are admin)
/// - `POST /v1/cases` - Open a case
/// - `GET /v1/cases/:id` - Fetch a case
/// - `POST /v1/cases/:id/replies` - Append a reply
/// - `POST /v1/cases/:id/status` - Transition status (admin)
/// - `POST /v1/cases/:id/refund` - Settle a refund (admin)
///
/// ## Bonus (admin API key)
/// - `POST /v1/bonus/run` - Run the weekly distribution
/// - `GET /v1/bonus/weeks/:week_start` - List a week's paid rewards
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Settlement callbacks arrive in bursts from the platform.
    let settlement_routes = Router::new()
        .route("/topups/confirm", post(settlements::confirm_top_up))
        .route("/purchases/complete", post(settlements::complete_purchase))
        .layer(ConcurrencyLimitLayer::new(SETTLEMENT_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Accounts
        .route("/accounts/:id/balance", get(accounts::get_balance))
        .route("/accounts/:id/ledger", get(accounts::list_ledger))
        .route("/accounts/:id/reconcile", get(accounts::reconcile))
        // Cases
        .route("/cases", post(cases::open_case))
        .route("/cases/:id", get(cases::get_case))
        .route("/cases/:id/replies", post(cases::add_reply))
        .route("/cases/:id/status", post(cases::transition))
        .route("/cases/:id/refund", post(cases::refund))
        // Bonus distribution
        .route("/bonus/run", post(bonus::run_distribution))
        .route("/bonus/weeks/:week_start", get(bonus::list_week_rewards))
        // Settlement routes (with their own concurrency limit)
        .merge(settlement_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // API v1 routes
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
