//! Tipmarket HTTP API service.
//!
//! Exposes the settlement engine over HTTP:
//!
//! - Top-up confirmation and purchase completion (platform callbacks)
//! - Support cases: open, reply, transition, refund
//! - Weekly bonus runs
//! - Balance, ledger history, and reconciliation reads
//!
//! # Authentication
//!
//! Two static keys, both configured through the environment:
//!
//! 1. **Service API key** (`X-Api-Key`) - platform-to-ledger requests
//! 2. **Admin API key** (`X-Admin-Key`) - support staff and operational
//!    endpoints (case decisions, refunds, bonus runs, reconciliation)

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers are async for Axum even over a sync engine

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
