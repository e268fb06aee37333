//! Settlement handlers: top-up confirmations and purchase completions.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use tipmarket_core::{AccountId, PurchaseId};
use tipmarket_engine::{PurchaseOutcome, TopUpOutcome};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Top-up confirmation request.
#[derive(Debug, Deserialize)]
pub struct ConfirmTopUpRequest {
    /// The account to credit.
    pub account_id: AccountId,
    /// Amount in credits.
    pub amount_credits: i64,
    /// Payment gateway reference; replaying it is a no-op.
    pub payment_ref: String,
}

/// Settle a confirmed payment-gateway top-up.
pub async fn confirm_top_up(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(req): Json<ConfirmTopUpRequest>,
) -> Result<Json<TopUpOutcome>, ApiError> {
    tracing::debug!(service = %auth.service_name, account_id = %req.account_id, "top-up confirm");
    let outcome = state
        .engine
        .confirm_top_up(req.account_id, req.amount_credits, &req.payment_ref)?;
    Ok(Json(outcome))
}

/// Purchase completion request.
#[derive(Debug, Deserialize)]
pub struct CompletePurchaseRequest {
    /// The buyer to debit.
    pub buyer_id: AccountId,
    /// The seller to credit.
    pub seller_id: AccountId,
    /// The purchase; replaying it is a no-op.
    pub purchase_id: PurchaseId,
    /// Ticket price in credits.
    pub price_credits: i64,
}

/// Settle a completed ticket purchase.
pub async fn complete_purchase(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(req): Json<CompletePurchaseRequest>,
) -> Result<Json<PurchaseOutcome>, ApiError> {
    tracing::debug!(
        service = %auth.service_name,
        purchase_id = %req.purchase_id,
        "purchase complete"
    );
    let outcome = state.engine.complete_purchase(
        req.buyer_id,
        req.seller_id,
        req.purchase_id,
        req.price_credits,
    )?;
    Ok(Json(outcome))
}
