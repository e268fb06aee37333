//! Support case handlers: open, read, reply, transition, refund.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use tipmarket_core::{AccountId, Case, CaseId, CaseStatus, PurchaseId};
use tipmarket_engine::RefundOutcome;

use crate::auth::{AdminAuth, ServiceAuth};
use crate::error::ApiError;
use crate::state::AppState;

/// Case creation request.
#[derive(Debug, Deserialize)]
pub struct OpenCaseRequest {
    /// The buyer opening the dispute.
    pub buyer_id: AccountId,
    /// The seller of the disputed purchase.
    pub seller_id: AccountId,
    /// The disputed purchase.
    pub purchase_id: PurchaseId,
    /// Amount in dispute, in credits.
    pub amount_in_dispute_credits: i64,
}

/// Open a support case over a disputed purchase.
pub async fn open_case(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(req): Json<OpenCaseRequest>,
) -> Result<Json<Case>, ApiError> {
    let case = state.engine.open_case(
        req.buyer_id,
        req.seller_id,
        req.purchase_id,
        req.amount_in_dispute_credits,
    )?;
    Ok(Json(case))
}

/// Fetch a case with its reply thread.
pub async fn get_case(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(case_id): Path<CaseId>,
) -> Result<Json<Case>, ApiError> {
    Ok(Json(state.engine.get_case(&case_id)?))
}

/// Case reply request.
#[derive(Debug, Deserialize)]
pub struct AddReplyRequest {
    /// Who wrote the reply.
    pub author_id: AccountId,
    /// Reply body.
    pub body: String,
}

/// Append a reply to a case thread.
pub async fn add_reply(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(case_id): Path<CaseId>,
    Json(req): Json<AddReplyRequest>,
) -> Result<Json<Case>, ApiError> {
    let case = state
        .engine
        .add_case_reply(&case_id, req.author_id, req.body)?;
    Ok(Json(case))
}

/// Status transition request.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    /// Target status.
    pub status: CaseStatus,
}

/// Transition a case's status (support staff decision).
pub async fn transition(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Path(case_id): Path<CaseId>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<Case>, ApiError> {
    Ok(Json(state.engine.transition_case(&case_id, req.status)?))
}

/// Refund request.
#[derive(Debug, Deserialize, Default)]
pub struct RefundRequest {
    /// Amount to refund; defaults to the case's disputed amount.
    #[serde(default)]
    pub amount_credits: Option<i64>,
}

/// Settle an approved refund on a case.
pub async fn refund(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Path(case_id): Path<CaseId>,
    Json(req): Json<RefundRequest>,
) -> Result<Json<RefundOutcome>, ApiError> {
    Ok(Json(state.engine.approve_refund(&case_id, req.amount_credits)?))
}
