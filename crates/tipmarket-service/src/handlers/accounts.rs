//! Account read handlers: balance, ledger history, reconciliation.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use tipmarket_core::{AccountId, LedgerEntry};
use tipmarket_engine::ReconcileReport;

use crate::auth::{AdminAuth, ServiceAuth};
use crate::error::ApiError;
use crate::state::AppState;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// The account.
    pub account_id: AccountId,
    /// Balance in credits.
    pub balance_credits: i64,
    /// Last movement timestamp.
    pub updated_at: String,
}

/// Get an account's current balance.
///
/// Accounts that never transacted report zero.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(account_id): Path<AccountId>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.engine.account_balance(account_id)?;

    Ok(Json(BalanceResponse {
        account_id,
        balance_credits: balance.balance_credits,
        updated_at: balance.updated_at.to_rfc3339(),
    }))
}

/// Ledger list query parameters.
#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    /// Maximum number of entries to return (default: 50, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// One ledger entry in a history response.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    /// Entry id.
    pub id: String,
    /// Amount in credits (positive = credit, negative = debit).
    pub amount_credits: i64,
    /// Entry kind.
    pub kind: tipmarket_core::EntryKind,
    /// Description.
    pub description: String,
    /// Balance after this entry.
    pub balance_after_credits: i64,
    /// Timestamp.
    pub created_at: String,
}

impl From<&LedgerEntry> for EntryResponse {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            amount_credits: entry.amount_credits,
            kind: entry.kind,
            description: entry.description.clone(),
            balance_after_credits: entry.balance_after_credits,
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// Ledger history response.
#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    /// Entries, newest first.
    pub entries: Vec<EntryResponse>,
    /// Whether there are more entries.
    pub has_more: bool,
}

/// List an account's ledger history.
pub async fn list_ledger(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(account_id): Path<AccountId>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<LedgerResponse>, ApiError> {
    // Fetch one more than requested to determine has_more
    let limit = query.limit.min(100);
    let entries = state
        .engine
        .ledger_page(account_id, limit + 1, query.offset)?;

    let has_more = entries.len() > limit;
    let entries: Vec<_> = entries.iter().take(limit).map(EntryResponse::from).collect();

    Ok(Json(LedgerResponse { entries, has_more }))
}

/// Check that an account's balance equals the sum of its ledger
/// entries.
pub async fn reconcile(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Path(account_id): Path<AccountId>,
) -> Result<Json<ReconcileReport>, ApiError> {
    let report = state.engine.reconcile(account_id)?;
    if !report.consistent {
        tracing::error!(%account_id, ?report, "ledger reconciliation mismatch");
    }
    Ok(Json(report))
}
