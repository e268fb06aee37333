//! Weekly bonus distribution handler.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use tipmarket_core::WeeklyReward;
use tipmarket_engine::BonusRunReport;

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Bonus run request.
#[derive(Debug, Deserialize, Default)]
pub struct BonusRunRequest {
    /// Resolve the previous week relative to this instant instead of
    /// now. Intended for catch-up runs.
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}

/// Run the weekly bonus distribution. Safe to repeat.
pub async fn run_distribution(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Json(req): Json<BonusRunRequest>,
) -> Result<Json<BonusRunReport>, ApiError> {
    let report = state.engine.distribute_weekly_bonus(req.as_of)?;
    tracing::info!(
        week_start = %report.week_start,
        payouts = report.outcomes.len(),
        total_paid_credits = report.total_paid_credits,
        "bonus run completed"
    );
    Ok(Json(report))
}

/// List the paid rewards for a week, in position order.
///
/// `week_start` is the week's Monday, e.g. `2024-05-06`.
pub async fn list_week_rewards(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Path(week_start): Path<NaiveDate>,
) -> Result<Json<Vec<WeeklyReward>>, ApiError> {
    Ok(Json(state.engine.rewards_for_week(week_start)?))
}
