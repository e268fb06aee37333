//! Weekly bonus window, tiers, and ranking.
//!
//! The weekly bonus distributor pays the three sellers with the most
//! completed sales over the previous complete Monday–Sunday week
//! (UTC). Amounts are fixed per position.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AccountId;

/// Number of paid leaderboard positions.
pub const BONUS_POSITIONS: usize = 3;

/// Bonus amounts in credits, indexed by position - 1.
pub const TIER_AMOUNTS: [i64; BONUS_POSITIONS] = [500, 250, 100];

/// A Monday–Sunday bonus week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusWindow {
    /// The Monday the week starts on. Doubles as the week's identity
    /// in the reward idempotency key.
    pub week_start: NaiveDate,

    /// The Sunday the week ends on (inclusive).
    pub week_end: NaiveDate,
}

impl BonusWindow {
    /// Resolve the previous complete Monday–Sunday week relative to
    /// `now` (UTC).
    ///
    /// Called on any day of the current week, this returns the week
    /// that ended on the most recent Sunday.
    #[must_use]
    pub fn previous_week(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let days_from_monday = i64::from(today.weekday().num_days_from_monday());
        let this_monday = today - Duration::days(days_from_monday);
        let week_start = this_monday - Duration::days(7);

        Self {
            week_start,
            week_end: week_start + Duration::days(6),
        }
    }

    /// Inclusive start instant of the window (Monday 00:00 UTC).
    #[must_use]
    pub fn start_instant(&self) -> DateTime<Utc> {
        self.week_start.and_time(NaiveTime::MIN).and_utc()
    }

    /// Exclusive end instant of the window (the following Monday
    /// 00:00 UTC).
    #[must_use]
    pub fn end_instant(&self) -> DateTime<Utc> {
        (self.week_end + Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc()
    }

    /// Whether `at` falls inside the window.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start_instant() && at < self.end_instant()
    }
}

/// One paid position in a week's bonus distribution.
///
/// At most one row may exist per `(week_start, seller_id)`; that
/// uniqueness is the idempotency guard that makes a retried or
/// partially-failed weekly run safe. Rows are created once and never
/// mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyReward {
    /// Monday of the rewarded week.
    pub week_start: NaiveDate,

    /// Sunday of the rewarded week (inclusive).
    pub week_end: NaiveDate,

    /// The seller paid.
    pub seller_id: AccountId,

    /// Leaderboard position, 1–3.
    pub position: u8,

    /// Bonus amount in credits.
    pub amount_credits: i64,

    /// Completed sales the seller had in the window.
    pub sales_count: u64,

    /// When the payout was settled.
    pub created_at: DateTime<Utc>,
}

impl WeeklyReward {
    /// Build the reward row for a ranked seller.
    #[must_use]
    pub fn new(window: BonusWindow, seller: SellerSales, position: u8, amount_credits: i64) -> Self {
        Self {
            week_start: window.week_start,
            week_end: window.week_end,
            seller_id: seller.seller_id,
            position,
            amount_credits,
            sales_count: seller.sales_count,
            created_at: Utc::now(),
        }
    }
}

/// Completed-sale count for one seller within a bonus window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerSales {
    /// The seller.
    pub seller_id: AccountId,

    /// Number of completed sales in the window.
    pub sales_count: u64,
}

/// Rank sellers for payout: descending sales count, ties broken by
/// ascending seller id (deterministic), truncated to the paid
/// positions. Sellers with zero sales never qualify.
#[must_use]
pub fn rank_sellers(mut sales: Vec<SellerSales>) -> Vec<SellerSales> {
    sales.retain(|s| s.sales_count > 0);
    sales.sort_by(|a, b| {
        b.sales_count
            .cmp(&a.sales_count)
            .then_with(|| a.seller_id.cmp(&b.seller_id))
    });
    sales.truncate(BONUS_POSITIONS);
    sales
}
