//! `RocksDB` storage layer for the tipmarket credit ledger.
//!
//! This crate is the single authoritative datastore for balances, the
//! append-only ledger, support cases, and weekly bonus rewards. It
//! enforces the two properties everything above it depends on:
//!
//! - **Pairing**: a balance never changes without a ledger entry being
//!   written in the same atomic batch, and vice versa. There is no
//!   trait method that writes a balance or an entry alone.
//! - **Per-account serializability**: concurrent adjustments to the
//!   same account are serialized by a lock table, so no update is ever
//!   lost. Multi-account settlements take their locks in sorted id
//!   order.
//!
//! # Column families
//!
//! - `balances`: current balance per account
//! - `ledger`: immutable entries, keyed by time-ordered ULID
//! - `ledger_by_account`: per-account history index
//! - `cases`: support cases
//! - `weekly_rewards`: bonus payouts, keyed by `(week_start, seller)`
//! - `processed_triggers`: external trigger dedup records

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tipmarket_core::{
    AccountBalance, AccountId, Case, CaseId, CaseStatus, EntryId, LedgerEntry, SellerSales,
    WeeklyReward,
};

/// Result of one settled adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustReceipt {
    /// Id of the ledger entry that was written.
    pub entry_id: EntryId,

    /// Balance after the adjustment.
    pub balance_credits: i64,
}

/// Result of a settled purchase (both sides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    /// Buyer-side debit.
    pub buyer: AdjustReceipt,

    /// Seller-side credit.
    pub seller: AdjustReceipt,
}

/// Result of a settled refund.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundReceipt {
    /// The case after its transition to `Refunded`.
    pub case: Case,

    /// Buyer-side credit.
    pub buyer: AdjustReceipt,

    /// Seller-side debit.
    pub seller: AdjustReceipt,
}

/// Dedup record for a settled external trigger.
///
/// Lets a caller whose request timed out re-check whether its trigger
/// already applied before retrying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedTrigger {
    /// The caller-supplied trigger id (e.g. `topup:<payment_ref>`).
    pub trigger_id: String,

    /// Ledger entries the trigger produced.
    pub entry_ids: Vec<EntryId>,

    /// When the trigger was settled.
    pub processed_at: DateTime<Utc>,
}

/// The storage trait defining all database operations.
///
/// Balances and ledger entries are only ever written by the compound
/// operations below; no caller can write either alone.
pub trait Store: Send + Sync {
    // =========================================================================
    // Balances
    // =========================================================================

    /// Get the balance record for an account, if it has one.
    ///
    /// Accounts are created implicitly at zero on their first
    /// adjustment; `None` means no credit has ever moved.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_balance(&self, account_id: &AccountId) -> Result<Option<AccountBalance>>;

    // =========================================================================
    // Adjustment primitive
    // =========================================================================

    /// Apply one signed adjustment: balance read-modify-write plus the
    /// paired ledger entry, atomically, serialized per account.
    ///
    /// The entry's `balance_after_credits` is stamped inside the
    /// account lock. Creates the balance record at zero on first use.
    /// No sign policy is enforced here; spend paths pre-check
    /// sufficiency in their own compound operations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; nothing is
    /// committed in that case.
    fn adjust(&self, entry: LedgerEntry) -> Result<AdjustReceipt>;

    // =========================================================================
    // Ledger (read side)
    // =========================================================================

    /// Get a ledger entry by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_entry(&self, entry_id: &EntryId) -> Result<Option<LedgerEntry>>;

    /// List entries for an account, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_entries_for_account(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>>;

    /// Signed sum of all entries for an account.
    ///
    /// Reconciliation invariant: equals the account's current balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn sum_entries_for_account(&self, account_id: &AccountId) -> Result<i64>;

    /// Count seller-side purchase credits per seller in `[start, end)`.
    ///
    /// Each completed purchase writes exactly one seller credit of
    /// kind `Purchase`, so this is the completed-sale count used for
    /// the weekly ranking.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn seller_sales_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SellerSales>>;

    // =========================================================================
    // External triggers (idempotency)
    // =========================================================================

    /// Look up the dedup record for a trigger id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_trigger(&self, trigger_id: &str) -> Result<Option<ProcessedTrigger>>;

    /// Settle a confirmed top-up: one credit adjustment plus the
    /// trigger dedup record, atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicateTrigger` if the trigger was already
    ///   settled.
    fn settle_top_up(&self, trigger_id: &str, entry: LedgerEntry) -> Result<AdjustReceipt>;

    /// Settle a completed purchase: buyer debit, seller credit, both
    /// entries, and the trigger dedup record, atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicateTrigger` if the purchase was already
    ///   settled.
    /// - `StoreError::InsufficientCredits` if the buyer cannot cover
    ///   the price.
    fn settle_purchase(
        &self,
        trigger_id: &str,
        buyer_entry: LedgerEntry,
        seller_entry: LedgerEntry,
    ) -> Result<PurchaseReceipt>;

    // =========================================================================
    // Cases
    // =========================================================================

    /// Insert a newly opened case.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_case(&self, case: &Case) -> Result<()>;

    /// Get a case by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_case(&self, case_id: &CaseId) -> Result<Option<Case>>;

    /// Append a reply to a case thread. Returns the updated case.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the case doesn't exist.
    fn add_case_reply(&self, case_id: &CaseId, author_id: AccountId, body: String)
        -> Result<Case>;

    /// Transition a case's status. Returns the updated case.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the case doesn't exist.
    /// - `StoreError::InvalidTransition` if the transition is illegal.
    fn transition_case(&self, case_id: &CaseId, to: CaseStatus) -> Result<Case>;

    /// Settle an approved refund: credit the buyer, debit the seller,
    /// write both refund entries, and transition the case to
    /// `Refunded` — all in one atomic batch.
    ///
    /// Buyer, seller, and purchase are taken from the stored case,
    /// not from the caller.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the case doesn't exist.
    /// - `StoreError::CaseNotRefundable` if the case is already
    ///   `Refunded` or `Closed`.
    fn settle_refund(&self, case_id: &CaseId, amount_credits: i64) -> Result<RefundReceipt>;

    // =========================================================================
    // Weekly rewards
    // =========================================================================

    /// Get the reward row for a seller and week, if paid.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_reward(
        &self,
        week_start: NaiveDate,
        seller_id: &AccountId,
    ) -> Result<Option<WeeklyReward>>;

    /// List all reward rows for a week, in position order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_rewards_for_week(&self, week_start: NaiveDate) -> Result<Vec<WeeklyReward>>;

    /// Pay one seller's weekly bonus: credit adjustment, bonus ledger
    /// entry, and the reward row, atomically. The reward key is the
    /// idempotency guard.
    ///
    /// # Errors
    ///
    /// - `StoreError::RewardAlreadyPaid` if a row already exists for
    ///   this seller and week.
    fn pay_weekly_bonus(&self, reward: WeeklyReward, entry: LedgerEntry) -> Result<AdjustReceipt>;
}
