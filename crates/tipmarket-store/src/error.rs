//! Error types for tipmarket storage.

use chrono::NaiveDate;

use tipmarket_core::{AccountId, CaseId, CaseStatus};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed. Nothing was committed; safe to retry.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// Insufficient credits for a spend.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance in credits.
        balance: i64,
        /// Required amount in credits.
        required: i64,
    },

    /// Applying an adjustment would overflow the account balance.
    #[error("balance overflow on account {account_id}")]
    BalanceOverflow {
        /// The account.
        account_id: AccountId,
    },

    /// An external trigger was already settled (idempotency check).
    #[error("duplicate trigger: {trigger_id}")]
    DuplicateTrigger {
        /// The trigger id that was duplicated.
        trigger_id: String,
    },

    /// The case is in a status that does not permit a refund.
    #[error("case {case_id} is not refundable in status {status:?}")]
    CaseNotRefundable {
        /// The case.
        case_id: CaseId,
        /// Its current status.
        status: CaseStatus,
    },

    /// The requested case status transition is not legal.
    #[error("case {case_id}: illegal transition {from:?} -> {to:?}")]
    InvalidTransition {
        /// The case.
        case_id: CaseId,
        /// Current status.
        from: CaseStatus,
        /// Requested status.
        to: CaseStatus,
    },

    /// A bonus for this seller and week was already paid.
    #[error("reward already paid: week {week_start}, seller {seller_id}")]
    RewardAlreadyPaid {
        /// Monday of the week.
        week_start: NaiveDate,
        /// The seller.
        seller_id: AccountId,
    },
}
