//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Account balances, keyed by `account_id`.
    pub const BALANCES: &str = "balances";

    /// Ledger entries, keyed by `entry_id` (ULID, time-ordered).
    pub const LEDGER: &str = "ledger";

    /// Index: entries by account, keyed by `account_id || entry_id`.
    /// Value is empty (index only).
    pub const LEDGER_BY_ACCOUNT: &str = "ledger_by_account";

    /// Support cases, keyed by `case_id`.
    pub const CASES: &str = "cases";

    /// Weekly bonus rewards, keyed by `week_start || seller_id`.
    /// The key is the per-seller-and-week idempotency guard.
    pub const WEEKLY_REWARDS: &str = "weekly_rewards";

    /// Processed external triggers for dedup, keyed by trigger id.
    pub const PROCESSED_TRIGGERS: &str = "processed_triggers";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::BALANCES,
        cf::LEDGER,
        cf::LEDGER_BY_ACCOUNT,
        cf::CASES,
        cf::WEEKLY_REWARDS,
        cf::PROCESSED_TRIGGERS,
    ]
}
