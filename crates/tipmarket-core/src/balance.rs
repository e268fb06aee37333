//! Account balance records.
//!
//! One record per account holding the current spendable credit
//! balance. The balance is only ever written by the store's adjustment
//! operation; every change is paired with a [`crate::LedgerEntry`] in
//! the same atomic write, so at all times the balance equals the sum
//! of the account's ledger entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AccountId;

/// The current credit balance of one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account (buyer or seller).
    pub account_id: AccountId,

    /// Current balance in credits. Non-negative by convention; the
    /// adjustment layer itself does not enforce a sign, callers that
    /// spend credits pre-check sufficiency.
    pub balance_credits: i64,

    /// When the balance record was created (first credit movement).
    pub created_at: DateTime<Utc>,

    /// When the balance was last adjusted.
    pub updated_at: DateTime<Utc>,
}

impl AccountBalance {
    /// Create a new zero balance for an account.
    #[must_use]
    pub fn new(account_id: AccountId) -> Self {
        let now = Utc::now();
        Self {
            account_id,
            balance_credits: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether the account can cover a spend of `amount_credits`.
    #[must_use]
    pub fn has_sufficient_credits(&self, amount_credits: i64) -> bool {
        self.balance_credits >= amount_credits
    }
}
