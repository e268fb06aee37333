//! The settlement engine and its operation outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tipmarket_core::{
    rank_sellers, AccountBalance, AccountId, BonusWindow, Case, CaseId, CaseStatus, LedgerEntry,
    PurchaseId, WeeklyReward, TIER_AMOUNTS,
};
use tipmarket_store::{
    AdjustReceipt, ProcessedTrigger, PurchaseReceipt, RefundReceipt, Store, StoreError,
};

use crate::error::{EngineError, Result};

/// Outcome of a top-up confirmation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TopUpOutcome {
    /// The top-up was settled now.
    Applied {
        /// The settlement receipt.
        #[serde(flatten)]
        receipt: AdjustReceipt,
    },

    /// The same payment reference was settled earlier. Nothing moved.
    AlreadyProcessed {
        /// The original dedup record.
        trigger: ProcessedTrigger,
    },
}

/// Outcome of a purchase completion.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PurchaseOutcome {
    /// The purchase was settled now.
    Applied {
        /// Receipts for both sides.
        #[serde(flatten)]
        receipt: PurchaseReceipt,
    },

    /// The same purchase id was settled earlier. Nothing moved.
    AlreadyProcessed {
        /// The original dedup record.
        trigger: ProcessedTrigger,
    },
}

/// Outcome of a refund settlement.
pub type RefundOutcome = RefundReceipt;

/// Status of one seller's payout within a bonus run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PayoutStatus {
    /// The bonus was paid in this run.
    Paid {
        /// The settlement receipt.
        #[serde(flatten)]
        receipt: AdjustReceipt,
    },

    /// A previous run already paid this seller for this week.
    AlreadyPaid,

    /// The payout failed; a later run will retry it.
    Failed {
        /// What went wrong.
        error: String,
    },
}

/// One seller's line in a bonus run report.
#[derive(Debug, Clone, Serialize)]
pub struct PayoutOutcome {
    /// The seller.
    pub seller_id: AccountId,

    /// Leaderboard position, 1–3.
    pub position: u8,

    /// Bonus amount for the position, in credits.
    pub amount_credits: i64,

    /// Completed sales in the window.
    pub sales_count: u64,

    /// What happened to the payout.
    #[serde(flatten)]
    pub status: PayoutStatus,
}

/// Report of one weekly bonus run.
///
/// Empty `outcomes` means no seller had a completed sale in the
/// window; the run is a no-op and may be repeated.
#[derive(Debug, Clone, Serialize)]
pub struct BonusRunReport {
    /// Monday of the distributed week.
    pub week_start: chrono::NaiveDate,

    /// Sunday of the distributed week (inclusive).
    pub week_end: chrono::NaiveDate,

    /// Per-seller payout outcomes, in position order.
    pub outcomes: Vec<PayoutOutcome>,

    /// Credits actually paid in this run (excludes `AlreadyPaid`).
    pub total_paid_credits: i64,
}

/// Per-account reconciliation view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Current stored balance.
    pub balance_credits: i64,

    /// Signed sum of the account's ledger entries.
    pub ledger_sum_credits: i64,

    /// Whether the two agree.
    pub consistent: bool,
}

/// Drives all credit movements against the store.
///
/// Stateless apart from the store handle; all invariants live in the
/// store's compound operations, the engine adds input validation and
/// duplicate-trigger reporting.
pub struct SettlementEngine<S> {
    store: S,
}

impl<S: Store> SettlementEngine<S> {
    /// Create an engine over a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    // =========================================================================
    // Top-ups
    // =========================================================================

    /// Settle a confirmed payment-gateway top-up.
    ///
    /// Replaying the same `payment_ref` is a no-op reported as
    /// [`TopUpOutcome::AlreadyProcessed`].
    ///
    /// # Errors
    ///
    /// Returns a validation error for a non-positive amount or empty
    /// reference, or a store error.
    pub fn confirm_top_up(
        &self,
        account_id: AccountId,
        amount_credits: i64,
        payment_ref: &str,
    ) -> Result<TopUpOutcome> {
        if amount_credits <= 0 {
            return Err(EngineError::validation("top-up amount must be positive"));
        }
        if payment_ref.trim().is_empty() {
            return Err(EngineError::validation("payment reference must not be empty"));
        }

        let trigger_id = format!("topup:{payment_ref}");
        let entry = LedgerEntry::top_up(
            account_id,
            amount_credits,
            format!("Credit top-up {payment_ref}"),
        );

        match self.store.settle_top_up(&trigger_id, entry) {
            Ok(receipt) => {
                info!(%account_id, amount_credits, payment_ref, "top-up settled");
                Ok(TopUpOutcome::Applied { receipt })
            }
            Err(StoreError::DuplicateTrigger { .. }) => {
                warn!(%account_id, payment_ref, "top-up replayed, no-op");
                let trigger = self.fetch_trigger(&trigger_id)?;
                Ok(TopUpOutcome::AlreadyProcessed { trigger })
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    /// Settle a completed ticket purchase: debit the buyer, credit the
    /// seller.
    ///
    /// Replaying the same purchase id is a no-op reported as
    /// [`PurchaseOutcome::AlreadyProcessed`].
    ///
    /// # Errors
    ///
    /// Returns a validation error for a non-positive price or
    /// self-purchase, `StoreError::InsufficientCredits` if the buyer
    /// cannot cover the price, or a store error.
    pub fn complete_purchase(
        &self,
        buyer_id: AccountId,
        seller_id: AccountId,
        purchase_id: PurchaseId,
        price_credits: i64,
    ) -> Result<PurchaseOutcome> {
        if price_credits <= 0 {
            return Err(EngineError::validation("purchase price must be positive"));
        }
        if buyer_id == seller_id {
            return Err(EngineError::validation("buyer and seller must differ"));
        }

        let trigger_id = format!("purchase:{purchase_id}");
        let buyer_entry = LedgerEntry::purchase_debit(buyer_id, price_credits, purchase_id);
        let seller_entry = LedgerEntry::purchase_credit(seller_id, price_credits, purchase_id);

        match self
            .store
            .settle_purchase(&trigger_id, buyer_entry, seller_entry)
        {
            Ok(receipt) => {
                info!(%buyer_id, %seller_id, %purchase_id, price_credits, "purchase settled");
                Ok(PurchaseOutcome::Applied { receipt })
            }
            Err(StoreError::DuplicateTrigger { .. }) => {
                warn!(%purchase_id, "purchase replayed, no-op");
                let trigger = self.fetch_trigger(&trigger_id)?;
                Ok(PurchaseOutcome::AlreadyProcessed { trigger })
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Cases
    // =========================================================================

    /// Open a support case over a disputed purchase.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a non-positive amount or a case
    /// where buyer equals seller, or a store error.
    pub fn open_case(
        &self,
        buyer_id: AccountId,
        seller_id: AccountId,
        purchase_id: PurchaseId,
        amount_in_dispute_credits: i64,
    ) -> Result<Case> {
        if amount_in_dispute_credits <= 0 {
            return Err(EngineError::validation("disputed amount must be positive"));
        }
        if buyer_id == seller_id {
            return Err(EngineError::validation("buyer and seller must differ"));
        }

        let case = Case::open(buyer_id, seller_id, purchase_id, amount_in_dispute_credits);
        self.store.put_case(&case)?;
        info!(case_id = %case.id, %buyer_id, %seller_id, "case opened");
        Ok(case)
    }

    /// Fetch a case.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the case does not exist.
    pub fn get_case(&self, case_id: &CaseId) -> Result<Case> {
        Ok(self
            .store
            .get_case(case_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "case",
                id: case_id.to_string(),
            })?)
    }

    /// Append a reply to a case thread.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty body, or a store error.
    pub fn add_case_reply(
        &self,
        case_id: &CaseId,
        author_id: AccountId,
        body: String,
    ) -> Result<Case> {
        if body.trim().is_empty() {
            return Err(EngineError::validation("reply body must not be empty"));
        }
        Ok(self.store.add_case_reply(case_id, author_id, body)?)
    }

    /// Transition a case's status.
    ///
    /// # Errors
    ///
    /// `StoreError::InvalidTransition` for an illegal move.
    pub fn transition_case(&self, case_id: &CaseId, to: CaseStatus) -> Result<Case> {
        let case = self.store.transition_case(case_id, to)?;
        info!(%case_id, status = ?case.status, "case transitioned");
        Ok(case)
    }

    /// Settle an approved refund on a case.
    ///
    /// `amount_credits` defaults to the case's disputed amount. The
    /// payer and payee always come from the stored case.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a non-positive amount,
    /// `StoreError::CaseNotRefundable` for a refunded or closed case,
    /// or a store error.
    pub fn approve_refund(
        &self,
        case_id: &CaseId,
        amount_credits: Option<i64>,
    ) -> Result<RefundOutcome> {
        let amount = match amount_credits {
            Some(a) if a <= 0 => {
                return Err(EngineError::validation("refund amount must be positive"));
            }
            Some(a) => a,
            None => self.get_case(case_id)?.amount_in_dispute_credits,
        };

        let receipt = self.store.settle_refund(case_id, amount)?;
        info!(%case_id, amount, "refund settled");
        Ok(receipt)
    }

    // =========================================================================
    // Weekly bonus
    // =========================================================================

    /// Run the weekly bonus distribution for the previous complete
    /// Monday–Sunday week relative to `as_of` (defaults to now).
    ///
    /// Safe to repeat and to retry after partial failure: each payout
    /// is guarded by its `(week_start, seller)` reward row, and a
    /// failed payout is reported and skipped rather than aborting the
    /// run.
    ///
    /// # Errors
    ///
    /// Returns a store error if the sales scan itself fails.
    pub fn distribute_weekly_bonus(&self, as_of: Option<DateTime<Utc>>) -> Result<BonusRunReport> {
        let window = BonusWindow::previous_week(as_of.unwrap_or_else(Utc::now));
        let sales = self
            .store
            .seller_sales_between(window.start_instant(), window.end_instant())?;
        let ranked = rank_sellers(sales);

        if ranked.is_empty() {
            info!(week_start = %window.week_start, "bonus run: no qualifying sales");
        }

        let mut outcomes = Vec::with_capacity(ranked.len());
        let mut total_paid_credits = 0;

        for (i, seller) in ranked.into_iter().enumerate() {
            let position = u8::try_from(i + 1).unwrap_or(u8::MAX);
            let amount_credits = TIER_AMOUNTS[i];
            let reward = WeeklyReward::new(window, seller, position, amount_credits);
            let entry = LedgerEntry::bonus(
                seller.seller_id,
                amount_credits,
                format!("Weekly top-seller bonus, week of {}", window.week_start),
            );

            let status = match self.store.pay_weekly_bonus(reward, entry) {
                Ok(receipt) => {
                    info!(
                        seller_id = %seller.seller_id,
                        position,
                        amount_credits,
                        "bonus paid"
                    );
                    total_paid_credits += amount_credits;
                    PayoutStatus::Paid { receipt }
                }
                Err(StoreError::RewardAlreadyPaid { .. }) => {
                    info!(seller_id = %seller.seller_id, position, "bonus already paid");
                    PayoutStatus::AlreadyPaid
                }
                Err(e) => {
                    warn!(seller_id = %seller.seller_id, position, error = %e, "bonus payout failed");
                    PayoutStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };

            outcomes.push(PayoutOutcome {
                seller_id: seller.seller_id,
                position,
                amount_credits,
                sales_count: seller.sales_count,
                status,
            });
        }

        Ok(BonusRunReport {
            week_start: window.week_start,
            week_end: window.week_end,
            outcomes,
            total_paid_credits,
        })
    }

    /// List the paid rewards for a week, in position order.
    ///
    /// # Errors
    ///
    /// Returns a store error if the scan fails.
    pub fn rewards_for_week(&self, week_start: chrono::NaiveDate) -> Result<Vec<WeeklyReward>> {
        Ok(self.store.list_rewards_for_week(week_start)?)
    }

    // =========================================================================
    // Read side
    // =========================================================================

    /// Current balance view for an account; zero if it has never
    /// transacted.
    ///
    /// # Errors
    ///
    /// Returns a store error if the lookup fails.
    pub fn account_balance(&self, account_id: AccountId) -> Result<AccountBalance> {
        Ok(self
            .store
            .get_balance(&account_id)?
            .unwrap_or_else(|| AccountBalance::new(account_id)))
    }

    /// List an account's ledger entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the scan fails.
    pub fn ledger_page(
        &self,
        account_id: AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        Ok(self
            .store
            .list_entries_for_account(&account_id, limit, offset)?)
    }

    /// Check that an account's balance equals the sum of its entries.
    ///
    /// # Errors
    ///
    /// Returns a store error if either read fails.
    pub fn reconcile(&self, account_id: AccountId) -> Result<ReconcileReport> {
        let balance_credits = self
            .store
            .get_balance(&account_id)?
            .map_or(0, |b| b.balance_credits);
        let ledger_sum_credits = self.store.sum_entries_for_account(&account_id)?;

        Ok(ReconcileReport {
            balance_credits,
            ledger_sum_credits,
            consistent: balance_credits == ledger_sum_credits,
        })
    }

    fn fetch_trigger(&self, trigger_id: &str) -> Result<ProcessedTrigger> {
        Ok(self
            .store
            .get_trigger(trigger_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "trigger",
                id: trigger_id.to_string(),
            })?)
    }
}
