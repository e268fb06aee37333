//! Ledger entry types.
//!
//! Every credit movement creates exactly one immutable `LedgerEntry`
//! per affected account. Entries are never updated or deleted; the sum
//! of an account's entries equals its current balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, CaseId, EntryId, PurchaseId};

/// One immutable, signed record of a credit movement for one account.
///
/// Constructors exist per movement kind; `balance_after_credits` is
/// left at zero by the constructors and stamped by the store inside
/// the account lock, where the post-adjustment balance is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry id (ULID, time-ordered).
    pub id: EntryId,

    /// The account whose balance moved.
    pub account_id: AccountId,

    /// Amount in credits. Positive = credit, negative = debit.
    pub amount_credits: i64,

    /// Semantic kind of the movement.
    pub kind: EntryKind,

    /// Optional reference to the originating entity.
    pub reference: Option<EntryRef>,

    /// Human-readable description.
    pub description: String,

    /// Balance after this entry was applied, stamped by the store.
    pub balance_after_credits: i64,

    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    fn new(
        account_id: AccountId,
        amount_credits: i64,
        kind: EntryKind,
        reference: Option<EntryRef>,
        description: String,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            account_id,
            amount_credits,
            kind,
            reference,
            description,
            balance_after_credits: 0,
            created_at: Utc::now(),
        }
    }

    /// A confirmed top-up crediting an account.
    #[must_use]
    pub fn top_up(account_id: AccountId, amount_credits: i64, description: String) -> Self {
        Self::new(
            account_id,
            amount_credits.abs(),
            EntryKind::TopUp,
            None,
            description,
        )
    }

    /// The buyer side of a completed purchase (always a debit).
    #[must_use]
    pub fn purchase_debit(
        account_id: AccountId,
        price_credits: i64,
        purchase_id: PurchaseId,
    ) -> Self {
        Self::new(
            account_id,
            -price_credits.abs(),
            EntryKind::Purchase,
            Some(EntryRef::Purchase(purchase_id)),
            format!("Ticket purchase {purchase_id}"),
        )
    }

    /// The seller side of a completed purchase (always a credit).
    #[must_use]
    pub fn purchase_credit(
        account_id: AccountId,
        price_credits: i64,
        purchase_id: PurchaseId,
    ) -> Self {
        Self::new(
            account_id,
            price_credits.abs(),
            EntryKind::Purchase,
            Some(EntryRef::Purchase(purchase_id)),
            format!("Ticket sale {purchase_id}"),
        )
    }

    /// The buyer side of an approved case refund (credit).
    #[must_use]
    pub fn refund_credit(
        account_id: AccountId,
        amount_credits: i64,
        purchase_id: PurchaseId,
    ) -> Self {
        Self::new(
            account_id,
            amount_credits.abs(),
            EntryKind::Refund,
            Some(EntryRef::Purchase(purchase_id)),
            format!("Refund for purchase {purchase_id}"),
        )
    }

    /// The seller side of an approved case refund (debit).
    #[must_use]
    pub fn refund_debit(
        account_id: AccountId,
        amount_credits: i64,
        purchase_id: PurchaseId,
    ) -> Self {
        Self::new(
            account_id,
            -amount_credits.abs(),
            EntryKind::Refund,
            Some(EntryRef::Purchase(purchase_id)),
            format!("Refund reversal for purchase {purchase_id}"),
        )
    }

    /// A weekly leaderboard bonus payout (credit).
    #[must_use]
    pub fn bonus(account_id: AccountId, amount_credits: i64, description: String) -> Self {
        Self::new(
            account_id,
            amount_credits.abs(),
            EntryKind::Bonus,
            None,
            description,
        )
    }
}

/// Semantic kind of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Credit purchased through the payment gateway.
    TopUp,

    /// Ticket purchase (buyer debit / seller credit).
    Purchase,

    /// Approved case refund (buyer credit / seller debit).
    Refund,

    /// Weekly leaderboard bonus.
    Bonus,
}

/// Reference to the entity that originated a ledger entry.
///
/// Loose reference by id only: cases and purchases do not own ledger
/// entries, so the log stays append-only and independent of their
/// lifecycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryRef {
    /// A ticket purchase.
    Purchase(PurchaseId),

    /// A support case.
    Case(CaseId),
}
