//! Support case types and the refund state machine.
//!
//! A case is opened when a buyer disputes a purchase. Status moves
//! only forward:
//!
//! ```text
//! open -> in-progress -> resolved
//! open -> in-progress -> refunded   (terminal, via refund settlement only)
//! (any non-terminal) -> closed      (terminal, no refund)
//! ```
//!
//! Cases are kept forever for audit; they are mutated by replies and
//! status transitions but never hard-deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, CaseId, PurchaseId};

/// A support case over a disputed purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    /// The case id.
    pub id: CaseId,

    /// The buyer who opened the dispute.
    pub buyer_id: AccountId,

    /// The seller of the disputed purchase.
    pub seller_id: AccountId,

    /// The disputed purchase.
    pub purchase_id: PurchaseId,

    /// Amount in dispute, in credits.
    pub amount_in_dispute_credits: i64,

    /// Current status.
    pub status: CaseStatus,

    /// Conversation thread on the case.
    pub replies: Vec<CaseReply>,

    /// When the case was opened.
    pub opened_at: DateTime<Utc>,

    /// When the case was last mutated (reply or transition).
    pub updated_at: DateTime<Utc>,
}

impl Case {
    /// Open a new case in `Open` status.
    #[must_use]
    pub fn open(
        buyer_id: AccountId,
        seller_id: AccountId,
        purchase_id: PurchaseId,
        amount_in_dispute_credits: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CaseId::generate(),
            buyer_id,
            seller_id,
            purchase_id,
            amount_in_dispute_credits,
            status: CaseStatus::Open,
            replies: Vec::new(),
            opened_at: now,
            updated_at: now,
        }
    }

    /// Append a reply to the case thread.
    pub fn push_reply(&mut self, author_id: AccountId, body: String) {
        let now = Utc::now();
        self.replies.push(CaseReply {
            author_id,
            body,
            created_at: now,
        });
        self.updated_at = now;
    }
}

/// Status of a support case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Newly opened, awaiting triage.
    Open,

    /// Under review by support.
    InProgress,

    /// Resolved without moving money.
    Resolved,

    /// Refund settled. Terminal; a case is refunded at most once.
    Refunded,

    /// Closed without a refund. Terminal.
    Closed,
}

impl CaseStatus {
    /// Whether this status is terminal (no further transitions).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Refunded | Self::Closed)
    }

    /// Whether a refund may still be settled from this status.
    #[must_use]
    pub const fn is_refundable(self) -> bool {
        !self.is_terminal()
    }

    /// Whether a direct transition from `self` to `to` is legal.
    ///
    /// `Refunded` is never reachable through a direct transition; it
    /// is set only by the refund settlement, which verifies
    /// [`Self::is_refundable`] instead.
    #[must_use]
    pub const fn can_transition(self, to: Self) -> bool {
        match (self, to) {
            (Self::Open, Self::InProgress) | (Self::InProgress, Self::Resolved) => true,
            (from, Self::Closed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// One reply on a case thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseReply {
    /// Who wrote the reply (buyer, seller, or support staff account).
    pub author_id: AccountId,

    /// Reply body.
    pub body: String,

    /// When the reply was posted.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_case() -> Case {
        Case::open(
            AccountId::generate(),
            AccountId::generate(),
            PurchaseId::generate(),
            50,
        )
    }

    #[test]
    fn new_case_is_open() {
        let case = new_case();
        assert_eq!(case.status, CaseStatus::Open);
        assert!(case.replies.is_empty());
    }

    #[test]
    fn forward_transitions_allowed() {
        assert!(CaseStatus::Open.can_transition(CaseStatus::InProgress));
        assert!(CaseStatus::InProgress.can_transition(CaseStatus::Resolved));
    }

    #[test]
    fn any_non_terminal_can_close() {
        assert!(CaseStatus::Open.can_transition(CaseStatus::Closed));
        assert!(CaseStatus::InProgress.can_transition(CaseStatus::Closed));
        assert!(CaseStatus::Resolved.can_transition(CaseStatus::Closed));
    }

    #[test]
    fn terminal_states_are_frozen() {
        assert!(!CaseStatus::Refunded.can_transition(CaseStatus::Closed));
        assert!(!CaseStatus::Closed.can_transition(CaseStatus::Open));
        assert!(!CaseStatus::Closed.can_transition(CaseStatus::InProgress));
    }

    #[test]
    fn backward_transitions_rejected() {
        assert!(!CaseStatus::Resolved.can_transition(CaseStatus::Open));
        assert!(!CaseStatus::InProgress.can_transition(CaseStatus::Open));
        assert!(!CaseStatus::Open.can_transition(CaseStatus::Resolved));
    }

    #[test]
    fn refunded_not_reachable_by_transition() {
        assert!(!CaseStatus::Open.can_transition(CaseStatus::Refunded));
        assert!(!CaseStatus::InProgress.can_transition(CaseStatus::Refunded));
        assert!(!CaseStatus::Resolved.can_transition(CaseStatus::Refunded));
    }

    #[test]
    fn refundability_tracks_terminality() {
        assert!(CaseStatus::Open.is_refundable());
        assert!(CaseStatus::InProgress.is_refundable());
        assert!(CaseStatus::Resolved.is_refundable());
        assert!(!CaseStatus::Refunded.is_refundable());
        assert!(!CaseStatus::Closed.is_refundable());
    }

    #[test]
    fn replies_update_timestamp() {
        let mut case = new_case();
        let before = case.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        case.push_reply(case.buyer_id, "Tip never arrived".into());

        assert_eq!(case.replies.len(), 1);
        assert!(case.updated_at > before);
    }
}
