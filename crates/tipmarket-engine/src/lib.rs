//! Settlement engine for the tipmarket credit ledger.
//!
//! Sits between the HTTP surface and the store: validates inputs,
//! drives the compound settlement operations, turns duplicate triggers
//! into reportable no-op outcomes, and runs the weekly bonus
//! distribution.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod settlement;

pub use error::{EngineError, Result};
pub use settlement::{
    BonusRunReport, PayoutOutcome, PayoutStatus, PurchaseOutcome, ReconcileReport, RefundOutcome,
    SettlementEngine, TopUpOutcome,
};
