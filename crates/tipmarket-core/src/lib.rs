//! Core types for the tipmarket credit ledger and settlement engine.
//!
//! This crate provides the domain types shared by the storage and
//! settlement layers:
//!
//! - **Identifiers**: `AccountId`, `CaseId`, `PurchaseId`, `EntryId`
//! - **Balances**: `AccountBalance`
//! - **Ledger**: `LedgerEntry`, `EntryKind`, `EntryRef`
//! - **Cases**: `Case`, `CaseStatus`, `CaseReply`
//! - **Bonuses**: `BonusWindow`, `SellerSales`, tier constants
//!
//! # Credit Unit
//!
//! Balances and amounts are `i64` counts of the platform's smallest
//! indivisible credit unit. There is no multi-currency support; credits
//! are distinct from real-world currency settlement.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod balance;
pub mod bonus;
pub mod case;
pub mod ids;
pub mod ledger;

pub use balance::AccountBalance;
pub use bonus::{rank_sellers, BonusWindow, SellerSales, WeeklyReward, BONUS_POSITIONS, TIER_AMOUNTS};
pub use case::{Case, CaseReply, CaseStatus};
pub use ids::{AccountId, CaseId, EntryId, IdError, PurchaseId};
pub use ledger::{EntryKind, EntryRef, LedgerEntry};
