//! Key encoding utilities for `RocksDB`.
//!
//! All keys are fixed-layout binary so that byte order matches the
//! orders the store relies on: ULID entry keys sort by time, the
//! per-account index sorts an account's entries by time, and reward
//! keys group a week's payouts under a common prefix.

use chrono::{Datelike, NaiveDate};

use tipmarket_core::{AccountId, CaseId, EntryId};

/// Create a balance key from an account ID.
#[must_use]
pub fn balance_key(account_id: &AccountId) -> Vec<u8> {
    account_id.as_bytes().to_vec()
}

/// Create a ledger entry key from an entry ID.
#[must_use]
pub fn entry_key(entry_id: &EntryId) -> Vec<u8> {
    entry_id.to_bytes().to_vec()
}

/// Create an account-entry index key.
///
/// Format: `account_id (16 bytes) || entry_id (16 bytes)`
///
/// Since ULIDs are time-ordered, an account's entries sort by time.
#[must_use]
pub fn account_entry_key(account_id: &AccountId, entry_id: &EntryId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(account_id.as_bytes());
    key.extend_from_slice(&entry_id.to_bytes());
    key
}

/// Create a prefix for iterating all entries for an account.
#[must_use]
pub fn account_entries_prefix(account_id: &AccountId) -> Vec<u8> {
    account_id.as_bytes().to_vec()
}

/// Extract the entry ID from an account-entry index key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_entry_id_from_account_key(key: &[u8]) -> EntryId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    EntryId::from_bytes(bytes).expect("valid ULID bytes")
}

/// Create a case key from a case ID.
#[must_use]
pub fn case_key(case_id: &CaseId) -> Vec<u8> {
    case_id.as_bytes().to_vec()
}

/// Create a weekly reward key.
///
/// Format: `days-from-ce of week_start (4 bytes, big-endian) || seller_id (16 bytes)`
///
/// Point lookups on the full key are the per-seller-and-week
/// idempotency check; prefix scans on the first 4 bytes list a week's
/// payouts.
#[must_use]
pub fn reward_key(week_start: NaiveDate, seller_id: &AccountId) -> Vec<u8> {
    let mut key = Vec::with_capacity(20);
    key.extend_from_slice(&week_start.num_days_from_ce().to_be_bytes());
    key.extend_from_slice(seller_id.as_bytes());
    key
}

/// Create a prefix for iterating all rewards for a week.
#[must_use]
pub fn rewards_week_prefix(week_start: NaiveDate) -> Vec<u8> {
    week_start.num_days_from_ce().to_be_bytes().to_vec()
}

/// Create a processed-trigger key from a trigger ID.
#[must_use]
pub fn trigger_key(trigger_id: &str) -> Vec<u8> {
    trigger_id.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_key_length() {
        let key = balance_key(&AccountId::generate());
        assert_eq!(key.len(), 16);
    }

    #[test]
    fn account_entry_key_format() {
        let account_id = AccountId::generate();
        let entry_id = EntryId::generate();
        let key = account_entry_key(&account_id, &entry_id);

        assert_eq!(key.len(), 32);
        assert_eq!(&key[..16], account_id.as_bytes());
        assert_eq!(&key[16..], entry_id.to_bytes());
    }

    #[test]
    fn extract_entry_id_roundtrip() {
        let account_id = AccountId::generate();
        let entry_id = EntryId::generate();
        let key = account_entry_key(&account_id, &entry_id);

        assert_eq!(extract_entry_id_from_account_key(&key), entry_id);
    }

    #[test]
    fn reward_key_groups_by_week() {
        let week = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let seller = AccountId::generate();
        let key = reward_key(week, &seller);

        assert_eq!(key.len(), 20);
        assert!(key.starts_with(&rewards_week_prefix(week)));
        assert_eq!(&key[4..], seller.as_bytes());
    }

    #[test]
    fn reward_prefixes_sort_by_week() {
        let earlier = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let later = NaiveDate::from_ymd_opt(2024, 5, 13).unwrap();
        assert!(rewards_week_prefix(earlier) < rewards_week_prefix(later));
    }
}
