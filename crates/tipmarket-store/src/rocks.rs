//! `RocksDB` storage implementation.
//!
//! All multi-row effects go through a single `WriteBatch`, and every
//! write path that touches a balance is serialized through a
//! per-account lock table, so concurrent adjustments to the same
//! account can never lose an update and a failed settlement leaves no
//! partial state.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use tipmarket_core::{
    AccountBalance, AccountId, Case, CaseId, CaseStatus, EntryId, EntryKind, LedgerEntry,
    SellerSales, WeeklyReward,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{AdjustReceipt, ProcessedTrigger, PurchaseReceipt, RefundReceipt, Store};

/// Acquire a mutex, recovering from poisoning (the protected state
/// lives in the database, not in the mutex).
fn hold(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lazily-populated table of per-key mutexes.
#[derive(Default)]
struct LockTable {
    inner: Mutex<HashMap<[u8; 16], Arc<Mutex<()>>>>,
}

impl LockTable {
    fn handle(&self, key: [u8; 16]) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(key).or_default())
    }
}

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    account_locks: LockTable,
    case_locks: LockTable,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            account_locks: LockTable::default(),
            case_locks: LockTable::default(),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Stage one adjustment into `batch`: updated balance, the entry
    /// with its `balance_after_credits` stamped, and the history index
    /// row. The caller must hold the account's lock.
    fn stage_adjustment(&self, batch: &mut WriteBatch, mut entry: LedgerEntry) -> Result<AdjustReceipt> {
        let cf_balances = self.cf(cf::BALANCES)?;
        let cf_ledger = self.cf(cf::LEDGER)?;
        let cf_index = self.cf(cf::LEDGER_BY_ACCOUNT)?;

        let mut balance = self
            .get_balance(&entry.account_id)?
            .unwrap_or_else(|| AccountBalance::new(entry.account_id));
        balance.balance_credits = balance
            .balance_credits
            .checked_add(entry.amount_credits)
            .ok_or(StoreError::BalanceOverflow {
                account_id: entry.account_id,
            })?;
        balance.updated_at = Utc::now();
        entry.balance_after_credits = balance.balance_credits;

        batch.put_cf(
            &cf_balances,
            keys::balance_key(&entry.account_id),
            Self::serialize(&balance)?,
        );
        batch.put_cf(&cf_ledger, keys::entry_key(&entry.id), Self::serialize(&entry)?);
        batch.put_cf(
            &cf_index,
            keys::account_entry_key(&entry.account_id, &entry.id),
            [],
        );

        Ok(AdjustReceipt {
            entry_id: entry.id,
            balance_credits: balance.balance_credits,
        })
    }

    /// Stage a trigger dedup record, failing if one already exists.
    fn stage_trigger(
        &self,
        batch: &mut WriteBatch,
        trigger_id: &str,
        entry_ids: Vec<EntryId>,
    ) -> Result<()> {
        if self.get_trigger(trigger_id)?.is_some() {
            return Err(StoreError::DuplicateTrigger {
                trigger_id: trigger_id.to_string(),
            });
        }

        let record = ProcessedTrigger {
            trigger_id: trigger_id.to_string(),
            entry_ids,
            processed_at: Utc::now(),
        };
        batch.put_cf(
            &self.cf(cf::PROCESSED_TRIGGERS)?,
            keys::trigger_key(trigger_id),
            Self::serialize(&record)?,
        );
        Ok(())
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Balances
    // =========================================================================

    fn get_balance(&self, account_id: &AccountId) -> Result<Option<AccountBalance>> {
        let cf = self.cf(cf::BALANCES)?;
        self.db
            .get_cf(&cf, keys::balance_key(account_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    // =========================================================================
    // Adjustment primitive
    // =========================================================================

    fn adjust(&self, entry: LedgerEntry) -> Result<AdjustReceipt> {
        let lock = self.account_locks.handle(*entry.account_id.as_bytes());
        let _guard = hold(&lock);

        let mut batch = WriteBatch::default();
        let receipt = self.stage_adjustment(&mut batch, entry)?;
        self.write(batch)?;
        Ok(receipt)
    }

    // =========================================================================
    // Ledger (read side)
    // =========================================================================

    fn get_entry(&self, entry_id: &EntryId) -> Result<Option<LedgerEntry>> {
        let cf = self.cf(cf::LEDGER)?;
        self.db
            .get_cf(&cf, keys::entry_key(entry_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_entries_for_account(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let cf_index = self.cf(cf::LEDGER_BY_ACCOUNT)?;
        let prefix = keys::account_entries_prefix(account_id);

        let iter = self
            .db
            .iterator_cf(&cf_index, IteratorMode::From(&prefix, Direction::Forward));

        // ULID suffixes sort by time, so the index yields oldest first.
        let mut all_keys: Vec<Vec<u8>> = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            all_keys.push(key.to_vec());
        }

        // Reverse to get newest first.
        all_keys.reverse();

        let mut entries = Vec::new();
        for key in all_keys.into_iter().skip(offset) {
            if entries.len() >= limit {
                break;
            }
            let entry_id = keys::extract_entry_id_from_account_key(&key);
            if let Some(entry) = self.get_entry(&entry_id)? {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    fn sum_entries_for_account(&self, account_id: &AccountId) -> Result<i64> {
        let cf_index = self.cf(cf::LEDGER_BY_ACCOUNT)?;
        let prefix = keys::account_entries_prefix(account_id);

        let iter = self
            .db
            .iterator_cf(&cf_index, IteratorMode::From(&prefix, Direction::Forward));

        let mut sum = 0i64;
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            let entry_id = keys::extract_entry_id_from_account_key(&key);
            if let Some(entry) = self.get_entry(&entry_id)? {
                sum += entry.amount_credits;
            }
        }

        Ok(sum)
    }

    fn seller_sales_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SellerSales>> {
        let cf_ledger = self.cf(cf::LEDGER)?;
        let lower = EntryId::time_floor_bytes(start);
        let upper = EntryId::time_floor_bytes(end);

        let iter = self
            .db
            .iterator_cf(&cf_ledger, IteratorMode::From(&lower, Direction::Forward));

        let mut counts: HashMap<AccountId, u64> = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if key.as_ref() >= upper.as_slice() {
                break;
            }
            let entry: LedgerEntry = Self::deserialize(&value)?;
            // Seller side of a completed purchase: one credit per sale.
            if entry.kind == EntryKind::Purchase
                && entry.amount_credits > 0
                && entry.created_at >= start
                && entry.created_at < end
            {
                *counts.entry(entry.account_id).or_insert(0) += 1;
            }
        }

        Ok(counts
            .into_iter()
            .map(|(seller_id, sales_count)| SellerSales {
                seller_id,
                sales_count,
            })
            .collect())
    }

    // =========================================================================
    // External triggers (idempotency)
    // =========================================================================

    fn get_trigger(&self, trigger_id: &str) -> Result<Option<ProcessedTrigger>> {
        let cf = self.cf(cf::PROCESSED_TRIGGERS)?;
        self.db
            .get_cf(&cf, keys::trigger_key(trigger_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn settle_top_up(&self, trigger_id: &str, entry: LedgerEntry) -> Result<AdjustReceipt> {
        let lock = self.account_locks.handle(*entry.account_id.as_bytes());
        let _guard = hold(&lock);

        let entry_id = entry.id;
        let mut batch = WriteBatch::default();
        self.stage_trigger(&mut batch, trigger_id, vec![entry_id])?;
        let receipt = self.stage_adjustment(&mut batch, entry)?;
        self.write(batch)?;

        tracing::debug!(
            trigger_id,
            entry_id = %receipt.entry_id,
            balance_credits = receipt.balance_credits,
            "top-up settled"
        );
        Ok(receipt)
    }

    fn settle_purchase(
        &self,
        trigger_id: &str,
        buyer_entry: LedgerEntry,
        seller_entry: LedgerEntry,
    ) -> Result<PurchaseReceipt> {
        let buyer_key = *buyer_entry.account_id.as_bytes();
        let seller_key = *seller_entry.account_id.as_bytes();

        // Lock both accounts in key order to avoid deadlocking against
        // another settlement holding them in the opposite order.
        let (first_key, second_key) = if buyer_key <= seller_key {
            (buyer_key, seller_key)
        } else {
            (seller_key, buyer_key)
        };
        let first = self.account_locks.handle(first_key);
        let second = self.account_locks.handle(second_key);
        let _first_guard = hold(&first);
        let _second_guard = (first_key != second_key).then(|| hold(&second));

        let mut batch = WriteBatch::default();
        self.stage_trigger(&mut batch, trigger_id, vec![buyer_entry.id, seller_entry.id])?;

        // Spend policy: the buyer must cover the price before money moves.
        let required = buyer_entry.amount_credits.abs();
        let buyer_balance = self
            .get_balance(&buyer_entry.account_id)?
            .map_or(0, |b| b.balance_credits);
        if buyer_balance < required {
            return Err(StoreError::InsufficientCredits {
                balance: buyer_balance,
                required,
            });
        }

        let buyer = self.stage_adjustment(&mut batch, buyer_entry)?;
        let seller = self.stage_adjustment(&mut batch, seller_entry)?;
        self.write(batch)?;

        tracing::debug!(
            trigger_id,
            buyer_balance = buyer.balance_credits,
            seller_balance = seller.balance_credits,
            "purchase settled"
        );
        Ok(PurchaseReceipt { buyer, seller })
    }

    // =========================================================================
    // Cases
    // =========================================================================

    fn put_case(&self, case: &Case) -> Result<()> {
        let cf = self.cf(cf::CASES)?;
        self.db
            .put_cf(&cf, keys::case_key(&case.id), Self::serialize(case)?)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_case(&self, case_id: &CaseId) -> Result<Option<Case>> {
        let cf = self.cf(cf::CASES)?;
        self.db
            .get_cf(&cf, keys::case_key(case_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn add_case_reply(
        &self,
        case_id: &CaseId,
        author_id: AccountId,
        body: String,
    ) -> Result<Case> {
        let lock = self.case_locks.handle(*case_id.as_bytes());
        let _guard = hold(&lock);

        let mut case = self.get_case(case_id)?.ok_or_else(|| StoreError::NotFound {
            entity: "case",
            id: case_id.to_string(),
        })?;
        case.push_reply(author_id, body);
        self.put_case(&case)?;
        Ok(case)
    }

    fn transition_case(&self, case_id: &CaseId, to: CaseStatus) -> Result<Case> {
        let lock = self.case_locks.handle(*case_id.as_bytes());
        let _guard = hold(&lock);

        let mut case = self.get_case(case_id)?.ok_or_else(|| StoreError::NotFound {
            entity: "case",
            id: case_id.to_string(),
        })?;

        if !case.status.can_transition(to) {
            return Err(StoreError::InvalidTransition {
                case_id: *case_id,
                from: case.status,
                to,
            });
        }

        case.status = to;
        case.updated_at = Utc::now();
        self.put_case(&case)?;
        Ok(case)
    }

    fn settle_refund(&self, case_id: &CaseId, amount_credits: i64) -> Result<RefundReceipt> {
        // Case lock first, then account locks; every case mutation
        // takes the case lock, so a double refund serializes here and
        // the loser sees the Refunded status.
        let case_lock = self.case_locks.handle(*case_id.as_bytes());
        let _case_guard = hold(&case_lock);

        let mut case = self.get_case(case_id)?.ok_or_else(|| StoreError::NotFound {
            entity: "case",
            id: case_id.to_string(),
        })?;

        if !case.status.is_refundable() {
            return Err(StoreError::CaseNotRefundable {
                case_id: *case_id,
                status: case.status,
            });
        }

        let buyer_entry = LedgerEntry::refund_credit(case.buyer_id, amount_credits, case.purchase_id);
        let seller_entry = LedgerEntry::refund_debit(case.seller_id, amount_credits, case.purchase_id);

        let buyer_key = *case.buyer_id.as_bytes();
        let seller_key = *case.seller_id.as_bytes();
        let (first_key, second_key) = if buyer_key <= seller_key {
            (buyer_key, seller_key)
        } else {
            (seller_key, buyer_key)
        };
        let first = self.account_locks.handle(first_key);
        let second = self.account_locks.handle(second_key);
        let _first_guard = hold(&first);
        let _second_guard = (first_key != second_key).then(|| hold(&second));

        let mut batch = WriteBatch::default();
        let buyer = self.stage_adjustment(&mut batch, buyer_entry)?;
        let seller = self.stage_adjustment(&mut batch, seller_entry)?;

        case.status = CaseStatus::Refunded;
        case.updated_at = Utc::now();
        batch.put_cf(
            &self.cf(cf::CASES)?,
            keys::case_key(case_id),
            Self::serialize(&case)?,
        );

        self.write(batch)?;

        tracing::debug!(case_id = %case_id, amount_credits, "refund settled");
        Ok(RefundReceipt {
            case,
            buyer,
            seller,
        })
    }

    // =========================================================================
    // Weekly rewards
    // =========================================================================

    fn get_reward(
        &self,
        week_start: NaiveDate,
        seller_id: &AccountId,
    ) -> Result<Option<WeeklyReward>> {
        let cf = self.cf(cf::WEEKLY_REWARDS)?;
        self.db
            .get_cf(&cf, keys::reward_key(week_start, seller_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_rewards_for_week(&self, week_start: NaiveDate) -> Result<Vec<WeeklyReward>> {
        let cf = self.cf(cf::WEEKLY_REWARDS)?;
        let prefix = keys::rewards_week_prefix(week_start);

        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut rewards: Vec<WeeklyReward> = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            rewards.push(Self::deserialize(&value)?);
        }

        rewards.sort_by_key(|r| r.position);
        Ok(rewards)
    }

    fn pay_weekly_bonus(&self, reward: WeeklyReward, entry: LedgerEntry) -> Result<AdjustReceipt> {
        let lock = self.account_locks.handle(*reward.seller_id.as_bytes());
        let _guard = hold(&lock);

        // The reward key is the idempotency guard: one payout per
        // seller and week, checked under the seller's lock.
        if self.get_reward(reward.week_start, &reward.seller_id)?.is_some() {
            return Err(StoreError::RewardAlreadyPaid {
                week_start: reward.week_start,
                seller_id: reward.seller_id,
            });
        }

        let mut batch = WriteBatch::default();
        let receipt = self.stage_adjustment(&mut batch, entry)?;
        batch.put_cf(
            &self.cf(cf::WEEKLY_REWARDS)?,
            keys::reward_key(reward.week_start, &reward.seller_id),
            Self::serialize(&reward)?,
        );
        self.write(batch)?;

        tracing::debug!(
            week_start = %reward.week_start,
            seller_id = %reward.seller_id,
            position = reward.position,
            "weekly bonus paid"
        );
        Ok(receipt)
    }
}
