use crate::domain::currency::Currency;
use crate::domain::ports::{LedgerStore, ScheduleStore};
use crate::domain::schedule::{ScheduleId, ScheduledPayment};
use crate::domain::transaction::{Posting, TransactionId, TransactionRecord};
use crate::domain::wallet::{UserId, Wallet, WalletId};
use crate::error::{LedgerError, Result};
use crate::infrastructure::in_memory::sort_by_due;
use crate::infrastructure::locks::WalletLocks;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Column Family for wallet state.
pub const CF_WALLETS: &str = "wallets";
/// Column Family mapping a user to their wallet id.
pub const CF_OWNERS: &str = "owners";
/// Column Family for the append-only transaction records.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family for recurring payment schedules.
pub const CF_SCHEDULES: &str = "schedules";

/// A persistent ledger and schedule store backed by RocksDB.
///
/// Each entity kind lives in its own Column Family, keyed by the raw UUID bytes and stored as
/// JSON. A commit writes both wallets and the record in a single `WriteBatch`, so a crash
/// leaves either all of it or none of it on disk.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>` and locks).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    locks: WalletLocks,
    /// Serializes wallet creation so the one-wallet-per-user check cannot race.
    open_lock: Arc<Mutex<()>>,
    /// Serializes schedule read-modify-write against cancellation.
    schedule_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any missing
    /// Column Family.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_WALLETS, CF_OWNERS, CF_TRANSACTIONS, CF_SCHEDULES]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            locks: WalletLocks::new(),
            open_lock: Arc::new(Mutex::new(())),
            schedule_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::storage(format!("column family '{name}' not found")))
    }

    fn get_json<T: DeserializeOwned>(&self, family: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(family)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(LedgerError::storage),
            None => Ok(None),
        }
    }

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(LedgerError::storage)
    }

    fn scan<T: DeserializeOwned>(&self, family: &str) -> Result<Vec<T>> {
        let cf = self.cf(family)?;
        self.db
            .iterator_cf(cf, IteratorMode::Start)
            .map(|item| {
                let (_key, value) = item?;
                serde_json::from_slice(&value).map_err(LedgerError::storage)
            })
            .collect()
    }
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn open_wallet(&self, owner: UserId, currency: Currency) -> Result<Wallet> {
        let _guard = self.open_lock.lock().await;
        if self.get_json::<WalletId>(CF_OWNERS, owner.0.as_bytes())?.is_some() {
            return Err(LedgerError::WalletAlreadyExists(owner));
        }

        let wallet = Wallet::new(owner, currency);
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_WALLETS)?, wallet.id.0.as_bytes(), Self::encode(&wallet)?);
        batch.put_cf(self.cf(CF_OWNERS)?, owner.0.as_bytes(), Self::encode(&wallet.id)?);
        self.db.write(batch)?;

        Ok(wallet)
    }

    async fn load_wallet(&self, id: WalletId) -> Result<Option<Wallet>> {
        self.get_json(CF_WALLETS, id.0.as_bytes())
    }

    async fn wallet_for_user(&self, owner: UserId) -> Result<Option<Wallet>> {
        match self.get_json::<WalletId>(CF_OWNERS, owner.0.as_bytes())? {
            Some(id) => self.load_wallet(id).await,
            None => Ok(None),
        }
    }

    async fn commit_transfer(&self, posting: Posting) -> Result<TransactionRecord> {
        let participants = posting.lock_order();
        let _guards = self.locks.acquire(&participants).await;

        let mut working = participants
            .iter()
            .map(|id| {
                self.get_json::<Wallet>(CF_WALLETS, id.0.as_bytes())?
                    .ok_or(LedgerError::WalletNotFound(*id))
            })
            .collect::<Result<Vec<_>>>()?;

        let id = TransactionId::new();
        posting.apply_to(&mut working, id)?;
        let record = posting.into_record(id, Utc::now());

        let wallets_cf = self.cf(CF_WALLETS)?;
        let mut batch = WriteBatch::default();
        for wallet in &working {
            batch.put_cf(wallets_cf, wallet.id.0.as_bytes(), Self::encode(wallet)?);
        }
        batch.put_cf(
            self.cf(CF_TRANSACTIONS)?,
            record.id.0.as_bytes(),
            Self::encode(&record)?,
        );
        self.db.write(batch)?;
        info!(tx = %record.id, kind = ?record.kind, amount = %record.amount, "transaction committed");

        Ok(record)
    }

    async fn transaction(&self, id: TransactionId) -> Result<Option<TransactionRecord>> {
        self.get_json(CF_TRANSACTIONS, id.0.as_bytes())
    }

    async fn history(&self, wallet: WalletId) -> Result<Vec<TransactionRecord>> {
        let wallet = self
            .load_wallet(wallet)
            .await?
            .ok_or(LedgerError::WalletNotFound(wallet))?;
        let mut records = Vec::with_capacity(wallet.transactions.len());
        for id in wallet.transactions {
            if let Some(record) = self.transaction(id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn all_wallets(&self) -> Result<Vec<Wallet>> {
        self.scan(CF_WALLETS)
    }
}

#[async_trait]
impl ScheduleStore for RocksDBStore {
    async fn create_schedule(&self, schedule: ScheduledPayment) -> Result<ScheduledPayment> {
        let _guard = self.schedule_lock.lock().await;
        self.db.put_cf(
            self.cf(CF_SCHEDULES)?,
            schedule.id.0.as_bytes(),
            Self::encode(&schedule)?,
        )?;
        Ok(schedule)
    }

    async fn cancel_schedule(&self, id: ScheduleId, owner: UserId) -> Result<()> {
        let _guard = self.schedule_lock.lock().await;
        match self.get_json::<ScheduledPayment>(CF_SCHEDULES, id.0.as_bytes())? {
            Some(schedule) if schedule.owner == owner => {
                self.db.delete_cf(self.cf(CF_SCHEDULES)?, id.0.as_bytes())?;
                Ok(())
            }
            _ => Err(LedgerError::ScheduleNotFound(id)),
        }
    }

    async fn list_schedules(&self, owner: UserId) -> Result<Vec<ScheduledPayment>> {
        let mut owned: Vec<ScheduledPayment> = self
            .scan::<ScheduledPayment>(CF_SCHEDULES)?
            .into_iter()
            .filter(|schedule| schedule.owner == owner)
            .collect();
        sort_by_due(&mut owned);
        Ok(owned)
    }

    async fn find_due(&self, as_of: DateTime<Utc>) -> Result<Vec<ScheduledPayment>> {
        let mut due: Vec<ScheduledPayment> = self
            .scan::<ScheduledPayment>(CF_SCHEDULES)?
            .into_iter()
            .filter(|schedule| schedule.is_due(as_of))
            .collect();
        sort_by_due(&mut due);
        Ok(due)
    }

    async fn advance_next_due(&self, id: ScheduleId, next_due: DateTime<Utc>) -> Result<()> {
        let _guard = self.schedule_lock.lock().await;
        let mut schedule = self
            .get_json::<ScheduledPayment>(CF_SCHEDULES, id.0.as_bytes())?
            .ok_or(LedgerError::ScheduleNotFound(id))?;
        schedule.next_due = next_due;
        self.db.put_cf(
            self.cf(CF_SCHEDULES)?,
            id.0.as_bytes(),
            Self::encode(&schedule)?,
        )?;
        Ok(())
    }

    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<ScheduledPayment>> {
        self.get_json(CF_SCHEDULES, id.0.as_bytes())
    }
}
