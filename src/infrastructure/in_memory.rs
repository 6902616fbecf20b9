use crate::domain::currency::Currency;
use crate::domain::ports::{Contact, Directory, LedgerStore, ScheduleStore};
use crate::domain::schedule::{ScheduleId, ScheduledPayment};
use crate::domain::transaction::{Posting, TransactionId, TransactionRecord};
use crate::domain::wallet::{UserId, Wallet, WalletId};
use crate::error::{LedgerError, Result};
use crate::infrastructure::locks::WalletLocks;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Default)]
struct LedgerState {
    wallets: HashMap<WalletId, Wallet>,
    owners: HashMap<UserId, WalletId>,
    transactions: HashMap<TransactionId, TransactionRecord>,
}

/// A thread-safe in-memory ledger.
///
/// Wallets, the owner index and records share one `RwLock` so a commit becomes visible in a
/// single write. The check-then-mutate window is covered by [`WalletLocks`], not by that
/// `RwLock`, so commits on disjoint wallets only contend for the brief final write.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
    locks: WalletLocks,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn open_wallet(&self, owner: UserId, currency: Currency) -> Result<Wallet> {
        let mut state = self.state.write().await;
        if state.owners.contains_key(&owner) {
            return Err(LedgerError::WalletAlreadyExists(owner));
        }
        let wallet = Wallet::new(owner, currency);
        state.owners.insert(owner, wallet.id);
        state.wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    async fn load_wallet(&self, id: WalletId) -> Result<Option<Wallet>> {
        let state = self.state.read().await;
        Ok(state.wallets.get(&id).cloned())
    }

    async fn wallet_for_user(&self, owner: UserId) -> Result<Option<Wallet>> {
        let state = self.state.read().await;
        Ok(state
            .owners
            .get(&owner)
            .and_then(|id| state.wallets.get(id))
            .cloned())
    }

    async fn commit_transfer(&self, posting: Posting) -> Result<TransactionRecord> {
        let participants = posting.lock_order();
        let _guards = self.locks.acquire(&participants).await;

        let mut working = {
            let state = self.state.read().await;
            participants
                .iter()
                .map(|id| {
                    state
                        .wallets
                        .get(id)
                        .cloned()
                        .ok_or(LedgerError::WalletNotFound(*id))
                })
                .collect::<Result<Vec<_>>>()?
        };

        let id = TransactionId::new();
        posting.apply_to(&mut working, id)?;
        let record = posting.into_record(id, Utc::now());

        let mut state = self.state.write().await;
        for wallet in working {
            state.wallets.insert(wallet.id, wallet);
        }
        state.transactions.insert(record.id, record.clone());
        info!(tx = %record.id, kind = ?record.kind, amount = %record.amount, "transaction committed");

        Ok(record)
    }

    async fn transaction(&self, id: TransactionId) -> Result<Option<TransactionRecord>> {
        let state = self.state.read().await;
        Ok(state.transactions.get(&id).cloned())
    }

    async fn history(&self, wallet: WalletId) -> Result<Vec<TransactionRecord>> {
        let state = self.state.read().await;
        let wallet = state
            .wallets
            .get(&wallet)
            .ok_or(LedgerError::WalletNotFound(wallet))?;
        Ok(wallet
            .transactions
            .iter()
            .filter_map(|id| state.transactions.get(id).cloned())
            .collect())
    }

    async fn all_wallets(&self) -> Result<Vec<Wallet>> {
        let state = self.state.read().await;
        Ok(state.wallets.values().cloned().collect())
    }
}

/// A thread-safe in-memory store for recurring payment schedules.
#[derive(Default, Clone)]
pub struct InMemoryScheduleStore {
    schedules: Arc<RwLock<HashMap<ScheduleId, ScheduledPayment>>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Orders schedules earliest-due first, ties broken by id.
pub(crate) fn sort_by_due(schedules: &mut [ScheduledPayment]) {
    schedules.sort_by(|a, b| a.next_due.cmp(&b.next_due).then(a.id.cmp(&b.id)));
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn create_schedule(&self, schedule: ScheduledPayment) -> Result<ScheduledPayment> {
        let mut schedules = self.schedules.write().await;
        schedules.insert(schedule.id, schedule.clone());
        Ok(schedule)
    }

    async fn cancel_schedule(&self, id: ScheduleId, owner: UserId) -> Result<()> {
        let mut schedules = self.schedules.write().await;
        match schedules.get(&id) {
            Some(schedule) if schedule.owner == owner => {
                schedules.remove(&id);
                Ok(())
            }
            _ => Err(LedgerError::ScheduleNotFound(id)),
        }
    }

    async fn list_schedules(&self, owner: UserId) -> Result<Vec<ScheduledPayment>> {
        let schedules = self.schedules.read().await;
        let mut owned: Vec<_> = schedules
            .values()
            .filter(|schedule| schedule.owner == owner)
            .cloned()
            .collect();
        sort_by_due(&mut owned);
        Ok(owned)
    }

    async fn find_due(&self, as_of: DateTime<Utc>) -> Result<Vec<ScheduledPayment>> {
        let schedules = self.schedules.read().await;
        let mut due: Vec<_> = schedules
            .values()
            .filter(|schedule| schedule.is_due(as_of))
            .cloned()
            .collect();
        sort_by_due(&mut due);
        Ok(due)
    }

    async fn advance_next_due(&self, id: ScheduleId, next_due: DateTime<Utc>) -> Result<()> {
        let mut schedules = self.schedules.write().await;
        let schedule = schedules
            .get_mut(&id)
            .ok_or(LedgerError::ScheduleNotFound(id))?;
        schedule.next_due = next_due;
        Ok(())
    }

    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<ScheduledPayment>> {
        let schedules = self.schedules.read().await;
        Ok(schedules.get(&id).cloned())
    }
}

/// In-memory user directory, standing in for the identity service.
#[derive(Default, Clone)]
pub struct InMemoryDirectory {
    contacts: Arc<RwLock<HashMap<UserId, Contact>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, user: UserId, contact: Contact) {
        self.contacts.write().await.insert(user, contact);
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn contact(&self, user: UserId) -> Result<Option<Contact>> {
        Ok(self.contacts.read().await.get(&user).cloned())
    }
}
