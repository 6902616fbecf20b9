use super::currency::Currency;
use super::schedule::{ScheduleId, ScheduledPayment};
use super::transaction::{Posting, TransactionId, TransactionRecord};
use super::wallet::{Balance, UserId, Wallet, WalletId};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Durable home of wallets and transaction records.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Opens an empty wallet for `owner`. A user owns at most one wallet.
    async fn open_wallet(&self, owner: UserId, currency: Currency) -> Result<Wallet>;

    async fn load_wallet(&self, id: WalletId) -> Result<Option<Wallet>>;

    async fn wallet_for_user(&self, owner: UserId) -> Result<Option<Wallet>>;

    async fn get_balance(&self, owner: UserId) -> Result<Balance> {
        self.wallet_for_user(owner)
            .await?
            .map(|wallet| wallet.balance)
            .ok_or(LedgerError::NoWalletForUser(owner))
    }

    /// Applies a posting atomically.
    ///
    /// Implementations lock every participating wallet in [`Posting::lock_order`], check funds
    /// against the balance read under that lock, then persist both balances and the record as
    /// one unit. On error nothing is written.
    async fn commit_transfer(&self, posting: Posting) -> Result<TransactionRecord>;

    async fn transaction(&self, id: TransactionId) -> Result<Option<TransactionRecord>>;

    /// Records the wallet took part in, oldest first.
    async fn history(&self, wallet: WalletId) -> Result<Vec<TransactionRecord>>;

    async fn all_wallets(&self) -> Result<Vec<Wallet>>;
}

/// Durable home of recurring payment schedules.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn create_schedule(&self, schedule: ScheduledPayment) -> Result<ScheduledPayment>;

    /// Deletes the schedule if it exists and belongs to `owner`.
    async fn cancel_schedule(&self, id: ScheduleId, owner: UserId) -> Result<()>;

    async fn list_schedules(&self, owner: UserId) -> Result<Vec<ScheduledPayment>>;

    /// Schedules with `next_due <= as_of`, earliest first.
    async fn find_due(&self, as_of: DateTime<Utc>) -> Result<Vec<ScheduledPayment>>;

    async fn advance_next_due(&self, id: ScheduleId, next_due: DateTime<Utc>) -> Result<()>;

    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<ScheduledPayment>>;
}

/// Addressing details of a user, used for notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub username: String,
    pub email: String,
}

/// Resolves users to contacts. Owned by the identity service.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn contact(&self, user: UserId) -> Result<Option<Contact>>;
}

/// Best-effort delivery of alerts. Failures never undo a committed operation.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// Source of the current time for time-driven components.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type LedgerStoreRef = Arc<dyn LedgerStore>;
pub type ScheduleStoreRef = Arc<dyn ScheduleStore>;
pub type DirectoryRef = Arc<dyn Directory>;
pub type NotificationSinkRef = Arc<dyn NotificationSink>;
pub type ClockRef = Arc<dyn Clock>;
