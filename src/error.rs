use crate::domain::currency::Currency;
use crate::domain::schedule::ScheduleId;
use crate::domain::wallet::{UserId, WalletId};
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the ledger core and its adapters.
///
/// Domain failures (`InvalidAmount`, `InsufficientFunds`, ...) carry enough detail to be shown
/// to the caller as-is. `StorageUnavailable` keeps the backend error as its source but only
/// displays a generic retry message.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid amount {0}: amounts must be positive")]
    InvalidAmount(Decimal),
    #[error("cannot transfer from wallet {0} to itself")]
    SameWallet(WalletId),
    #[error("wallet {0} not found")]
    WalletNotFound(WalletId),
    #[error("user {0} has no wallet")]
    NoWalletForUser(UserId),
    #[error("user {0} already owns a wallet")]
    WalletAlreadyExists(UserId),
    #[error("scheduled payment {0} not found")]
    ScheduleNotFound(ScheduleId),
    #[error("insufficient funds in wallet {wallet}: available {available}, requested {requested}")]
    InsufficientFunds {
        wallet: WalletId,
        available: Decimal,
        requested: Decimal,
    },
    #[error("no exchange rate defined from {from} to {to}")]
    UnsupportedConversion { from: Currency, to: Currency },
    #[error("storage temporarily unavailable, please try again")]
    StorageUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("operation did not complete within {0:?}; its outcome is unknown")]
    OutcomeUnknown(Duration),
    /// A task died before reporting back; whether its effect landed is not known.
    #[error("internal error: {0}")]
    Internal(String),
    #[error("notification failed: {0}")]
    NotificationFailure(String),
    #[error("invalid input: {0}")]
    Input(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    /// Wraps a backend failure so that it is reported as retryable.
    pub fn storage<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::StorageUnavailable(err.into())
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        Self::storage(err)
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
