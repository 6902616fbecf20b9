use crate::domain::currency::{Currency, CurrencyConverter};
use crate::domain::wallet::{Wallet, WalletId};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Transfer,
    Deposit,
    Withdrawal,
}

/// An immutable ledger entry, written exactly once per successful balance mutation.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TransactionRecord {
    pub id: TransactionId,
    /// Debited wallet; `None` for deposits.
    pub sender: Option<WalletId>,
    /// Credited wallet; `None` for withdrawals.
    pub receiver: Option<WalletId>,
    /// Amount in the sender's currency (the wallet's own currency for deposits).
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Reconstructs how much the receiver was credited.
    ///
    /// Records keep the sender-side amount only, so a receiver in another currency has to
    /// re-apply the conversion used at commit time.
    pub fn credited_amount(
        &self,
        converter: &CurrencyConverter,
        sender_currency: Currency,
        receiver_currency: Currency,
    ) -> Result<Decimal> {
        converter.convert(self.amount, sender_currency, receiver_currency)
    }
}

/// One side of a posting: the wallet touched and the unsigned amount moved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leg {
    pub wallet: WalletId,
    pub amount: Decimal,
}

/// Everything `LedgerStore::commit_transfer` needs to apply one atomic mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub debit: Option<Leg>,
    pub credit: Option<Leg>,
    pub kind: TransactionKind,
    /// Amount stored on the resulting record, in the debited (or deposited) currency.
    pub recorded_amount: Decimal,
}

impl Posting {
    pub fn transfer(sender: WalletId, receiver: WalletId, debited: Decimal, credited: Decimal) -> Self {
        Self {
            debit: Some(Leg {
                wallet: sender,
                amount: debited,
            }),
            credit: Some(Leg {
                wallet: receiver,
                amount: credited,
            }),
            kind: TransactionKind::Transfer,
            recorded_amount: debited,
        }
    }

    pub fn deposit(wallet: WalletId, amount: Decimal) -> Self {
        Self {
            debit: None,
            credit: Some(Leg { wallet, amount }),
            kind: TransactionKind::Deposit,
            recorded_amount: amount,
        }
    }

    pub fn withdrawal(wallet: WalletId, amount: Decimal) -> Self {
        Self {
            debit: Some(Leg { wallet, amount }),
            credit: None,
            kind: TransactionKind::Withdrawal,
            recorded_amount: amount,
        }
    }

    /// Participating wallets in lock order, without duplicates.
    pub fn lock_order(&self) -> Vec<WalletId> {
        let mut ids: Vec<WalletId> = self
            .debit
            .iter()
            .chain(self.credit.iter())
            .map(|leg| leg.wallet)
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Applies both legs to `wallets` and links them to `record`.
    ///
    /// `wallets` are working copies of every participant; on error some copies may be half
    /// updated, so callers must discard them rather than persist.
    pub fn apply_to(&self, wallets: &mut [Wallet], record: TransactionId) -> Result<()> {
        if let Some(leg) = self.debit {
            participant(wallets, leg.wallet)?.debit(leg.amount)?;
        }
        if let Some(leg) = self.credit {
            participant(wallets, leg.wallet)?.credit(leg.amount)?;
        }
        for wallet in wallets.iter_mut() {
            wallet.transactions.push(record);
        }
        Ok(())
    }

    /// Builds the record this posting produces once committed.
    pub fn into_record(self, id: TransactionId, created_at: DateTime<Utc>) -> TransactionRecord {
        TransactionRecord {
            id,
            sender: self.debit.map(|leg| leg.wallet),
            receiver: self.credit.map(|leg| leg.wallet),
            amount: self.recorded_amount,
            kind: self.kind,
            created_at,
        }
    }
}

fn participant(wallets: &mut [Wallet], id: WalletId) -> Result<&mut Wallet> {
    wallets
        .iter_mut()
        .find(|wallet| wallet.id == id)
        .ok_or(LedgerError::WalletNotFound(id))
}
