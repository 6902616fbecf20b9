use crate::domain::currency::Currency;
use crate::domain::transaction::TransactionId;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identity of a user, resolved to a contact through the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque identity of a wallet.
///
/// The `Ord` implementation defines the global lock order used when a commit has to hold two
/// wallets at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WalletId(pub Uuid);

impl WalletId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WalletId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A non-negative monetary value held by a wallet.
///
/// Wraps `rust_decimal::Decimal` so balances never go through floating point.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Subtracts `amount`, refusing to go below zero.
    pub fn checked_debit(self, amount: Decimal) -> Option<Self> {
        let next = self.0.checked_sub(amount)?;
        (next >= Decimal::ZERO).then_some(Self(next))
    }

    pub fn checked_credit(self, amount: Decimal) -> Option<Self> {
        self.0.checked_add(amount).map(Self)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.normalize().fmt(f)
    }
}

/// A strictly positive amount requested for a transfer, deposit, withdrawal or schedule.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(LedgerError::InvalidAmount(value))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// A balance-holding account owned by exactly one user, denominated in one currency.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Wallet {
    pub id: WalletId,
    pub owner: UserId,
    pub balance: Balance,
    pub currency: Currency,
    /// Every record this wallet took part in, in commit order.
    pub transactions: Vec<TransactionId>,
}

impl Wallet {
    pub fn new(owner: UserId, currency: Currency) -> Self {
        Self {
            id: WalletId::new(),
            owner,
            balance: Balance::ZERO,
            currency,
            transactions: Vec::new(),
        }
    }

    /// Removes funds if the balance covers them.
    pub fn debit(&mut self, amount: Decimal) -> Result<()> {
        self.balance = self
            .balance
            .checked_debit(amount)
            .ok_or(LedgerError::InsufficientFunds {
                wallet: self.id,
                available: self.balance.value(),
                requested: amount,
            })?;
        Ok(())
    }

    pub fn credit(&mut self, amount: Decimal) -> Result<()> {
        self.balance = self
            .balance
            .checked_credit(amount)
            .ok_or(LedgerError::InvalidAmount(amount))?;
        Ok(())
    }
}
