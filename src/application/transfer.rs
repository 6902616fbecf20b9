use crate::application::notify::{Alert, AlertKind, Notifier};
use crate::domain::currency::CurrencyConverter;
use crate::domain::ports::LedgerStoreRef;
use crate::domain::transaction::{Posting, TransactionRecord};
use crate::domain::wallet::{Amount, Balance, UserId, Wallet, WalletId};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{error, info, warn};

/// Executes transfers, deposits and withdrawals against the ledger.
///
/// Every operation validates its input before touching storage, then funnels into a single
/// `LedgerStore::commit_transfer` call, which is where funds are checked under the wallet locks.
/// Cloning is cheap; clones share the same ledger and notifier.
#[derive(Clone)]
pub struct TransferEngine {
    ledger: LedgerStoreRef,
    converter: CurrencyConverter,
    notifier: Notifier,
}

impl TransferEngine {
    pub fn new(ledger: LedgerStoreRef, converter: CurrencyConverter, notifier: Notifier) -> Self {
        Self {
            ledger,
            converter,
            notifier,
        }
    }

    pub fn ledger(&self) -> &LedgerStoreRef {
        &self.ledger
    }

    pub fn converter(&self) -> &CurrencyConverter {
        &self.converter
    }

    /// Moves `amount` (in the sender's currency) from `sender` to `receiver`.
    ///
    /// Errors are reported in this order: `InvalidAmount`, `SameWallet`, `WalletNotFound`,
    /// `UnsupportedConversion`, `InsufficientFunds`. The returned record stores `amount`; the
    /// receiver is credited the converted value, recoverable through
    /// [`TransactionRecord::credited_amount`].
    pub async fn transfer(
        &self,
        sender: WalletId,
        receiver: WalletId,
        amount: Decimal,
    ) -> Result<TransactionRecord> {
        let amount = Amount::new(amount)?;
        if sender == receiver {
            return Err(LedgerError::SameWallet(sender));
        }

        // Currency never changes after a wallet is opened, so reading it before the commit
        // locks are taken is safe. Balances are only read under the locks.
        let from = self.require_wallet(sender).await?;
        let to = self.require_wallet(receiver).await?;
        let credited = self
            .converter
            .try_convert(amount.value(), from.currency, to.currency)?;

        let record = self
            .ledger
            .commit_transfer(Posting::transfer(sender, receiver, amount.value(), credited))
            .await?;
        info!(
            tx = %record.id,
            %sender,
            %receiver,
            amount = %amount.value(),
            %credited,
            "transfer committed"
        );

        self.notifier.dispatch(vec![
            Alert {
                kind: AlertKind::Debit,
                user: from.owner,
                counterparty: Some(to.owner),
                amount: amount.value(),
                currency: from.currency,
                tx: record.id,
            },
            Alert {
                kind: AlertKind::Credit,
                user: to.owner,
                counterparty: Some(from.owner),
                amount: credited,
                currency: to.currency,
                tx: record.id,
            },
        ]);

        Ok(record)
    }

    /// Runs [`Self::transfer`] with a deadline.
    ///
    /// The transfer keeps running after the deadline passes, so a timeout yields
    /// `OutcomeUnknown` rather than a failure: the commit may still land. Callers reconcile
    /// through the ledger history or the record id once known.
    pub async fn transfer_with_timeout(
        &self,
        sender: WalletId,
        receiver: WalletId,
        amount: Decimal,
        timeout: Duration,
    ) -> Result<TransactionRecord> {
        let engine = self.clone();
        let task = tokio::spawn(async move { engine.transfer(sender, receiver, amount).await });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                error!(%sender, %receiver, %amount, error = %join_err, "transfer task aborted");
                Err(LedgerError::Internal(format!(
                    "transfer task aborted, outcome unknown: {join_err}"
                )))
            }
            Err(_) => {
                warn!(%sender, %receiver, %amount, ?timeout, "transfer timed out, outcome unknown");
                Err(LedgerError::OutcomeUnknown(timeout))
            }
        }
    }

    pub async fn deposit(&self, wallet: WalletId, amount: Decimal) -> Result<TransactionRecord> {
        let amount = Amount::new(amount)?;
        let target = self.require_wallet(wallet).await?;

        let record = self
            .ledger
            .commit_transfer(Posting::deposit(wallet, amount.value()))
            .await?;
        info!(tx = %record.id, %wallet, amount = %amount.value(), "deposit committed");

        self.notifier.dispatch(vec![Alert {
            kind: AlertKind::Deposit,
            user: target.owner,
            counterparty: None,
            amount: amount.value(),
            currency: target.currency,
            tx: record.id,
        }]);
        Ok(record)
    }

    pub async fn withdraw(&self, wallet: WalletId, amount: Decimal) -> Result<TransactionRecord> {
        let amount = Amount::new(amount)?;
        let source = self.require_wallet(wallet).await?;

        let record = self
            .ledger
            .commit_transfer(Posting::withdrawal(wallet, amount.value()))
            .await?;
        info!(tx = %record.id, %wallet, amount = %amount.value(), "withdrawal committed");

        self.notifier.dispatch(vec![Alert {
            kind: AlertKind::Withdrawal,
            user: source.owner,
            counterparty: None,
            amount: amount.value(),
            currency: source.currency,
            tx: record.id,
        }]);
        Ok(record)
    }

    /// Balance of the wallet owned by `owner`.
    pub async fn balance(&self, owner: UserId) -> Result<Balance> {
        self.ledger.get_balance(owner).await
    }

    async fn require_wallet(&self, id: WalletId) -> Result<Wallet> {
        self.ledger
            .load_wallet(id)
            .await?
            .ok_or(LedgerError::WalletNotFound(id))
    }
}
