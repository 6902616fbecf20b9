use crate::domain::currency::Currency;
use crate::domain::ports::{DirectoryRef, NotificationSinkRef};
use crate::domain::transaction::TransactionId;
use crate::domain::wallet::UserId;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Debit,
    Credit,
    Deposit,
    Withdrawal,
}

impl AlertKind {
    pub fn subject(&self) -> &'static str {
        match self {
            AlertKind::Debit => "Debit Alert",
            AlertKind::Credit => "Credit Alert",
            AlertKind::Deposit => "Deposit Alert",
            AlertKind::Withdrawal => "Withdrawal Alert",
        }
    }
}

/// A notification owed to one user about one committed record.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    pub user: UserId,
    pub counterparty: Option<UserId>,
    /// Amount as it affected `user`, in `currency`.
    pub amount: Decimal,
    pub currency: Currency,
    pub tx: TransactionId,
}

/// Resolves alert recipients through the directory and hands them to the sink.
///
/// Delivery runs on a detached task after the commit; nothing here can fail a transfer.
#[derive(Clone)]
pub struct Notifier {
    directory: DirectoryRef,
    sink: NotificationSinkRef,
}

impl Notifier {
    pub fn new(directory: DirectoryRef, sink: NotificationSinkRef) -> Self {
        Self { directory, sink }
    }

    /// Spawns delivery of `alerts`. Failures are logged and dropped.
    pub fn dispatch(&self, alerts: Vec<Alert>) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move {
            for alert in alerts {
                if let Err(err) = notifier.deliver(&alert).await {
                    warn!(tx = %alert.tx, user = %alert.user, error = %err, "notification not delivered");
                }
            }
        })
    }

    pub async fn deliver(&self, alert: &Alert) -> Result<()> {
        let contact = self.directory.contact(alert.user).await?.ok_or_else(|| {
            LedgerError::NotificationFailure(format!("no contact for user {}", alert.user))
        })?;

        let counterparty = match alert.counterparty {
            Some(user) => self
                .directory
                .contact(user)
                .await
                .ok()
                .flatten()
                .map(|contact| contact.username),
            None => None,
        }
        .unwrap_or_else(|| "another wallet".to_string());

        let amount = format!("{} {}", alert.amount.normalize(), alert.currency);
        let body = match alert.kind {
            AlertKind::Debit => format!("You sent {amount} to {counterparty}."),
            AlertKind::Credit => format!("You received {amount} from {counterparty}."),
            AlertKind::Deposit => format!("{amount} was deposited into your wallet."),
            AlertKind::Withdrawal => format!("{amount} was withdrawn from your wallet."),
        };

        debug!(tx = %alert.tx, recipient = %contact.email, "sending notification");
        self.sink
            .notify(&contact.email, alert.kind.subject(), &body)
            .await
            .map_err(|err| match err {
                LedgerError::NotificationFailure(_) => err,
                other => LedgerError::NotificationFailure(other.to_string()),
            })
    }
}
