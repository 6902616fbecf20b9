use crate::application::clock::ManualClock;
use crate::application::notify::Notifier;
use crate::application::scheduler::{PaymentScheduler, TickReport};
use crate::application::transfer::TransferEngine;
use crate::config::Settings;
use crate::domain::currency::Currency;
use crate::domain::ports::{Clock, Contact, LedgerStoreRef, ScheduleStoreRef};
use crate::domain::schedule::{Frequency, ScheduledPayment};
use crate::domain::wallet::{UserId, Wallet};
use crate::error::{LedgerError, Result};
use crate::infrastructure::in_memory::InMemoryDirectory;
use crate::infrastructure::notification::TracingNotificationSink;
use crate::interfaces::csv::balance_writer::BalanceRow;
use crate::interfaces::csv::command_reader::{CommandType, LedgerCommand};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Stable user identity for a username, so persisted wallets are found again on later runs.
pub fn user_id_for(username: &str) -> UserId {
    UserId(Uuid::new_v5(&Uuid::NAMESPACE_OID, username.as_bytes()))
}

/// Applies CSV ledger commands to the core.
///
/// Users are addressed by username. The scheduler runs on a manual clock that only moves on
/// `tick` rows, which keeps a command file's outcome independent of when it is run.
pub struct CommandRunner {
    engine: TransferEngine,
    schedules: ScheduleStoreRef,
    scheduler: PaymentScheduler,
    clock: ManualClock,
    directory: Arc<InMemoryDirectory>,
    names: HashMap<UserId, String>,
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(ledger: LedgerStoreRef, schedules: ScheduleStoreRef, settings: &Settings) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        let notifier = Notifier::new(directory.clone(), Arc::new(TracingNotificationSink));
        let engine = TransferEngine::new(ledger, settings.converter(), notifier);
        let clock = ManualClock::new(Utc::now());
        let scheduler =
            PaymentScheduler::new(schedules.clone(), engine.clone(), Arc::new(clock.clone()));

        Self {
            engine,
            schedules,
            scheduler,
            clock,
            directory,
            names: HashMap::new(),
            timeout: settings.transfer_timeout(),
        }
    }

    pub async fn apply(&mut self, command: LedgerCommand) -> Result<()> {
        match command.r#type {
            CommandType::Open => {
                let user = self.user(&command).await?;
                let currency = command.currency.unwrap_or(Currency::Ngn);
                self.engine.ledger().open_wallet(user, currency).await?;
            }
            CommandType::Deposit => {
                let wallet = self.wallet_of(&command).await?;
                self.engine.deposit(wallet.id, amount(&command)?).await?;
            }
            CommandType::Withdraw => {
                let wallet = self.wallet_of(&command).await?;
                self.engine.withdraw(wallet.id, amount(&command)?).await?;
            }
            CommandType::Transfer => {
                let sender = self.wallet_of(&command).await?;
                let receiver = self.counterparty_wallet(&command).await?;
                self.engine
                    .transfer_with_timeout(sender.id, receiver.id, amount(&command)?, self.timeout)
                    .await?;
            }
            CommandType::Schedule => {
                let owner = self.user(&command).await?;
                let receiver = self.counterparty_wallet(&command).await?;
                let frequency = command.frequency.unwrap_or(Frequency::Monthly);
                let start = command.at.unwrap_or_else(|| self.clock.now());
                let schedule =
                    ScheduledPayment::new(owner, receiver.id, amount(&command)?, frequency, start)?;
                self.schedules.create_schedule(schedule).await?;
            }
            CommandType::Cancel => {
                let owner = self.user(&command).await?;
                let receiver = self.counterparty_wallet(&command).await?;
                let matching: Vec<_> = self
                    .schedules
                    .list_schedules(owner)
                    .await?
                    .into_iter()
                    .filter(|schedule| schedule.receiver == receiver.id)
                    .collect();
                if matching.is_empty() {
                    return Err(LedgerError::Input(format!(
                        "no scheduled payment from {} to {}",
                        command.user.as_deref().unwrap_or_default(),
                        command.counterparty.as_deref().unwrap_or_default()
                    )));
                }
                for schedule in matching {
                    self.schedules.cancel_schedule(schedule.id, owner).await?;
                }
            }
            CommandType::Tick => {
                self.tick(command.at).await?;
            }
        }
        Ok(())
    }

    /// Moves the clock to `at` (if given) and runs one scheduler pass.
    pub async fn tick(&self, at: Option<DateTime<Utc>>) -> Result<TickReport> {
        if let Some(at) = at {
            self.clock.set(at);
        }
        self.scheduler.tick().await
    }

    /// Current balances of every wallet, ordered by username.
    pub async fn balances(&self) -> Result<Vec<BalanceRow>> {
        let mut rows: Vec<BalanceRow> = self
            .engine
            .ledger()
            .all_wallets()
            .await?
            .into_iter()
            .map(|wallet| BalanceRow {
                user: self
                    .names
                    .get(&wallet.owner)
                    .cloned()
                    .unwrap_or_else(|| wallet.owner.to_string()),
                currency: wallet.currency,
                balance: wallet.balance.value(),
            })
            .collect();
        rows.sort_by(|a, b| a.user.cmp(&b.user));
        Ok(rows)
    }

    async fn user(&mut self, command: &LedgerCommand) -> Result<UserId> {
        let name = command
            .user
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| LedgerError::Input(format!("{:?} requires a user", command.r#type)))?;
        Ok(self.register(name).await)
    }

    async fn register(&mut self, name: &str) -> UserId {
        let user = user_id_for(name);
        if !self.names.contains_key(&user) {
            self.names.insert(user, name.to_string());
            self.directory
                .register(
                    user,
                    Contact {
                        username: name.to_string(),
                        email: format!("{name}@fincore.local"),
                    },
                )
                .await;
        }
        user
    }

    async fn wallet_of(&mut self, command: &LedgerCommand) -> Result<Wallet> {
        let user = self.user(command).await?;
        self.engine
            .ledger()
            .wallet_for_user(user)
            .await?
            .ok_or(LedgerError::NoWalletForUser(user))
    }

    async fn counterparty_wallet(&mut self, command: &LedgerCommand) -> Result<Wallet> {
        let name = command
            .counterparty
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                LedgerError::Input(format!("{:?} requires a counterparty", command.r#type))
            })?;
        let user = self.register(name).await;
        self.engine
            .ledger()
            .wallet_for_user(user)
            .await?
            .ok_or(LedgerError::NoWalletForUser(user))
    }
}

fn amount(command: &LedgerCommand) -> Result<Decimal> {
    command
        .amount
        .ok_or_else(|| LedgerError::Input(format!("{:?} requires an amount", command.r#type)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::{InMemoryLedgerStore, InMemoryScheduleStore};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn runner() -> CommandRunner {
        CommandRunner::new(
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(InMemoryScheduleStore::new()),
            &Settings::default(),
        )
    }

    fn command(kind: CommandType, user: &str, counterparty: &str, amount: Option<Decimal>) -> LedgerCommand {
        LedgerCommand {
            r#type: kind,
            user: Some(user.to_string()).filter(|u| !u.is_empty()),
            counterparty: Some(counterparty.to_string()).filter(|c| !c.is_empty()),
            amount,
            currency: None,
            frequency: None,
            at: None,
        }
    }

    #[test]
    fn test_user_ids_are_stable() {
        assert_eq!(user_id_for("alice"), user_id_for("alice"));
        assert_ne!(user_id_for("alice"), user_id_for("bob"));
    }

    #[tokio::test]
    async fn test_open_deposit_transfer() {
        let mut runner = runner();
        runner.apply(command(CommandType::Open, "alice", "", None)).await.unwrap();
        runner.apply(command(CommandType::Open, "bob", "", None)).await.unwrap();
        runner
            .apply(command(CommandType::Deposit, "alice", "", Some(dec!(1000))))
            .await
            .unwrap();
        runner
            .apply(command(CommandType::Transfer, "alice", "bob", Some(dec!(300))))
            .await
            .unwrap();

        let rows = runner.balances().await.unwrap();
        assert_eq!(
            rows,
            vec![
                BalanceRow {
                    user: "alice".to_string(),
                    currency: Currency::Ngn,
                    balance: dec!(700)
                },
                BalanceRow {
                    user: "bob".to_string(),
                    currency: Currency::Ngn,
                    balance: dec!(300)
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_fields_are_input_errors() {
        let mut runner = runner();
        assert!(matches!(
            runner.apply(command(CommandType::Open, "", "", None)).await,
            Err(LedgerError::Input(_))
        ));
        runner.apply(command(CommandType::Open, "alice", "", None)).await.unwrap();
        assert!(matches!(
            runner.apply(command(CommandType::Deposit, "alice", "", None)).await,
            Err(LedgerError::Input(_))
        ));
        assert!(matches!(
            runner
                .apply(command(CommandType::Transfer, "alice", "nobody", Some(dec!(1))))
                .await,
            Err(LedgerError::NoWalletForUser(_))
        ));
    }

    #[tokio::test]
    async fn test_schedule_tick_and_cancel() {
        let mut runner = runner();
        runner.apply(command(CommandType::Open, "alice", "", None)).await.unwrap();
        runner.apply(command(CommandType::Open, "bob", "", None)).await.unwrap();
        runner
            .apply(command(CommandType::Deposit, "alice", "", Some(dec!(100))))
            .await
            .unwrap();

        let start = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();
        let mut schedule = command(CommandType::Schedule, "alice", "bob", Some(dec!(30)));
        schedule.frequency = Some(Frequency::Monthly);
        schedule.at = Some(start);
        runner.apply(schedule).await.unwrap();

        let report = runner.tick(Some(start)).await.unwrap();
        assert_eq!(report.executed, 1);

        runner
            .apply(command(CommandType::Cancel, "alice", "bob", None))
            .await
            .unwrap();
        let report = runner
            .tick(Some(Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap()))
            .await
            .unwrap();
        assert_eq!(report.executed, 0);

        assert!(matches!(
            runner.apply(command(CommandType::Cancel, "alice", "bob", None)).await,
            Err(LedgerError::Input(_))
        ));
        let balances = runner.balances().await.unwrap();
        assert_eq!(balances[0].balance, dec!(70));
        assert_eq!(balances[1].balance, dec!(30));
    }
}
