use crate::application::transfer::TransferEngine;
use crate::domain::ports::{ClockRef, ScheduleStoreRef};
use crate::domain::schedule::{ScheduleId, ScheduledPayment};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// What happened to a single due schedule during a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Paid, and `next_due` moved forward.
    Advanced { next_due: DateTime<Utc> },
    /// Not paid for a reason the next tick may not have: missing funds or a missing wallet.
    Skipped(String),
    /// Not paid because of an unexpected error.
    Failed(String),
}

/// Summary of one scheduler pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub executed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<(ScheduleId, Outcome)>,
}

impl TickReport {
    fn record(&mut self, id: ScheduleId, outcome: Outcome) {
        match outcome {
            Outcome::Advanced { .. } => self.executed += 1,
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
        self.outcomes.push((id, outcome));
    }
}

/// Time-driven executor of recurring payments.
///
/// Each tick asks the schedule store for everything due at `clock.now()`, pays it through the
/// transfer engine and advances the schedule from its previous due date. A schedule is paid
/// at most once per tick, so one that is several periods behind catches up one period per
/// tick.
#[derive(Clone)]
pub struct PaymentScheduler {
    schedules: ScheduleStoreRef,
    engine: TransferEngine,
    clock: ClockRef,
}

impl PaymentScheduler {
    pub fn new(schedules: ScheduleStoreRef, engine: TransferEngine, clock: ClockRef) -> Self {
        Self {
            schedules,
            engine,
            clock,
        }
    }

    /// Runs one pass over the due schedules.
    ///
    /// Errors for one schedule are logged and counted; they never stop the rest of the pass.
    /// Only a failure to enumerate due schedules aborts the tick.
    pub async fn tick(&self) -> Result<TickReport> {
        let now = self.clock.now();
        let due = self.schedules.find_due(now).await?;
        debug!(%now, due = due.len(), "scheduler tick started");

        let mut report = TickReport::default();
        let mut handled = HashSet::new();
        for candidate in due {
            if !handled.insert(candidate.id) {
                continue;
            }

            // Re-read: the schedule may have been cancelled or advanced since enumeration.
            let schedule = match self.schedules.get_schedule(candidate.id).await {
                Ok(Some(schedule)) if schedule.is_due(now) => schedule,
                Ok(_) => continue,
                Err(err) => {
                    error!(schedule = %candidate.id, error = %err, "could not reload schedule");
                    report.record(candidate.id, Outcome::Failed(err.to_string()));
                    continue;
                }
            };

            let outcome = self.execute(&schedule).await;
            report.record(schedule.id, outcome);
        }

        info!(
            executed = report.executed,
            skipped = report.skipped,
            failed = report.failed,
            "scheduler tick finished"
        );
        Ok(report)
    }

    async fn execute(&self, schedule: &ScheduledPayment) -> Outcome {
        let sender = match self.engine.ledger().wallet_for_user(schedule.owner).await {
            Ok(Some(wallet)) => wallet,
            Ok(None) => {
                warn!(schedule = %schedule.id, owner = %schedule.owner, "owner has no wallet, skipping");
                return Outcome::Skipped(LedgerError::NoWalletForUser(schedule.owner).to_string());
            }
            Err(err) => {
                error!(schedule = %schedule.id, error = %err, "could not resolve sender wallet");
                return Outcome::Failed(err.to_string());
            }
        };

        let record = match self
            .engine
            .transfer(sender.id, schedule.receiver, schedule.amount.value())
            .await
        {
            Ok(record) => record,
            Err(err @ (LedgerError::InsufficientFunds { .. } | LedgerError::WalletNotFound(_))) => {
                warn!(schedule = %schedule.id, error = %err, "scheduled payment skipped, will retry");
                return Outcome::Skipped(err.to_string());
            }
            Err(err) => {
                error!(schedule = %schedule.id, error = %err, "scheduled payment failed");
                return Outcome::Failed(err.to_string());
            }
        };

        let next_due = match schedule.following_due() {
            Ok(next_due) => next_due,
            Err(err) => {
                error!(schedule = %schedule.id, tx = %record.id, error = %err, "paid but could not compute next due date");
                return Outcome::Failed(err.to_string());
            }
        };

        match self.schedules.advance_next_due(schedule.id, next_due).await {
            Ok(()) => {
                info!(
                    schedule = %schedule.id,
                    tx = %record.id,
                    amount = %schedule.amount.value(),
                    %next_due,
                    "scheduled payment executed"
                );
                Outcome::Advanced { next_due }
            }
            Err(LedgerError::ScheduleNotFound(_)) => {
                // Cancelled while the payment was in flight; the payment itself stands.
                info!(schedule = %schedule.id, tx = %record.id, "schedule cancelled during execution");
                Outcome::Advanced { next_due }
            }
            // The payment and the advance are separate writes. Here the payment landed but
            // `next_due` did not move, so the next tick pays this period again. `tx` is the
            // record to reverse if that happens.
            Err(err) => {
                error!(
                    schedule = %schedule.id,
                    tx = %record.id,
                    due = %schedule.next_due,
                    error = %err,
                    "paid but could not advance schedule; it stays due and will be paid again"
                );
                Outcome::Failed(format!("paid as {} but not advanced: {err}", record.id))
            }
        }
    }

    /// Runs [`Self::tick`] every `interval` on a background task until shut down.
    pub fn spawn(self, interval: Duration) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Shutdown is only observed between ticks, so a tick always finishes.
                        if let Err(err) = self.tick().await {
                            error!(error = %err, "scheduler tick aborted");
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("payment scheduler stopped");
        });

        SchedulerHandle {
            shutdown: shutdown_tx,
            join,
        }
    }
}

/// Handle to a running scheduler loop.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Requests shutdown and waits for the in-flight tick, if any, to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.join.await {
            error!(error = %err, "payment scheduler task ended abnormally");
        }
    }
}
