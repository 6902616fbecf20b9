use crate::domain::wallet::{Amount, UserId, WalletId};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Datelike, Duration, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScheduleId(pub Uuid);

impl ScheduleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScheduleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// Computes the due date following `current`.
    ///
    /// Monthly schedules land on `anchor_day` of the next month, clamped to that month's last
    /// day. Clamping never shifts the anchor, so a schedule started on the 31st goes
    /// Jan 31, Feb 29, Mar 31, Apr 30. Returns `None` only when the result is out of the
    /// representable date range.
    pub fn advance(self, current: DateTime<Utc>, anchor_day: u32) -> Option<DateTime<Utc>> {
        match self {
            Frequency::Daily => current.checked_add_signed(Duration::days(1)),
            Frequency::Weekly => current.checked_add_signed(Duration::days(7)),
            Frequency::Monthly => {
                let first_of_next = current
                    .date_naive()
                    .with_day(1)?
                    .checked_add_months(Months::new(1))?;
                let last_day = first_of_next
                    .checked_add_months(Months::new(1))?
                    .pred_opt()?
                    .day();
                let date = first_of_next.with_day(anchor_day.clamp(1, last_day))?;
                Some(date.and_time(current.time()).and_utc())
            }
        }
    }
}

impl FromStr for Frequency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(LedgerError::Input(format!("unknown frequency '{other}'"))),
        }
    }
}

/// A standing instruction to pay `amount` from the owner's wallet to `receiver` at a fixed
/// cadence until cancelled.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ScheduledPayment {
    pub id: ScheduleId,
    pub owner: UserId,
    pub receiver: WalletId,
    pub amount: Amount,
    pub frequency: Frequency,
    pub next_due: DateTime<Utc>,
    /// Day of month the schedule started on.
    pub anchor_day: u32,
    pub created_at: DateTime<Utc>,
}

impl ScheduledPayment {
    pub fn new(
        owner: UserId,
        receiver: WalletId,
        amount: Decimal,
        frequency: Frequency,
        start: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            id: ScheduleId::new(),
            owner,
            receiver,
            amount: Amount::new(amount)?,
            frequency,
            next_due: start,
            anchor_day: start.day(),
            created_at: Utc::now(),
        })
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_due <= now
    }

    /// The due date after the current one.
    pub fn following_due(&self) -> Result<DateTime<Utc>> {
        self.frequency
            .advance(self.next_due, self.anchor_day)
            .ok_or_else(|| {
                LedgerError::Input(format!(
                    "schedule {} cannot advance past {}",
                    self.id, self.next_due
                ))
            })
    }
}
