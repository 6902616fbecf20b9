use crate::domain::currency::Currency;
use crate::domain::schedule::Frequency;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Open,
    Deposit,
    Withdraw,
    Transfer,
    Schedule,
    Cancel,
    Tick,
}

/// One row of a command file: `type, user, counterparty, amount, currency, frequency, at`.
///
/// Columns a command does not use are left empty.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct LedgerCommand {
    pub r#type: CommandType,
    pub user: Option<String>,
    pub counterparty: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
    pub frequency: Option<Frequency>,
    pub at: Option<DateTime<Utc>>,
}

/// Reads ledger commands from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths, and yields rows
/// lazily so large files stream.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn commands(self) -> impl Iterator<Item = Result<LedgerCommand>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LedgerError::from))
    }
}
