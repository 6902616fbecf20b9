use crate::domain::currency::Currency;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// Final state of one wallet, as printed by the CLI.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct BalanceRow {
    pub user: String,
    pub currency: Currency,
    pub balance: Decimal,
}

/// Writes wallet balances as CSV with a `user,currency,balance` header.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_balances(&mut self, rows: impl IntoIterator<Item = BalanceRow>) -> Result<()> {
        let mut wrote_any = false;
        for mut row in rows {
            row.balance = row.balance.normalize();
            self.writer.serialize(row)?;
            wrote_any = true;
        }
        if !wrote_any {
            self.writer.write_record(["user", "currency", "balance"])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
