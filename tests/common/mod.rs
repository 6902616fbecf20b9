#![allow(dead_code)]

use fincore::application::notify::Notifier;
use fincore::application::transfer::TransferEngine;
use fincore::domain::currency::{Currency, CurrencyConverter};
use fincore::domain::ports::LedgerStoreRef;
use fincore::domain::wallet::{UserId, WalletId};
use fincore::infrastructure::in_memory::{InMemoryDirectory, InMemoryLedgerStore};
use fincore::infrastructure::notification::TracingNotificationSink;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;

pub fn engine() -> (TransferEngine, LedgerStoreRef) {
    let ledger: LedgerStoreRef = Arc::new(InMemoryLedgerStore::new());
    let notifier = Notifier::new(
        Arc::new(InMemoryDirectory::new()),
        Arc::new(TracingNotificationSink),
    );
    let engine = TransferEngine::new(ledger.clone(), CurrencyConverter::default(), notifier);
    (engine, ledger)
}

/// Opens a wallet for a fresh user and funds it when `initial` is positive.
pub async fn funded_wallet(
    engine: &TransferEngine,
    currency: Currency,
    initial: Decimal,
) -> (UserId, WalletId) {
    let owner = UserId::new();
    let wallet = engine.ledger().open_wallet(owner, currency).await.unwrap();
    if initial > Decimal::ZERO {
        engine.deposit(wallet.id, initial).await.unwrap();
    }
    (owner, wallet.id)
}

/// Writes a command file that opens `users` NGN wallets, funds each with 100 and then
/// passes 1 around the ring `rounds` times.
pub fn generate_commands_csv(path: &Path, users: usize, rounds: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["type", "user", "counterparty", "amount", "currency", "frequency", "at"])?;

    for i in 0..users {
        let user = format!("user{i:04}");
        wtr.write_record(["open", &user, "", "", "NGN", "", ""])?;
        wtr.write_record(["deposit", &user, "", "100", "", "", ""])?;
    }
    for _ in 0..rounds {
        for i in 0..users {
            let from = format!("user{i:04}");
            let to = format!("user{:04}", (i + 1) % users);
            wtr.write_record(["transfer", &from, &to, "1", "", "", ""])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
