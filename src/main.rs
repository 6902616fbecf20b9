use clap::Parser;
use fincore::config::Settings;
use fincore::domain::ports::{LedgerStoreRef, ScheduleStoreRef};
use fincore::infrastructure::in_memory::{InMemoryLedgerStore, InMemoryScheduleStore};
use fincore::interfaces::cli::CommandRunner;
use fincore::interfaces::csv::balance_writer::BalanceWriter;
use fincore::interfaces::csv::command_reader::CommandReader;
use fincore::telemetry;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JSON settings file (optional). Missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn stores(db_path: Option<PathBuf>) -> Result<(LedgerStoreRef, ScheduleStoreRef)> {
    #[cfg(feature = "storage-rocksdb")]
    {
        if let Some(db_path) = db_path {
            let store = fincore::infrastructure::rocksdb::RocksDBStore::open(db_path)
                .into_diagnostic()?;
            return Ok((Arc::new(store.clone()), Arc::new(store)));
        }
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    {
        if db_path.is_some() {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
        }
    }

    Ok((
        Arc::new(InMemoryLedgerStore::new()),
        Arc::new(InMemoryScheduleStore::new()),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();
    let cli = Cli::parse();

    let settings = match cli.config {
        Some(path) => Settings::load(path).into_diagnostic()?,
        None => Settings::default(),
    };
    let (ledger, schedules) = stores(cli.db_path)?;
    let mut runner = CommandRunner::new(ledger, schedules, &settings);

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for command in reader.commands() {
        match command {
            Ok(command) => {
                if let Err(e) = runner.apply(command).await {
                    if e.is_retryable() {
                        eprintln!("Error processing command (retryable): {}", e);
                    } else {
                        eprintln!("Error processing command: {}", e);
                    }
                }
            }
            Err(e) => {
                eprintln!("Error reading command: {}", e);
            }
        }
    }

    let balances = runner.balances().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = BalanceWriter::new(stdout.lock());
    writer.write_balances(balances).into_diagnostic()?;

    Ok(())
}
