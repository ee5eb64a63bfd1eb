//! # Cashier CLI
//!
//! Operator harness over the cashier ledger.
//!
//! ## Usage
//! ```bash
//! cargo run -p tpv-db --bin cashier -- open
//! cargo run -p tpv-db --bin cashier -- deposit 50 "float top-up"
//! cargo run -p tpv-db --bin cashier -- withdrawal 20.50
//! cargo run -p tpv-db --bin cashier -- state
//! cargo run -p tpv-db --bin cashier -- close 10 0 "EOD"
//! cargo run -p tpv-db --bin cashier -- last
//!
//! # Specify database path (otherwise TPV_DB_PATH or ./tpv.db)
//! cargo run -p tpv-db --bin cashier -- --db ./data/tpv.db last
//! ```
//!
//! Results are printed as JSON on stdout; logs go to stderr. Exit code 1
//! means the request was rejected by a ledger rule, 2 means the database
//! failed, 64 means bad usage.

use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tpv_core::{CloseRequest, CoreError, Money};
use tpv_db::{ConfigError, Database, DbError, LedgerConfig, LedgerError};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Cannot render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Usage(_) | CliError::Config(_) => ExitCode::from(64),
            CliError::Ledger(e) if e.is_client_error() => ExitCode::from(1),
            _ => ExitCode::from(2),
        }
    }
}

/// Initializes the tracing subscriber for logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show all debug logs
/// - `RUST_LOG=tpv=trace` - Trace level for TPV crates
/// - Default: INFO level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tpv=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_usage() {
    println!("TPV Cashier");
    println!();
    println!("Usage: cashier [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("Commands:");
    println!("  open                                   Open a new cashier period");
    println!("  last                                   Show the latest period");
    println!("  state                                  Show totals of the open period");
    println!("  deposit <AMOUNT> [COMMENT]             Add cash to the drawer");
    println!("  withdrawal <AMOUNT> [COMMENT]          Take cash out of the drawer");
    println!("  close <FINAL_CARD> <FINAL_CASH> [COMMENT]  Close the open period");
    println!("  movements                              List deposits and withdrawals of the latest period");
    println!();
    println!("Options:");
    println!("  -d, --db <PATH>    Database file path (default: TPV_DB_PATH or ./tpv.db)");
    println!("  -h, --help         Show this help message");
}

fn amount_arg(args: &[String], index: usize, name: &str) -> Result<Money, CliError> {
    let raw = args
        .get(index)
        .ok_or_else(|| CliError::Usage(format!("missing <{name}>")))?;
    raw.parse::<Money>()
        .map_err(|e| LedgerError::from(CoreError::from(e)).into())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(args: &[String]) -> Result<(), CliError> {
    let mut db_path: Option<PathBuf> = None;
    let mut positional: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            _ => positional.push(args[i].clone()),
        }
        i += 1;
    }

    let Some(command) = positional.first().cloned() else {
        print_usage();
        return Err(CliError::Usage("missing command".to_string()));
    };

    let mut config = LedgerConfig::load()?;
    if let Some(path) = db_path {
        config.database_path = path;
    }

    let db = Database::new(config.db_config()).await?;
    let ledger = db.ledger();
    let comment = |index: usize| positional.get(index).map(String::as_str);

    match command.as_str() {
        "open" => print_json(&ledger.open().await?)?,
        "last" => print_json(&ledger.read_last().await?)?,
        "state" => print_json(&ledger.read_state().await?)?,
        "deposit" => {
            let amount = amount_arg(&positional, 1, "AMOUNT")?;
            print_json(&ledger.deposit(amount, comment(2)).await?)?;
        }
        "withdrawal" => {
            let amount = amount_arg(&positional, 1, "AMOUNT")?;
            print_json(&ledger.withdraw(amount, comment(2)).await?)?;
        }
        "close" => {
            let final_card = amount_arg(&positional, 1, "FINAL_CARD")?;
            let final_cash = amount_arg(&positional, 2, "FINAL_CASH")?;
            let request = CloseRequest::new(final_card, final_cash, comment(3));
            print_json(&ledger.close(&request).await?)?;
        }
        "movements" => {
            let last = ledger.read_last().await?;
            print_json(&db.closures().movements(&last.id).await?)?;
        }
        other => return Err(CliError::Usage(format!("unknown command '{other}'"))),
    }

    db.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}
