//! Top-Up Reconciler CLI
//!
//! Loads prepaid balances into an in-memory ledger, runs one balance
//! adjustment job per row of the adjustments file, and prints job results
//! as CSV.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- balances.csv adjustments.csv [final_balances.csv] > results.csv
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `info` to see reconciliation reports, `debug` for more
//! - `TOP_UP_MAIL_ON_ERROR`, `TOP_UP_ERROR_RECIPIENT`, `SITE_MAIL`,
//!   `SENDMAIL_FROM`, `TOP_UP_MAIL_ON_DISCREPANCY`: administrator mail settings

use chrono::Utc;
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;
use topup_reconciler::{
    BatchRunner, JobError, JobServices, Ledger, LogCacheInvalidator, LogJobLogger, LogMailer,
    Result, TopUpConfig,
};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        return Err(JobError::MissingArgument);
    }

    let config = TopUpConfig::from_env()?;

    let mut ledger = Ledger::new();
    ledger.load_csv(BufReader::new(File::open(&args[1])?))?;

    let adjustments = BufReader::new(File::open(&args[2])?);

    let mut runner = BatchRunner::new(JobServices {
        controllers: &mut ledger,
        logger: &LogJobLogger,
        mailer: &LogMailer,
        cache: &LogCacheInvalidator,
        config: &config,
    });
    runner.process_csv(adjustments, Utc::now())?;

    let stdout = io::stdout();
    let handle = stdout.lock();
    runner.write_output(handle)?;
    drop(runner);

    if let Some(path) = args.get(3) {
        ledger.write_balances(File::create(path)?)?;
    }

    Ok(())
}
