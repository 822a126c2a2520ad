//! # Top-Up Reconciler
//!
//! Applies monetary adjustments to developer and company prepaid balances
//! held by a remote monetization API, then checks the result.
//!
//! ## Design Principles
//!
//! - **Exact arithmetic**: amounts are `rust_decimal` values; the expected
//!   balance is compared by decimal equality, never with a tolerance
//! - **Report, then fail**: a failed top-up call is logged (and mailed, if
//!   configured) before the original error is returned
//! - **Injected collaborators**: the remote API, logger, mailer, cache and
//!   configuration are passed in, never looked up globally
//! - **One account per job**: developer and company are variants of one enum
//!
//! ## Example
//!
//! ```no_run
//! use chrono::Utc;
//! use topup_reconciler::{
//!     AccountRef, Adjustment, BalanceAdjustmentJob, Developer, JobServices, Ledger,
//!     LogCacheInvalidator, LogJobLogger, LogMailer, TopUpConfig,
//! };
//!
//! let mut ledger = Ledger::new();
//! let config = TopUpConfig::from_env().unwrap();
//! let mut services = JobServices {
//!     controllers: &mut ledger,
//!     logger: &LogJobLogger,
//!     mailer: &LogMailer,
//!     cache: &LogCacheInvalidator,
//!     config: &config,
//! };
//!
//! let job = BalanceAdjustmentJob::for_account(
//!     AccountRef::Developer(Developer::from_email("dev@example.com")),
//!     Adjustment::parse("5.00", "USD").unwrap(),
//! );
//! let report = job.execute(&mut services, Utc::now()).unwrap();
//! println!("{}", report.plain_text());
//! ```

pub mod account;
pub mod adjustment;
pub mod batch;
pub mod config;
pub mod controller;
pub mod error;
pub mod job;
pub mod ledger;
pub mod money;
pub mod notify;
pub mod record;
pub mod report;

pub use account::{AccountKind, AccountRef, Company, Developer, PrepaidBalance, TopUpReceipt};
pub use adjustment::Adjustment;
pub use batch::{BatchRunner, JobResult};
pub use config::{ConfigError, TopUpConfig};
pub use controller::{BalanceControllerFactory, PrepaidBalanceController, RemoteError};
pub use error::{JobError, Result};
pub use job::{BalanceAdjustmentJob, JobServices, Reconciliation};
pub use ledger::Ledger;
pub use money::{format_price, CurrencyCode, MoneyError, Price};
pub use notify::{
    CacheInvalidator, JobLogger, LogCacheInvalidator, LogJobLogger, LogMailer, MailError,
    MailParams, Mailer,
};
pub use report::{Outcome, ReconciliationReport, ReportContext};
