//! Error types for the top-up reconciler.

use crate::config::ConfigError;
use crate::controller::RemoteError;
use crate::money::MoneyError;
use thiserror::Error;

/// Command line usage, shown when an input file argument is missing.
pub const USAGE: &str = "topup-reconciler <balances.csv> <adjustments.csv> [final_balances.csv]";

/// Result type alias for reconciler operations
pub type Result<T> = std::result::Result<T, JobError>;

/// Errors that can occur while building or running balance adjustment jobs.
#[derive(Error, Debug)]
pub enum JobError {
    /// Failed to open or read an input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// A job must target exactly one developer or company
    #[error("Invalid account for balance adjustment: {0}")]
    InvalidAccount(&'static str),

    /// Invalid amount or currency
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// The remote balance API failed; re-raised after reporting
    #[error("Remote balance API error: {0}")]
    Remote(#[from] RemoteError),

    /// Invalid environment configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid input record
    #[error("Invalid record at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },

    /// Missing input file argument
    #[error("Missing input file argument. Usage: {}", USAGE)]
    MissingArgument,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_argument_shows_usage() {
        assert_eq!(
            JobError::MissingArgument.to_string(),
            format!("Missing input file argument. Usage: {}", USAGE)
        );
        assert!(USAGE.starts_with("topup-reconciler <balances.csv>"));
    }
}
