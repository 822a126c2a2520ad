//! Raw CSV records for balances and adjustment jobs.

use crate::account::{AccountRef, Company, Developer, PrepaidBalance};
use crate::adjustment::Adjustment;
use crate::job::BalanceAdjustmentJob;
use crate::money::CurrencyCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// Adjustment job as read from CSV.
///
/// Exactly one of `developer` (an email) and `company` (a team name) must be
/// set; the amount is signed.
#[derive(Debug, Deserialize)]
pub struct AdjustmentRecord {
    pub developer: Option<String>,
    pub company: Option<String>,
    pub amount: String,
    pub currency: String,
}

impl AdjustmentRecord {
    /// Builds the job described by this row.
    ///
    /// Returns a message describing the problem if the row is invalid.
    pub fn parse(&self) -> Result<BalanceAdjustmentJob, String> {
        let account = account_from(&self.developer, &self.company)?;
        let adjustment =
            Adjustment::parse(&self.amount, &self.currency).map_err(|e| e.to_string())?;
        Ok(BalanceAdjustmentJob::for_account(account, adjustment))
    }
}

/// Prepaid balance row as read from CSV.
#[derive(Debug, Deserialize)]
pub struct BalanceRecord {
    pub developer: Option<String>,
    pub company: Option<String>,
    pub currency: String,
    pub top_ups: String,
    pub usage: Option<String>,

    /// `true` marks the account's top-up endpoint as unreachable.
    #[serde(default)]
    pub offline: Option<String>,
}

/// A parsed balance row.
#[derive(Debug, Clone)]
pub struct ParsedBalance {
    pub account: AccountRef,
    pub balance: PrepaidBalance,
    pub offline: bool,
}

impl BalanceRecord {
    pub fn parse(&self) -> Result<ParsedBalance, String> {
        let account = account_from(&self.developer, &self.company)?;
        let currency = CurrencyCode::from_str(&self.currency).map_err(|e| e.to_string())?;
        let top_ups = parse_amount("top_ups", &self.top_ups)?;
        let usage = match non_empty(&self.usage) {
            Some(usage) => parse_amount("usage", usage)?,
            None => Decimal::ZERO,
        };
        let offline = match non_empty(&self.offline).map(str::to_ascii_lowercase) {
            None => false,
            Some(flag) if flag == "true" => true,
            Some(flag) if flag == "false" => false,
            Some(flag) => return Err(format!("invalid offline flag {:?}", flag)),
        };

        Ok(ParsedBalance {
            account,
            balance: PrepaidBalance::new(currency, top_ups, usage),
            offline,
        })
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Parses a cumulative amount, which is never negative.
fn parse_amount(name: &str, value: &str) -> Result<Decimal, String> {
    let amount = Decimal::from_str(value.trim())
        .map_err(|e| format!("invalid {} {:?}: {}", name, value, e))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(format!("negative {} {:?}", name, value));
    }
    Ok(amount)
}

fn account_from(
    developer: &Option<String>,
    company: &Option<String>,
) -> Result<AccountRef, String> {
    AccountRef::from_parts(
        non_empty(developer).map(Developer::from_email),
        non_empty(company).map(Company::new),
    )
    .map_err(|e| e.to_string())
}
