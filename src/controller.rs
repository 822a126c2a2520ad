//! Remote prepaid balance API seam.
//!
//! The monetization back-end is reached through two traits: a factory that
//! resolves a balance controller for an account, and the controller itself,
//! which reads balances and applies top-ups.

use crate::account::{AccountRef, Company, Developer, PrepaidBalance, TopUpReceipt};
use crate::money::CurrencyCode;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// Failure reported by the remote balance API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network or transport failure; the call may or may not have applied.
    #[error("transport error: {0}")]
    Transport(String),

    /// The API refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Balance operations for a single account.
pub trait PrepaidBalanceController {
    /// Returns the account's balances in every currency as of `as_of`.
    fn prepaid_balance(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<PrepaidBalance>, RemoteError>;

    /// Applies a signed top-up and returns the updated cumulative figures.
    fn top_up_balance(
        &mut self,
        amount: Decimal,
        currency: &CurrencyCode,
    ) -> Result<TopUpReceipt, RemoteError>;
}

/// Resolves balance controllers for developers and companies.
pub trait BalanceControllerFactory {
    fn developer_balance_controller<'a>(
        &'a mut self,
        developer: &Developer,
    ) -> Box<dyn PrepaidBalanceController + 'a>;

    fn company_balance_controller<'a>(
        &'a mut self,
        company: &Company,
    ) -> Box<dyn PrepaidBalanceController + 'a>;

    /// Picks the controller matching the account kind.
    fn controller_for<'a>(
        &'a mut self,
        account: &AccountRef,
    ) -> Box<dyn PrepaidBalanceController + 'a> {
        match account {
            AccountRef::Developer(developer) => self.developer_balance_controller(developer),
            AccountRef::Company(company) => self.company_balance_controller(company),
        }
    }
}

/// Finds the balance entry for `currency`, if the account has one.
pub fn balance_for_currency<'a>(
    balances: &'a [PrepaidBalance],
    currency: &CurrencyCode,
) -> Option<&'a PrepaidBalance> {
    balances.iter().find(|balance| &balance.currency == currency)
}
