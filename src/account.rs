//! Account references and prepaid balance snapshots.
//!
//! A balance adjustment targets exactly one account: either a developer or a
//! company (team). The two kinds are a tagged variant so that a job can never
//! hold both, or neither.

use crate::error::{JobError, Result};
use crate::money::{CurrencyCode, MoneyError, Price};
use rust_decimal::Decimal;

/// Prefix for cache tags tied to an account's billing data.
pub const CACHE_TAG_PREFIX: &str = "prepaid_balance";

/// A developer account, identified remotely by its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Developer {
    pub id: String,
    pub email: String,
}

impl Developer {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Developer {
            id: id.into(),
            email: email.into(),
        }
    }

    /// Developer whose remote id is its email address.
    pub fn from_email(email: impl Into<String>) -> Self {
        let email = email.into();
        Developer {
            id: email.clone(),
            email,
        }
    }
}

/// A company (team) account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Company {
    pub name: String,
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        Company { name: name.into() }
    }
}

/// The account whose prepaid balance is adjusted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccountRef {
    Developer(Developer),
    Company(Company),
}

/// Discriminant of [`AccountRef`], used to pick report phrasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Developer,
    Company,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Developer => "developer",
            AccountKind::Company => "company",
        }
    }
}

impl AccountRef {
    /// Builds an account reference from two optional parts.
    ///
    /// Exactly one of `developer` and `company` must be given; anything else
    /// is a configuration error.
    pub fn from_parts(developer: Option<Developer>, company: Option<Company>) -> Result<Self> {
        match (developer, company) {
            (Some(developer), None) => Ok(AccountRef::Developer(developer)),
            (None, Some(company)) => Ok(AccountRef::Company(company)),
            (Some(_), Some(_)) => Err(JobError::InvalidAccount(
                "both a developer and a company were supplied",
            )),
            (None, None) => Err(JobError::InvalidAccount(
                "neither a developer nor a company was supplied",
            )),
        }
    }

    pub fn kind(&self) -> AccountKind {
        match self {
            AccountRef::Developer(_) => AccountKind::Developer,
            AccountRef::Company(_) => AccountKind::Company,
        }
    }

    /// Developer email or company name.
    pub fn label(&self) -> &str {
        match self {
            AccountRef::Developer(developer) => &developer.email,
            AccountRef::Company(company) => &company.name,
        }
    }

    /// Cache tag invalidated after the account's balance changes.
    pub fn cache_tag(&self) -> String {
        let key = match self {
            AccountRef::Developer(developer) => developer.id.as_str(),
            AccountRef::Company(company) => company.name.as_str(),
        };
        format!("{}:{}:{}", CACHE_TAG_PREFIX, self.kind().as_str(), key)
    }
}

/// Snapshot of an account's prepaid balance in one currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepaidBalance {
    pub currency: CurrencyCode,

    /// Cumulative top-ups to date.
    pub top_ups: Decimal,

    /// Cumulative usage to date.
    pub usage: Decimal,
}

impl PrepaidBalance {
    pub fn new(currency: CurrencyCode, top_ups: Decimal, usage: Decimal) -> Self {
        PrepaidBalance {
            currency,
            top_ups,
            usage,
        }
    }

    /// Cumulative top-ups as a price.
    pub fn top_ups_price(&self) -> Price {
        Price::new(self.top_ups, self.currency.clone())
    }

    /// Remaining usable credit: `top_ups - usage`.
    pub fn current_balance(&self) -> std::result::Result<Price, MoneyError> {
        let usage = Price::new(self.usage, self.currency.clone());
        self.top_ups_price().checked_sub(&usage)
    }
}

/// The remote system's reply to a top-up call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopUpReceipt {
    /// Cumulative top-ups after the call.
    pub amount: Decimal,

    /// Cumulative usage at the time of the call.
    pub usage: Decimal,
}

impl TopUpReceipt {
    pub fn new(amount: Decimal, usage: Decimal) -> Self {
        TopUpReceipt { amount, usage }
    }

    /// Balance left after the top-up, in the given currency.
    pub fn new_balance(&self, currency: &CurrencyCode) -> std::result::Result<Price, MoneyError> {
        let balance = self
            .amount
            .checked_sub(self.usage)
            .ok_or(MoneyError::Overflow)?;
        Ok(Price::new(balance, currency.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_parts_accepts_exactly_one() {
        let developer = AccountRef::from_parts(Some(Developer::from_email("a@b.c")), None).unwrap();
        assert_eq!(developer.kind(), AccountKind::Developer);
        assert_eq!(developer.label(), "a@b.c");

        let company = AccountRef::from_parts(None, Some(Company::new("Acme"))).unwrap();
        assert_eq!(company.kind(), AccountKind::Company);
        assert_eq!(company.label(), "Acme");
    }

    #[test]
    fn test_from_parts_rejects_both_and_neither() {
        let both = AccountRef::from_parts(
            Some(Developer::from_email("a@b.c")),
            Some(Company::new("Acme")),
        );
        assert!(matches!(both, Err(JobError::InvalidAccount(_))));

        let neither = AccountRef::from_parts(None, None);
        assert!(matches!(neither, Err(JobError::InvalidAccount(_))));
    }

    #[test]
    fn test_cache_tag_is_scoped_to_account() {
        let developer = AccountRef::Developer(Developer::new("dev-42", "a@b.c"));
        assert_eq!(developer.cache_tag(), "prepaid_balance:developer:dev-42");

        let company = AccountRef::Company(Company::new("Acme"));
        assert_eq!(company.cache_tag(), "prepaid_balance:company:Acme");
    }

    #[test]
    fn test_current_balance_is_top_ups_minus_usage() {
        let balance = PrepaidBalance::new("USD".parse().unwrap(), dec!(10.00), dec!(2.50));
        assert_eq!(balance.current_balance().unwrap().number(), dec!(7.50));
    }

    #[test]
    fn test_receipt_new_balance() {
        let receipt = TopUpReceipt::new(dec!(15.00), dec!(2.00));
        let balance = receipt.new_balance(&"USD".parse().unwrap()).unwrap();
        assert_eq!(balance.number(), dec!(13.00));
    }
}
