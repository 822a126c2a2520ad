//! Signed balance adjustments.

use crate::money::{CurrencyCode, MoneyError, Price};
use rust_decimal::Decimal;

/// A signed monetary delta to apply to a prepaid balance.
///
/// A positive amount is a top-up, a negative amount a decrease. Zero is
/// rejected at construction, and the value is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjustment {
    amount: Price,
}

impl Adjustment {
    pub fn new(amount: Price) -> Result<Self, MoneyError> {
        if amount.is_zero() {
            return Err(MoneyError::ZeroAdjustment);
        }
        Ok(Adjustment { amount })
    }

    /// Parses an amount string and currency code into an adjustment.
    pub fn parse(amount: &str, currency: &str) -> Result<Self, MoneyError> {
        let currency: CurrencyCode = currency.parse()?;
        Adjustment::new(Price::parse(amount, currency)?)
    }

    pub fn amount(&self) -> &Price {
        &self.amount
    }

    pub fn number(&self) -> Decimal {
        self.amount.number()
    }

    pub fn currency(&self) -> &CurrencyCode {
        self.amount.currency()
    }

    pub fn is_positive(&self) -> bool {
        self.amount.is_positive()
    }

    /// "Add" for an increase, "Subtract" for a decrease.
    pub fn verb(&self) -> &'static str {
        if self.is_positive() {
            "Add"
        } else {
            "Subtract"
        }
    }
}
