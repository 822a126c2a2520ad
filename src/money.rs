//! Monetary value objects.
//!
//! Amounts are exact decimals (`rust_decimal`) paired with an ISO 4217
//! currency code. Arithmetic is only defined between amounts of the same
//! currency, so expected balances never drift through floating-point rounding.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised by money value objects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Currency code is not three ASCII letters.
    #[error("Invalid currency code: {0:?}")]
    InvalidCurrency(String),

    /// Amount could not be parsed as a decimal.
    #[error("Invalid amount {value:?}: {message}")]
    InvalidAmount { value: String, message: String },

    /// Arithmetic attempted between two currencies.
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        left: CurrencyCode,
        right: CurrencyCode,
    },

    /// Adjustments must move the balance.
    #[error("Adjustment amount must not be zero")]
    ZeroAdjustment,

    /// Decimal overflow during arithmetic.
    #[error("Arithmetic overflow")]
    Overflow,
}

/// An ISO 4217 currency code, normalized to upper case.
///
/// ```
/// use topup_reconciler::CurrencyCode;
///
/// let usd: CurrencyCode = " usd ".parse().unwrap();
/// assert_eq!(usd.as_str(), "USD");
/// assert!("US".parse::<CurrencyCode>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display symbol used by [`format_price`], if the currency has one.
    pub fn symbol(&self) -> Option<&'static str> {
        match self.0.as_str() {
            "USD" => Some("$"),
            "EUR" => Some("€"),
            "GBP" => Some("£"),
            "JPY" => Some("¥"),
            "INR" => Some("₹"),
            "AUD" => Some("A$"),
            "CAD" => Some("CA$"),
            _ => None,
        }
    }
}

impl FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(MoneyError::InvalidCurrency(s.to_string()));
        }
        Ok(CurrencyCode(trimmed.to_ascii_uppercase()))
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for CurrencyCode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CurrencyCode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CurrencyCode::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A monetary amount in a single currency.
///
/// The numeric part keeps whatever scale it was created with; equality on the
/// number is decimal equality, so `15.0` and `15.00` compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price {
    number: Decimal,
    currency: CurrencyCode,
}

impl Price {
    pub fn new(number: Decimal, currency: CurrencyCode) -> Self {
        Price { number, currency }
    }

    /// A zero amount in the given currency.
    pub fn zero(currency: CurrencyCode) -> Self {
        Price::new(Decimal::ZERO, currency)
    }

    /// Parses a decimal string into a price.
    pub fn parse(number: &str, currency: CurrencyCode) -> std::result::Result<Self, MoneyError> {
        let trimmed = number.trim();
        let number = Decimal::from_str(trimmed).map_err(|e| MoneyError::InvalidAmount {
            value: trimmed.to_string(),
            message: e.to_string(),
        })?;
        Ok(Price::new(number, currency))
    }

    pub fn number(&self) -> Decimal {
        self.number
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn is_positive(&self) -> bool {
        self.number > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.number < Decimal::ZERO
    }

    pub fn is_zero(&self) -> bool {
        self.number.is_zero()
    }

    pub fn abs(&self) -> Self {
        Price::new(self.number.abs(), self.currency.clone())
    }

    /// Adds two prices of the same currency.
    pub fn checked_add(&self, other: &Price) -> std::result::Result<Price, MoneyError> {
        self.ensure_same_currency(other)?;
        let number = self
            .number
            .checked_add(other.number)
            .ok_or(MoneyError::Overflow)?;
        Ok(Price::new(number, self.currency.clone()))
    }

    /// Subtracts a price of the same currency.
    pub fn checked_sub(&self, other: &Price) -> std::result::Result<Price, MoneyError> {
        self.ensure_same_currency(other)?;
        let number = self
            .number
            .checked_sub(other.number)
            .ok_or(MoneyError::Overflow)?;
        Ok(Price::new(number, self.currency.clone()))
    }

    fn ensure_same_currency(&self, other: &Price) -> std::result::Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.currency)
    }
}

/// Formats a price for humans: currency symbol, at least two fraction digits.
///
/// Extra precision is kept, trailing zeros past the second digit are not.
///
/// ```
/// use rust_decimal::Decimal;
/// use topup_reconciler::{format_price, Price};
///
/// let price = Price::new(Decimal::new(15, 0), "USD".parse().unwrap());
/// assert_eq!(format_price(&price), "$15.00");
/// ```
pub fn format_price(price: &Price) -> String {
    let mut number = price.number.abs().normalize();
    if number.scale() < 2 {
        number.rescale(2);
    }
    let sign = if price.is_negative() { "-" } else { "" };

    match price.currency.symbol() {
        Some(symbol) => format!("{}{}{}", sign, symbol, number),
        None => format!("{}{} {}", sign, price.currency, number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(s: &str) -> Price {
        Price::parse(s, "USD".parse().unwrap()).unwrap()
    }

    #[test]
    fn test_currency_code_normalizes_case() {
        let code = CurrencyCode::from_str("eur").unwrap();
        assert_eq!(code.as_str(), "EUR");
        assert_eq!(code.symbol(), Some("€"));
    }

    #[test]
    fn test_currency_code_rejects_garbage() {
        assert!(CurrencyCode::from_str("").is_err());
        assert!(CurrencyCode::from_str("US1").is_err());
        assert!(CurrencyCode::from_str("USDX").is_err());
    }

    #[test]
    fn test_addition_is_exact() {
        let sum = usd("0.1").checked_add(&usd("0.2")).unwrap();
        assert_eq!(sum, usd("0.3"));
    }

    #[test]
    fn test_equality_ignores_scale() {
        assert_eq!(usd("15.0"), usd("15.00"));
    }

    #[test]
    fn test_mixed_currency_arithmetic_fails() {
        let eur = Price::parse("1.00", "EUR".parse().unwrap()).unwrap();
        let err = usd("1.00").checked_add(&eur).unwrap_err();
        assert!(matches!(err, MoneyError::CurrencyMismatch { .. }));
        assert!(usd("1.00").checked_sub(&eur).is_err());
    }

    #[test]
    fn test_sign_inspection() {
        assert!(usd("5").is_positive());
        assert!(usd("-5").is_negative());
        assert!(usd("0.00").is_zero());
        assert_eq!(usd("-5.25").abs(), usd("5.25"));
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let err = Price::parse("ten", "USD".parse().unwrap()).unwrap_err();
        assert!(matches!(err, MoneyError::InvalidAmount { .. }));
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(&usd("10")), "$10.00");
        assert_eq!(format_price(&usd("10.5")), "$10.50");
        assert_eq!(format_price(&usd("10.1250")), "$10.125");
        assert_eq!(format_price(&usd("-3")), "-$3.00");

        let chf = Price::parse("7.1", "CHF".parse().unwrap()).unwrap();
        assert_eq!(format_price(&chf), "CHF 7.10");
    }
}
