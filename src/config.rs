//! Reconciler configuration.
//!
//! Loaded from environment variables:
//!
//! - `TOP_UP_MAIL_ON_ERROR`: email administrators when a top-up call fails
//! - `TOP_UP_ERROR_RECIPIENT`: address for those emails
//! - `SITE_MAIL`: fallback recipient
//! - `SENDMAIL_FROM`: last-resort recipient
//! - `TOP_UP_MAIL_ON_DISCREPANCY`: also email when the new balance does not
//!   match the expected one

use std::env;
use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Mail settings for balance adjustment reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopUpConfig {
    pub mail_on_error: bool,
    pub error_recipient: Option<String>,
    pub site_mail: Option<String>,
    pub sendmail_from: Option<String>,
    pub mail_on_discrepancy: bool,
}

impl TopUpConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Ok(Self {
            mail_on_error: parse_flag("TOP_UP_MAIL_ON_ERROR", text("TOP_UP_MAIL_ON_ERROR"))?,
            error_recipient: text("TOP_UP_ERROR_RECIPIENT"),
            site_mail: text("SITE_MAIL"),
            sendmail_from: text("SENDMAIL_FROM"),
            mail_on_discrepancy: parse_flag(
                "TOP_UP_MAIL_ON_DISCREPANCY",
                text("TOP_UP_MAIL_ON_DISCREPANCY"),
            )?,
        })
    }

    /// Recipient for error reports: the configured address, then the site
    /// address, then the sendmail identity.
    pub fn error_recipient(&self) -> Option<&str> {
        self.error_recipient
            .as_deref()
            .or(self.site_mail.as_deref())
            .or(self.sendmail_from.as_deref())
    }
}

fn parse_flag(name: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(false);
    };

    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { name, value }),
    }
}
