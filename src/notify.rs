//! Collaborators the reconciliation job reports through.
//!
//! The job never reaches for global services. Logging, mail and cache
//! invalidation are passed in as trait objects; the `Log*` implementations
//! route everything through the `log` facade and are what the CLI uses.

use crate::report::{render, ReportContext};
use log::{debug, info, Level};
use thiserror::Error;

/// Log target for reconciliation reports.
pub const LOG_TARGET: &str = "prepaid_top_up";

/// Module id used when sending mail.
pub const MAIL_MODULE: &str = "prepaid_top_up";

/// Mail key for failed top-up calls.
pub const MAIL_KEY_ERROR_REPORT: &str = "balance_adjustment_error_report";

/// Mail key for balance mismatches.
pub const MAIL_KEY_DISCREPANCY_REPORT: &str = "balance_adjustment_discrepancy_report";

/// Language code for administrator mail.
pub const DEFAULT_LANGCODE: &str = "und";

/// Mail delivery failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to send {key} mail to {recipient}: {message}")]
pub struct MailError {
    pub key: String,
    pub recipient: String,
    pub message: String,
}

/// Receives one structured report entry per job execution.
pub trait JobLogger {
    fn log(&self, level: Level, template: &str, context: &ReportContext);
}

/// Sends administrator mail.
pub trait Mailer {
    fn mail(
        &self,
        module: &str,
        key: &str,
        to: &str,
        langcode: &str,
        params: &MailParams,
    ) -> Result<(), MailError>;
}

/// Invalidates cached data tied to an account.
pub trait CacheInvalidator {
    fn invalidate_tags(&self, tags: &[String]);
}

/// Parameters for report mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailParams {
    /// Report template with display markup removed.
    pub report_text: String,
    /// Report with placeholders filled and markup removed.
    pub body: String,
    /// Error message of the failed call, if any.
    pub error: Option<String>,
}

/// Forwards reports to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogJobLogger;

impl JobLogger for LogJobLogger {
    fn log(&self, level: Level, template: &str, context: &ReportContext) {
        log::log!(target: LOG_TARGET, level, "{}", render(template, context));
    }
}

/// Records outgoing mail in the log instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn mail(
        &self,
        module: &str,
        key: &str,
        to: &str,
        langcode: &str,
        params: &MailParams,
    ) -> Result<(), MailError> {
        info!(
            target: LOG_TARGET,
            "Mail {}/{} to {} ({}):\n{}{}",
            module,
            key,
            to,
            langcode,
            params.body,
            params
                .error
                .as_deref()
                .map(|e| format!("\nError: {}", e))
                .unwrap_or_default()
        );
        Ok(())
    }
}

/// Logs invalidated cache tags.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCacheInvalidator;

impl CacheInvalidator for LogCacheInvalidator {
    fn invalidate_tags(&self, tags: &[String]) {
        debug!(target: LOG_TARGET, "Invalidating cache tags {:?}", tags);
    }
}
