//! The balance adjustment job.
//!
//! Applies an [`Adjustment`] to a developer's or company's prepaid balance
//! and reconciles the result:
//!
//! 1. resolve the balance controller for the account kind
//! 2. read the current balance (a missing currency counts as zero top-ups)
//! 3. compute `expected = existing top-ups + adjustment`
//! 4. call the remote top-up, keeping any failure for later
//! 5. classify: `info` when the returned amount equals the expected amount
//! 6. log the report, mail administrators when the call failed
//! 7. hand the original failure back to the caller
//!
//! A failed remote call is always reported before it is returned, so the
//! audit trail never depends on the call succeeding. A mismatch after a
//! successful call is only an `error` report, not an `Err`.

use crate::account::{AccountRef, Company, Developer};
use crate::adjustment::Adjustment;
use crate::config::TopUpConfig;
use crate::controller::{balance_for_currency, BalanceControllerFactory, RemoteError};
use crate::error::{JobError, Result};
use crate::money::{format_price, Price};
use crate::notify::{
    CacheInvalidator, JobLogger, MailParams, Mailer, DEFAULT_LANGCODE, LOG_TARGET,
    MAIL_KEY_DISCREPANCY_REPORT, MAIL_KEY_ERROR_REPORT, MAIL_MODULE,
};
use crate::report::{strip_markup, Outcome, ReconciliationReport};
use chrono::{DateTime, Utc};
use log::{debug, error, warn};

/// Services injected into a job execution.
pub struct JobServices<'a> {
    pub controllers: &'a mut dyn BalanceControllerFactory,
    pub logger: &'a dyn JobLogger,
    pub mailer: &'a dyn Mailer,
    pub cache: &'a dyn CacheInvalidator,
    pub config: &'a TopUpConfig,
}

/// Result of a reconciliation: the report, plus the top-up failure if the
/// remote call did not succeed.
#[derive(Debug)]
pub struct Reconciliation {
    pub report: ReconciliationReport,
    pub failure: Option<RemoteError>,
}

impl Reconciliation {
    /// Returns the report, or the original remote failure.
    pub fn into_result(self) -> Result<ReconciliationReport> {
        match self.failure {
            Some(failure) => Err(JobError::Remote(failure)),
            None => Ok(self.report),
        }
    }
}

/// Adjusts one account's prepaid balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceAdjustmentJob {
    account: AccountRef,
    adjustment: Adjustment,
}

impl BalanceAdjustmentJob {
    /// Jobs with this tag must run one at a time: concurrent adjustments to
    /// the same account race on the remote read-modify-write.
    pub const TAG: &'static str = "prepaid_balance_update_wait";

    /// Creates a job for exactly one of `developer` or `company`.
    pub fn new(
        developer: Option<Developer>,
        company: Option<Company>,
        adjustment: Adjustment,
    ) -> Result<Self> {
        let account = AccountRef::from_parts(developer, company)?;
        Ok(Self::for_account(account, adjustment))
    }

    pub fn for_account(account: AccountRef, adjustment: Adjustment) -> Self {
        BalanceAdjustmentJob {
            account,
            adjustment,
        }
    }

    pub fn account(&self) -> &AccountRef {
        &self.account
    }

    pub fn adjustment(&self) -> &Adjustment {
        &self.adjustment
    }

    pub fn tag(&self) -> &'static str {
        Self::TAG
    }

    /// Never retry: a failed call may still have been applied remotely.
    pub fn should_retry(&self, _error: &JobError) -> bool {
        false
    }

    /// Short human description, e.g. `Add $5.00 to dev@example.com`.
    pub fn describe(&self) -> String {
        let preposition = if self.adjustment.is_positive() {
            "to"
        } else {
            "from"
        };
        format!(
            "{} {} {} {}",
            self.adjustment.verb(),
            format_price(&self.adjustment.amount().abs()),
            preposition,
            self.account.label()
        )
    }

    /// Runs the job and returns the report or the original remote failure.
    pub fn execute(
        &self,
        services: &mut JobServices<'_>,
        now: DateTime<Utc>,
    ) -> Result<ReconciliationReport> {
        self.reconcile(services, now)?.into_result()
    }

    /// Runs the job, keeping the report even when the top-up call failed.
    ///
    /// `Err` is only returned for failures before the top-up call: reading
    /// the current balance or computing the expected balance.
    pub fn reconcile(
        &self,
        services: &mut JobServices<'_>,
        now: DateTime<Utc>,
    ) -> Result<Reconciliation> {
        let currency = self.adjustment.currency().clone();

        let (existing, expected, attempt) = {
            let mut controller = services.controllers.controller_for(&self.account);

            let balances = controller.prepaid_balance(now)?;
            let existing = balance_for_currency(&balances, &currency)
                .map(|balance| balance.top_ups_price())
                .unwrap_or_else(|| Price::zero(currency.clone()));

            let expected = existing.checked_add(self.adjustment.amount())?;

            debug!(
                target: LOG_TARGET,
                "{}: existing top ups {}, expecting {}",
                self.describe(),
                existing,
                expected
            );

            let attempt = controller.top_up_balance(self.adjustment.number(), &currency);
            (existing, expected, attempt)
        };

        let (receipt, failure) = match attempt {
            Ok(receipt) => {
                services.cache.invalidate_tags(&[self.account.cache_tag()]);
                (Some(receipt), None)
            }
            Err(e) => {
                error!(target: LOG_TARGET, "{}: top up failed: {}", self.describe(), e);
                (None, Some(e))
            }
        };

        let new_balance = receipt
            .as_ref()
            .and_then(|receipt| receipt.new_balance(&currency).ok());

        let outcome = match &receipt {
            Some(receipt) if receipt.amount == expected.number() => Outcome::Info,
            _ => Outcome::Error,
        };

        let report = ReconciliationReport::new(
            &self.account,
            existing,
            self.adjustment.amount().clone(),
            new_balance,
            expected,
            outcome,
            &now.format("%B").to_string(),
        );

        services
            .logger
            .log(outcome.level(), &report.template, &report.context);

        match &failure {
            Some(failure) if services.config.mail_on_error => {
                self.notify_admin(services, &report, MAIL_KEY_ERROR_REPORT, Some(failure));
            }
            None if outcome == Outcome::Error && services.config.mail_on_discrepancy => {
                self.notify_admin(services, &report, MAIL_KEY_DISCREPANCY_REPORT, None);
            }
            _ => {}
        }

        Ok(Reconciliation { report, failure })
    }

    fn notify_admin(
        &self,
        services: &JobServices<'_>,
        report: &ReconciliationReport,
        key: &str,
        failure: Option<&RemoteError>,
    ) {
        let Some(recipient) = services.config.error_recipient() else {
            warn!(
                target: LOG_TARGET,
                "{}: no recipient configured for {} mail",
                self.describe(),
                key
            );
            return;
        };

        let params = MailParams {
            report_text: strip_markup(&report.template),
            body: report.plain_text(),
            error: failure.map(|e| e.to_string()),
        };

        if let Err(e) =
            services
                .mailer
                .mail(MAIL_MODULE, key, recipient, DEFAULT_LANGCODE, &params)
        {
            warn!(target: LOG_TARGET, "{}: {}", self.describe(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(account: AccountRef, amount: &str) -> BalanceAdjustmentJob {
        BalanceAdjustmentJob::for_account(account, Adjustment::parse(amount, "USD").unwrap())
    }

    #[test]
    fn test_new_rejects_both_accounts() {
        let result = BalanceAdjustmentJob::new(
            Some(Developer::from_email("dev@example.com")),
            Some(Company::new("Acme")),
            Adjustment::parse("5", "USD").unwrap(),
        );
        assert!(matches!(result, Err(JobError::InvalidAccount(_))));
    }

    #[test]
    fn test_new_rejects_missing_account() {
        let result = BalanceAdjustmentJob::new(None, None, Adjustment::parse("5", "USD").unwrap());
        assert!(matches!(result, Err(JobError::InvalidAccount(_))));
    }

    #[test]
    fn test_describe() {
        let developer = AccountRef::Developer(Developer::from_email("dev@example.com"));
        assert_eq!(job(developer, "5").describe(), "Add $5.00 to dev@example.com");

        let company = AccountRef::Company(Company::new("Acme"));
        assert_eq!(job(company, "-12.5").describe(), "Subtract $12.50 from Acme");
    }

    #[test]
    fn test_never_retries() {
        let job = job(AccountRef::Company(Company::new("Acme")), "5");
        assert_eq!(job.tag(), "prepaid_balance_update_wait");
        assert!(!job.should_retry(&JobError::Remote(RemoteError::Transport(
            "timeout".to_string()
        ))));
    }
}
