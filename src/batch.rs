//! Batch runner for balance adjustment jobs.
//!
//! Reads adjustment jobs from CSV and executes them one at a time, in file
//! order. Jobs share the `prepaid_balance_update_wait` tag, so running them
//! sequentially is what keeps two adjustments to the same account from racing.

use crate::error::{JobError, Result};
use crate::job::{BalanceAdjustmentJob, JobServices};
use crate::money::format_price;
use crate::record::AdjustmentRecord;
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use std::io::{Read, Write};

/// Outcome column for jobs whose top-up call failed.
pub const OUTCOME_FAILED: &str = "failed";

/// One executed job, as written to the results CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    /// CSV row the job came from (1-indexed, header is row 1)
    pub row: usize,
    pub account: String,
    pub adjustment: String,
    pub expected: String,
    pub new_balance: String,
    /// `info`, `error` or `failed`
    pub outcome: String,
}

/// Executes adjustment jobs against the injected services.
pub struct BatchRunner<'a> {
    services: JobServices<'a>,
    results: Vec<JobResult>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(services: JobServices<'a>) -> Self {
        BatchRunner {
            services,
            results: Vec::new(),
        }
    }

    /// Processes adjustment jobs from a CSV reader in streaming fashion.
    ///
    /// Invalid records are logged at warn level and skipped. Failed jobs are
    /// recorded and never retried.
    pub fn process_csv<R: Read>(&mut self, reader: R, now: DateTime<Utc>) -> Result<()> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        for (row_idx, result) in csv_reader.deserialize::<AdjustmentRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            let job = match result {
                Ok(record) => match record.parse() {
                    Ok(job) => job,
                    Err(message) => {
                        warn!("{}", JobError::InvalidRecord { row: row_num, message });
                        continue;
                    }
                },
                Err(e) => {
                    warn!("Row {}: CSV parse error: {}", row_num, e);
                    continue;
                }
            };

            self.run_job(&job, row_num, now);
        }

        Ok(())
    }

    /// Executes one job and records its result.
    pub fn run_job(&mut self, job: &BalanceAdjustmentJob, row: usize, now: DateTime<Utc>) {
        debug!("Row {}: {}", row, job.describe());

        let result = match job.reconcile(&mut self.services, now) {
            Ok(reconciliation) => {
                let report = &reconciliation.report;
                JobResult {
                    row,
                    account: report.recipient.clone(),
                    adjustment: format_price(&report.adjustment),
                    expected: format_price(&report.expected),
                    new_balance: report
                        .new_balance
                        .as_ref()
                        .map(format_price)
                        .unwrap_or_default(),
                    outcome: match reconciliation.into_result() {
                        Ok(report) => report.outcome.as_str().to_string(),
                        Err(e) => {
                            warn!(
                                "Row {}: {} failed (retry: {}): {}",
                                row,
                                job.describe(),
                                job.should_retry(&e),
                                e
                            );
                            OUTCOME_FAILED.to_string()
                        }
                    },
                }
            }
            Err(e) => {
                warn!("Row {}: {} failed before top up: {}", row, job.describe(), e);
                JobResult {
                    row,
                    account: job.account().label().to_string(),
                    adjustment: format_price(job.adjustment().amount()),
                    expected: String::new(),
                    new_balance: String::new(),
                    outcome: OUTCOME_FAILED.to_string(),
                }
            }
        };

        self.results.push(result);
    }

    pub fn results(&self) -> &[JobResult] {
        &self.results
    }

    /// Writes one CSV row per executed job, in execution order.
    pub fn write_output<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "row",
            "account",
            "adjustment",
            "expected",
            "new_balance",
            "outcome",
        ])?;

        for result in &self.results {
            csv_writer.write_record([
                result.row.to_string(),
                result.account.clone(),
                result.adjustment.clone(),
                result.expected.clone(),
                result.new_balance.clone(),
                result.outcome.clone(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopUpConfig;
    use crate::ledger::Ledger;
    use crate::notify::{LogCacheInvalidator, LogJobLogger, LogMailer};
    use std::io::Cursor;

    fn run(balances: &str, adjustments: &str) -> (Vec<JobResult>, Ledger) {
        let mut ledger = Ledger::new();
        ledger.load_csv(Cursor::new(balances)).unwrap();
        let config = TopUpConfig::default();

        let results = {
            let mut runner = BatchRunner::new(JobServices {
                controllers: &mut ledger,
                logger: &LogJobLogger,
                mailer: &LogMailer,
                cache: &LogCacheInvalidator,
                config: &config,
            });
            runner.process_csv(Cursor::new(adjustments), Utc::now()).unwrap();
            runner.results().to_vec()
        };
        (results, ledger)
    }

    #[test]
    fn test_top_up_matches_expected() {
        let (results, _) = run(
            "developer,company,currency,top_ups,usage\ndev@example.com,,USD,10.00,2.00",
            "developer,company,amount,currency\ndev@example.com,,5.00,USD",
        );

        assert_eq!(
            results,
            vec![JobResult {
                row: 2,
                account: "dev@example.com".to_string(),
                adjustment: "$5.00".to_string(),
                expected: "$15.00".to_string(),
                new_balance: "$13.00".to_string(),
                outcome: "info".to_string(),
            }]
        );
    }

    #[test]
    fn test_sequential_jobs_see_previous_adjustments() {
        let (results, ledger) = run(
            "developer,company,currency,top_ups,usage\n,Acme,EUR,1,0",
            "developer,company,amount,currency\n,Acme,2,EUR\n,Acme,3,EUR",
        );

        assert_eq!(results[0].expected, "€3.00");
        assert_eq!(results[1].expected, "€6.00");
        assert!(results.iter().all(|r| r.outcome == "info"));

        let acme = crate::AccountRef::Company(crate::Company::new("Acme"));
        let eur = "EUR".parse().unwrap();
        assert_eq!(ledger.balance(&acme, &eur).unwrap().top_ups.to_string(), "6");
    }

    #[test]
    fn test_rejected_top_up_is_failed() {
        let (results, _) = run(
            "developer,company,currency,top_ups,usage\ndev@example.com,,USD,1,0",
            "developer,company,amount,currency\ndev@example.com,,-5,USD",
        );

        assert_eq!(results[0].outcome, OUTCOME_FAILED);
        assert_eq!(results[0].new_balance, "");
        assert_eq!(results[0].expected, "-$4.00");
    }

    #[test]
    fn test_failure_before_top_up_leaves_new_balance_blank() {
        let (results, ledger) = run(
            concat!(
                "developer,company,currency,top_ups,usage\n",
                "dev@example.com,,USD,79228162514264337593543950335,0",
            ),
            "developer,company,amount,currency\ndev@example.com,,1,USD",
        );

        assert_eq!(results[0].outcome, OUTCOME_FAILED);
        assert_eq!(results[0].new_balance, "");
        assert_eq!(results[0].expected, "");

        let developer =
            crate::AccountRef::Developer(crate::Developer::from_email("dev@example.com"));
        let usd = "USD".parse().unwrap();
        assert_eq!(
            ledger.balance(&developer, &usd).unwrap().top_ups,
            rust_decimal::Decimal::MAX
        );
    }

    #[test]
    fn test_invalid_rows_are_skipped() {
        let (results, _) = run(
            "developer,company,currency,top_ups,usage",
            concat!(
                "developer,company,amount,currency\n",
                ",,5,USD\n",
                "dev@example.com,,0,USD\n",
                "dev@example.com,,1,USD",
            ),
        );

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].row, 4);
    }

    #[test]
    fn test_output_format() {
        let mut ledger = Ledger::new();
        let config = TopUpConfig::default();
        let mut runner = BatchRunner::new(JobServices {
            controllers: &mut ledger,
            logger: &LogJobLogger,
            mailer: &LogMailer,
            cache: &LogCacheInvalidator,
            config: &config,
        });
        runner
            .process_csv(
                Cursor::new("developer,company,amount,currency\ndev@example.com,,2.5,GBP"),
                Utc::now(),
            )
            .unwrap();

        let mut output = Vec::new();
        runner.write_output(&mut output).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.starts_with("row,account,adjustment,expected,new_balance,outcome"));
        assert!(output.contains("2,dev@example.com,£2.50,£2.50,£2.50,info"));
    }
}
