//! In-memory prepaid balance ledger.
//!
//! Stands in for the remote monetization API: it serves balance snapshots and
//! applies top-ups through the [`BalanceControllerFactory`] seam, so jobs can
//! run end to end from CSV files.

use crate::account::{AccountRef, Company, Developer, PrepaidBalance, TopUpReceipt};
use crate::controller::{BalanceControllerFactory, PrepaidBalanceController, RemoteError};
use crate::error::Result;
use crate::money::CurrencyCode;
use crate::record::BalanceRecord;
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};

/// Balances keyed by account, then currency.
#[derive(Debug, Default)]
pub struct Ledger {
    balances: BTreeMap<AccountRef, BTreeMap<CurrencyCode, PrepaidBalance>>,

    /// Accounts whose top-up calls fail with a transport error.
    offline: BTreeSet<AccountRef>,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger::default()
    }

    /// Loads balances from CSV (`developer,company,currency,top_ups,usage[,offline]`).
    ///
    /// Invalid and duplicate rows are logged at warn level and skipped.
    pub fn load_csv<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        for (row_idx, result) in csv_reader.deserialize::<BalanceRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            let parsed = match result.map_err(|e| e.to_string()).and_then(|r| r.parse()) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Balances row {}: {}", row_num, e);
                    continue;
                }
            };

            if self.balance(&parsed.account, &parsed.balance.currency).is_some() {
                warn!(
                    "Balances row {}: duplicate {} balance for {}, ignoring",
                    row_num,
                    parsed.balance.currency,
                    parsed.account.label()
                );
                continue;
            }

            if parsed.offline {
                self.offline.insert(parsed.account.clone());
            }
            self.insert(parsed.account, parsed.balance);
        }

        Ok(())
    }

    /// Sets the balance for an account in the balance's currency.
    pub fn insert(&mut self, account: AccountRef, balance: PrepaidBalance) {
        self.balances
            .entry(account)
            .or_default()
            .insert(balance.currency.clone(), balance);
    }

    /// Marks an account's top-up endpoint as unreachable.
    pub fn set_offline(&mut self, account: AccountRef, offline: bool) {
        if offline {
            self.offline.insert(account);
        } else {
            self.offline.remove(&account);
        }
    }

    pub fn balance(
        &self,
        account: &AccountRef,
        currency: &CurrencyCode,
    ) -> Option<&PrepaidBalance> {
        self.balances.get(account)?.get(currency)
    }

    /// Writes all balances as CSV, ordered by account then currency.
    pub fn write_balances<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "developer",
            "company",
            "currency",
            "top_ups",
            "usage",
            "balance",
        ])?;

        for (account, balances) in &self.balances {
            let (developer, company) = match account {
                AccountRef::Developer(developer) => (developer.email.as_str(), ""),
                AccountRef::Company(company) => ("", company.name.as_str()),
            };
            for balance in balances.values() {
                let current = balance.current_balance()?;
                csv_writer.write_record([
                    developer.to_string(),
                    company.to_string(),
                    balance.currency.to_string(),
                    balance.top_ups.to_string(),
                    balance.usage.to_string(),
                    current.number().to_string(),
                ])?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    fn controller(&mut self, account: AccountRef) -> Box<dyn PrepaidBalanceController + '_> {
        Box::new(LedgerController {
            ledger: self,
            account,
        })
    }
}

impl BalanceControllerFactory for Ledger {
    fn developer_balance_controller<'a>(
        &'a mut self,
        developer: &Developer,
    ) -> Box<dyn PrepaidBalanceController + 'a> {
        self.controller(AccountRef::Developer(developer.clone()))
    }

    fn company_balance_controller<'a>(
        &'a mut self,
        company: &Company,
    ) -> Box<dyn PrepaidBalanceController + 'a> {
        self.controller(AccountRef::Company(company.clone()))
    }
}

/// Balance controller bound to one ledger account.
struct LedgerController<'a> {
    ledger: &'a mut Ledger,
    account: AccountRef,
}

impl PrepaidBalanceController for LedgerController<'_> {
    fn prepaid_balance(
        &self,
        as_of: DateTime<Utc>,
    ) -> std::result::Result<Vec<PrepaidBalance>, RemoteError> {
        debug!(
            "Reading balances for {} as of {}",
            self.account.label(),
            as_of.to_rfc3339()
        );
        Ok(self
            .ledger
            .balances
            .get(&self.account)
            .map(|balances| balances.values().cloned().collect())
            .unwrap_or_default())
    }

    fn top_up_balance(
        &mut self,
        amount: Decimal,
        currency: &CurrencyCode,
    ) -> std::result::Result<TopUpReceipt, RemoteError> {
        if self.ledger.offline.contains(&self.account) {
            return Err(RemoteError::Transport(format!(
                "balance service unreachable for {}",
                self.account.label()
            )));
        }

        let balance = self
            .ledger
            .balances
            .entry(self.account.clone())
            .or_default()
            .entry(currency.clone())
            .or_insert_with(|| PrepaidBalance::new(currency.clone(), Decimal::ZERO, Decimal::ZERO));

        let top_ups = balance
            .top_ups
            .checked_add(amount)
            .ok_or_else(|| RemoteError::Rejected("top up amount out of range".to_string()))?;
        if top_ups < Decimal::ZERO {
            return Err(RemoteError::Rejected(format!(
                "adjustment of {} {} would leave negative top ups",
                amount, currency
            )));
        }

        balance.top_ups = top_ups;
        Ok(TopUpReceipt::new(balance.top_ups, balance.usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;
    use crate::money::MoneyError;
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    fn usd() -> CurrencyCode {
        "USD".parse().unwrap()
    }

    fn developer() -> AccountRef {
        AccountRef::Developer(Developer::from_email("dev@example.com"))
    }

    fn load(csv: &str) -> Ledger {
        let mut ledger = Ledger::new();
        ledger.load_csv(Cursor::new(csv)).unwrap();
        ledger
    }

    #[test]
    fn test_load_skips_invalid_and_duplicate_rows() {
        let ledger = load(
            r#"developer,company,currency,top_ups,usage
dev@example.com,,USD,10.00,2.00
dev@example.com,,USD,99.00,0
,Acme,EUR,abc,0
dev@example.com,Acme,USD,1,0
,Acme,EUR,3,1"#,
        );

        let balance = ledger.balance(&developer(), &usd()).unwrap();
        assert_eq!(balance.top_ups, dec!(10.00));
        assert_eq!(balance.usage, dec!(2.00));

        let acme = AccountRef::Company(Company::new("Acme"));
        let eur: CurrencyCode = "EUR".parse().unwrap();
        assert_eq!(ledger.balance(&acme, &eur).unwrap().top_ups, dec!(3));
    }

    #[test]
    fn test_top_up_creates_missing_balance() {
        let mut ledger = Ledger::new();
        let receipt = ledger
            .controller_for(&developer())
            .top_up_balance(dec!(5.00), &usd())
            .unwrap();

        assert_eq!(receipt, TopUpReceipt::new(dec!(5.00), dec!(0)));
        assert_eq!(ledger.balance(&developer(), &usd()).unwrap().top_ups, dec!(5.00));
    }

    #[test]
    fn test_top_up_rejects_negative_total() {
        let mut ledger = Ledger::new();
        ledger.insert(developer(), PrepaidBalance::new(usd(), dec!(3), dec!(0)));

        let err = ledger
            .controller_for(&developer())
            .top_up_balance(dec!(-4), &usd())
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected(_)));
        assert_eq!(ledger.balance(&developer(), &usd()).unwrap().top_ups, dec!(3));
    }

    #[test]
    fn test_offline_account_fails_top_up_but_serves_reads() {
        let mut ledger = load(
            r#"developer,company,currency,top_ups,usage,offline
dev@example.com,,USD,10,0,true"#,
        );

        let mut controller = ledger.controller_for(&developer());
        assert_eq!(controller.prepaid_balance(Utc::now()).unwrap().len(), 1);
        assert!(matches!(
            controller.top_up_balance(dec!(1), &usd()),
            Err(RemoteError::Transport(_))
        ));
        drop(controller);

        ledger.set_offline(developer(), false);
        assert!(ledger
            .controller_for(&developer())
            .top_up_balance(dec!(1), &usd())
            .is_ok());
    }

    #[test]
    fn test_write_balances_is_sorted() {
        let ledger = load(
            r#"developer,company,currency,top_ups,usage
zed@example.com,,USD,1,0
,Acme,USD,4,1
amy@example.com,,EUR,2,0.5"#,
        );

        let mut output = Vec::new();
        ledger.write_balances(&mut output).unwrap();
        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "developer,company,currency,top_ups,usage,balance");
        assert_eq!(lines[1], "amy@example.com,,EUR,2,0.5,1.5");
        assert_eq!(lines[2], "zed@example.com,,USD,1,0,1");
        assert_eq!(lines[3], ",Acme,USD,4,1,3");
    }

    #[test]
    fn test_write_balances_reports_overflow() {
        let mut ledger = Ledger::new();
        ledger.insert(
            developer(),
            PrepaidBalance::new(usd(), Decimal::MAX, dec!(-1)),
        );

        let mut output = Vec::new();
        let err = ledger.write_balances(&mut output).unwrap_err();
        assert!(matches!(err, JobError::Money(MoneyError::Overflow)));
    }
}
