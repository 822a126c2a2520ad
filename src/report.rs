//! Reconciliation report formatting.
//!
//! Reports are `{placeholder}` templates filled from a [`ReportContext`].
//! Each line carries a `<br />` marker for HTML log viewers; mail bodies use
//! [`strip_markup`] to drop it.

use crate::account::{AccountKind, AccountRef};
use crate::money::{format_price, Price};
use log::Level;

/// Display-only line marker in report templates.
pub const LINE_BREAK_MARKUP: &str = "<br />";

/// Shown in place of the new balance when the top-up call failed.
pub const NEW_BALANCE_UNAVAILABLE: &str = "Error retrieving the new balance.";

/// Result classification of a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The remote balance matches the expected balance.
    Info,
    /// The call failed or the balances disagree.
    Error,
}

impl Outcome {
    pub fn level(&self) -> Level {
        match self {
            Outcome::Info => Level::Info,
            Outcome::Error => Level::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Info => "info",
            Outcome::Error => "error",
        }
    }
}

/// Placeholder values for report templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportContext {
    pub email: String,
    pub team_name: String,
    pub existing: String,
    pub adjustment: String,
    pub new_balance: String,
    pub expected_balance: String,
    pub month: String,
}

impl ReportContext {
    /// Placeholder names paired with their values.
    pub fn entries(&self) -> [(&'static str, &str); 7] {
        [
            ("email", self.email.as_str()),
            ("team_name", self.team_name.as_str()),
            ("existing", self.existing.as_str()),
            ("adjustment", self.adjustment.as_str()),
            ("new_balance", self.new_balance.as_str()),
            ("expected_balance", self.expected_balance.as_str()),
            ("month", self.month.as_str()),
        ]
    }
}

/// Report template for an account kind and outcome: header then body.
pub fn report_template(kind: AccountKind, outcome: Outcome) -> String {
    let header = match (kind, outcome) {
        (AccountKind::Developer, Outcome::Error) => {
            "Calculation discrepancy applying adjustment to developer `{email}`. <br />\n\n"
        }
        (AccountKind::Developer, Outcome::Info) => {
            "Adjustment applied to developer: `{email}`. <br />\n\n"
        }
        (AccountKind::Company, Outcome::Error) => {
            "Calculation discrepancy applying adjustment to team `{team_name}`. <br />\n\n"
        }
        (AccountKind::Company, Outcome::Info) => {
            "Adjustment applied to team: `{team_name}`. <br />\n\n"
        }
    };

    let body = concat!(
        "Existing top up ({month}):  `{existing}`.<br />\n",
        "Amount Applied:             `{adjustment}`.<br />\n",
        "New Balance:                `{new_balance}`.<br />\n",
        "Expected New Balance:       `{expected_balance}`.<br />\n",
    );

    format!("{}{}", header, body)
}

/// Fills `{name}` placeholders in a single pass over the template.
///
/// Substituted values are copied through as they are, so a value containing
/// `{month}` stays literal. Unknown placeholders are left as they are.
pub fn render(template: &str, context: &ReportContext) -> String {
    let entries = context.entries();
    let mut text = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        text.push_str(&rest[..open]);
        let token = &rest[open..];

        let value = token.find('}').and_then(|close| {
            let name = &token[1..close];
            entries
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });

        match value {
            Some((value, close)) => {
                text.push_str(value);
                rest = &token[close + 1..];
            }
            None => {
                text.push('{');
                rest = &token[1..];
            }
        }
    }

    text.push_str(rest);
    text
}

/// Removes display-only line markers.
pub fn strip_markup(text: &str) -> String {
    text.replace(LINE_BREAK_MARKUP, "")
}

/// Outcome of one balance adjustment, ready to log or mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub recipient: String,
    pub existing: Price,
    pub adjustment: Price,
    /// `None` when the top-up call failed.
    pub new_balance: Option<Price>,
    pub expected: Price,
    pub outcome: Outcome,
    pub template: String,
    pub context: ReportContext,
}

impl ReconciliationReport {
    pub fn new(
        account: &AccountRef,
        existing: Price,
        adjustment: Price,
        new_balance: Option<Price>,
        expected: Price,
        outcome: Outcome,
        month: &str,
    ) -> Self {
        let (email, team_name) = match account {
            AccountRef::Developer(developer) => (developer.email.clone(), String::new()),
            AccountRef::Company(company) => (String::new(), company.name.clone()),
        };

        let context = ReportContext {
            email,
            team_name,
            existing: format_price(&existing),
            adjustment: format_price(&adjustment),
            new_balance: new_balance
                .as_ref()
                .map(format_price)
                .unwrap_or_else(|| NEW_BALANCE_UNAVAILABLE.to_string()),
            expected_balance: format_price(&expected),
            month: month.to_string(),
        };

        ReconciliationReport {
            recipient: account.label().to_string(),
            existing,
            adjustment,
            new_balance,
            expected,
            outcome,
            template: report_template(account.kind(), outcome),
            context,
        }
    }

    /// Rendered report including display markup.
    pub fn text(&self) -> String {
        render(&self.template, &self.context)
    }

    /// Rendered report without display markup.
    pub fn plain_text(&self) -> String {
        strip_markup(&self.text())
    }
}
