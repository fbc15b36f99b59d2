//! Scan output types
//!
//! [`ScanResult`] serialises to the wire shape consumers expect:
//!
//! ```json
//! { "errors": ["..."],
//!   "mails": [{ "subject": "", "from": "", "to": "",
//!               "date": "DD/MM/YYYY HH:MM", "udate": 0, "webmail": "" }] }
//! ```

use serde::{Deserialize, Serialize};

/// The only error a rejected request carries.
pub const AUTHENTICATION_FAILED: &str = "Authentication Failed";

/// One unseen message, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailSummary {
    pub subject: String,
    pub from: String,
    pub to: String,
    /// `DD/MM/YYYY HH:MM` in the sender's own UTC offset.
    pub date: String,
    /// Arrival time on the server, Unix seconds.
    #[serde(rename = "udate")]
    pub arrival_timestamp: i64,
    #[serde(rename = "webmail")]
    pub webmail_url: String,
}

/// What a single account contributed: either mails and per-message
/// errors, or one error and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountReport {
    pub errors: Vec<String>,
    pub mails: Vec<MailSummary>,
}

impl AccountReport {
    /// A report for an account that produced no mails at all.
    #[must_use]
    pub fn failed(error: String) -> Self {
        Self {
            errors: vec![error],
            mails: Vec::new(),
        }
    }
}

/// The aggregated answer for one scan request.
///
/// `mails` keeps account order, then message order within each
/// account. It is never re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub errors: Vec<String>,
    pub mails: Vec<MailSummary>,
}

impl ScanResult {
    /// The fixed result for a request with a wrong or missing token.
    #[must_use]
    pub fn authentication_failed() -> Self {
        Self {
            errors: vec![AUTHENTICATION_FAILED.to_string()],
            mails: Vec::new(),
        }
    }

    /// Append one account's contribution after everything already
    /// collected.
    pub fn append(&mut self, report: AccountReport) {
        self.errors.extend(report.errors);
        self.mails.extend(report.mails);
    }

    /// Some accounts or messages failed while others produced mails.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty() && !self.mails.is_empty()
    }

    /// Serialise to the JSON wire shape.
    ///
    /// # Errors
    ///
    /// Only fails if serde_json itself fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
