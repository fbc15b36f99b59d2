//! Multi-account unseen scan

use crate::account::process_account;
use crate::auth::{AuthGate, Verdict};
use crate::config::ScanConfig;
use crate::report::{AccountReport, ScanResult};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

/// Read-only unseen-mail aggregator over a fixed set of accounts
pub struct MailPeek {
    config: ScanConfig,
}

impl MailPeek {
    #[must_use]
    pub const fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Check `token`, then scan every configured account.
    ///
    /// A rejected token yields [`ScanResult::authentication_failed`]
    /// without contacting any server. Otherwise up to
    /// `config.concurrency` accounts are processed at once, and their
    /// reports are merged in configuration order regardless of which
    /// finished first. Failures of individual accounts or messages end
    /// up in `errors`; they never stop the scan.
    pub async fn scan(&self, token: Option<&str>) -> ScanResult {
        if AuthGate::new(&self.config.secret).check(token) == Verdict::Deny {
            warn!("Rejected scan request with invalid token");
            return ScanResult::authentication_failed();
        }

        let limit = self.config.timeout;
        let reports: Vec<AccountReport> = stream::iter(&self.config.accounts)
            .map(|account| process_account(account, limit))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut result = ScanResult::default();
        for report in reports {
            result.append(report);
        }

        info!(
            "Scanned {} accounts: {} unseen, {} errors",
            self.config.accounts.len(),
            result.mails.len(),
            result.errors.len()
        );
        result
    }
}
