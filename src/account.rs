//! Processing of a single account
//!
//! Connects, scans and disconnects one account. Whatever goes wrong is
//! turned into entries of the returned [`AccountReport`]; nothing here
//! returns an error to the caller.

use crate::config::Account;
use crate::connection;
use crate::report::AccountReport;
use crate::scanner;
use std::time::Duration;
use tracing::{info, warn};

/// The error recorded when an account cannot be reached in time.
///
/// `address` is the account's `server:port` pair rather than the bare
/// host, so two accounts on one host produce different messages. This
/// covers TCP, TLS, LOGIN and EXAMINE failures as well as a timeout in
/// either phase.
#[must_use]
pub fn connection_failed(address: &str) -> String {
    format!("Connection to {address} server failed")
}

/// Scan one account.
///
/// The connect phase and the scan phase are each bounded by `limit`.
/// Running out of time in either counts as a connection failure and
/// discards anything already collected for this account. The session
/// is logged out on every path once it was opened.
pub async fn process_account(account: &Account, limit: Duration) -> AccountReport {
    let address = account.address();

    let mut session = match connection::open(account, limit).await {
        Ok(session) => session,
        Err(e) => {
            warn!("Connection to {} failed: {}", address, e);
            return AccountReport::failed(connection_failed(&address));
        }
    };

    let scanned = tokio::time::timeout(limit, scanner::scan_unseen(&mut session, account)).await;
    connection::close(session).await;

    match scanned {
        Ok(Ok(report)) => {
            info!(
                "{}: {} unseen, {} header failures",
                address,
                report.mails.len(),
                report.errors.len()
            );
            report
        }
        Ok(Err(e)) => {
            warn!("Unseen search on {} failed: {}", address, e);
            AccountReport::failed(scanner::search_failed(&address))
        }
        Err(_) => {
            warn!("Scanning {} took longer than {:?}", address, limit);
            AccountReport::failed(connection_failed(&address))
        }
    }
}
