//! Account and scan configuration

use crate::error::{Error, Result};
use crate::folder::Folder;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;

const DEFAULT_ACCOUNTS_PATH: &str = "accounts.json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONCURRENCY: usize = 4;

/// How the TLS layer is established for an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// TLS from the first byte (IMAPS, usually port 993).
    #[default]
    Tls,
    /// Plain TCP upgraded with the STARTTLS command (usually port 143).
    StartTls,
}

/// One mailbox to scan. Read-only to the scanner.
#[derive(Clone, Deserialize)]
pub struct Account {
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub security: Security,
    /// Skip certificate verification (self-signed local bridges).
    #[serde(default)]
    pub accept_invalid_certs: bool,
    pub login: String,
    pub password: String,
    /// Link shown next to each message; never contacted.
    pub webmail: String,
    #[serde(default)]
    pub folder: Folder,
}

const fn default_port() -> u16 {
    993
}

impl Account {
    /// The `host:port` pair this account connects to, as used in
    /// error messages.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("webmail", &self.webmail)
            .field("folder", &self.folder)
            .finish()
    }
}

/// Everything a scan needs: the shared secret, the accounts in the
/// order their mails are reported, and the scheduling limits.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub secret: String,
    pub accounts: Vec<Account>,
    /// Upper bound for each account's connect phase and, separately,
    /// its search-and-fetch phase.
    pub timeout: Duration,
    /// Maximum number of accounts processed at the same time.
    pub concurrency: usize,
}

impl ScanConfig {
    /// Build a configuration with the default timeout and concurrency.
    #[must_use]
    pub fn new(secret: impl Into<String>, accounts: Vec<Account>) -> Self {
        Self {
            secret: secret.into(),
            accounts,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the worker count. Zero is raised to one.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Load the configuration from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `MAILPEEK_SECRET`
    ///
    /// Optional (with defaults):
    /// - `MAILPEEK_ACCOUNTS` (default: `accounts.json`), a JSON array
    ///   of accounts
    /// - `MAILPEEK_TIMEOUT_SECS` (default: `30`)
    /// - `MAILPEEK_CONCURRENCY` (default: `4`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is missing or invalid,
    /// or if the accounts file cannot be read or parsed.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ScanConfig::from_env`] with an arbitrary variable
    /// source.
    ///
    /// # Errors
    ///
    /// See [`ScanConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("MAILPEEK_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Config("MAILPEEK_SECRET not set".into()))?;

        let accounts_path =
            lookup("MAILPEEK_ACCOUNTS").unwrap_or_else(|| DEFAULT_ACCOUNTS_PATH.to_string());
        let accounts = load_accounts(&accounts_path)?;

        let timeout_secs: u64 = lookup("MAILPEEK_TIMEOUT_SECS")
            .unwrap_or_else(|| DEFAULT_TIMEOUT_SECS.to_string())
            .parse()
            .map_err(|e| Error::Config(format!("Invalid MAILPEEK_TIMEOUT_SECS: {e}")))?;
        if timeout_secs == 0 {
            return Err(Error::Config(
                "MAILPEEK_TIMEOUT_SECS must be at least 1".into(),
            ));
        }

        let concurrency: usize = lookup("MAILPEEK_CONCURRENCY")
            .unwrap_or_else(|| DEFAULT_CONCURRENCY.to_string())
            .parse()
            .map_err(|e| Error::Config(format!("Invalid MAILPEEK_CONCURRENCY: {e}")))?;

        Ok(Self::new(secret, accounts)
            .with_timeout(Duration::from_secs(timeout_secs))
            .with_concurrency(concurrency))
    }
}

/// Read a JSON array of accounts from `path`.
///
/// # Errors
///
/// Returns [`Error::Config`] if the file cannot be read or is not a
/// valid accounts list.
pub fn load_accounts(path: impl AsRef<Path>) -> Result<Vec<Account>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Cannot read {}: {e}", path.display())))?;
    parse_accounts(&raw)
}

/// Parse a JSON array of accounts.
///
/// # Errors
///
/// Returns [`Error::Config`] on malformed JSON or missing fields.
pub fn parse_accounts(json: &str) -> Result<Vec<Account>> {
    serde_json::from_str(json).map_err(|e| Error::Config(format!("Invalid accounts list: {e}")))
}
