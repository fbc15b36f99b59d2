//! Error types for mailpeek
//!
//! These stay inside the crate's per-account boundary: a scan never
//! returns them, it records a flat message in
//! [`ScanResult::errors`](crate::ScanResult) instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IMAP error: {0}")]
    Imap(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Timed out: {0}")]
    Timeout(String),
}

pub type Result<T> = std::result::Result<T, Error>;
