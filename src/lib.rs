//! Unseen mail across several IMAP accounts
//!
//! Given a fixed list of accounts and a shared secret, [`MailPeek`]
//! answers one question: which unread messages exist right now, and
//! which mailboxes could not be reached? Every account gets a fresh,
//! read-only session (EXAMINE plus ENVELOPE fetches, so nothing is
//! marked as seen), and the results are merged into a single
//! [`ScanResult`] in account order.
//!
//! Failures never abort a scan. An unreachable account or an unreadable
//! message becomes a string in [`ScanResult::errors`] while the other
//! accounts and messages are still reported.

mod account;
mod address;
mod auth;
mod client;
mod config;
mod connection;
mod error;
mod folder;
mod report;
mod scanner;

pub use account::process_account;
pub use address::{Address, decode_mime_words, summarize_from, summarize_to};
pub use auth::{AuthGate, Verdict};
pub use client::MailPeek;
pub use config::{Account, ScanConfig, Security, load_accounts, parse_accounts};
pub use error::{Error, Result};
pub use folder::Folder;
pub use report::{AUTHENTICATION_FAILED, AccountReport, MailSummary, ScanResult};
pub use scanner::{MessageHeader, format_date};
