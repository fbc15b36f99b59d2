//! Unseen message listing and header extraction
//!
//! Everything here runs on a session whose folder was opened with
//! EXAMINE, and only ENVELOPE and INTERNALDATE are fetched, so a scan
//! never changes a message's flags.

use crate::address::{Address, decode_mime_words, summarize_from, summarize_to};
use crate::config::Account;
use crate::connection::ImapSession;
use crate::error::{Error, Result};
use crate::report::{AccountReport, MailSummary};
use async_imap::types::Fetch;
use chrono::{DateTime, FixedOffset, Utc};
use futures::StreamExt;
use tracing::{debug, info, warn};

const DATE_FORMAT: &str = "%d/%m/%Y %H:%M";
const HEADER_ITEMS: &str = "(UID ENVELOPE INTERNALDATE)";

/// Header metadata for one message, as far as the server provided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub uid: u32,
    /// Raw subject, possibly MIME-encoded.
    pub subject: String,
    pub from: Vec<Address>,
    pub to: Vec<Address>,
    /// Raw `Date:` header.
    pub date: String,
    /// INTERNALDATE as Unix seconds.
    pub arrival_timestamp: Option<i64>,
}

impl MessageHeader {
    /// Extract header fields from a FETCH response. `None` if the
    /// response carries no envelope.
    #[must_use]
    pub fn from_fetch(uid: u32, fetch: &Fetch) -> Option<Self> {
        let envelope = fetch.envelope()?;
        Some(Self {
            uid,
            subject: envelope.subject.as_deref().map(lossy).unwrap_or_default(),
            from: addresses(envelope.from.as_deref()),
            to: addresses(envelope.to.as_deref()),
            date: envelope.date.as_deref().map(lossy).unwrap_or_default(),
            arrival_timestamp: fetch.internal_date().map(|d| d.timestamp()),
        })
    }

    /// Turn the raw header into its display form as seen by `identity`.
    #[must_use]
    pub fn summarize(&self, identity: &str, webmail: &str) -> MailSummary {
        let arrival_timestamp = self
            .arrival_timestamp
            .or_else(|| parse_header_date(&self.date).map(|d| d.timestamp()))
            .unwrap_or(0);

        MailSummary {
            subject: decode_mime_words(&self.subject).into_owned(),
            from: decode_mime_words(&summarize_from(&self.from)).into_owned(),
            to: decode_mime_words(&summarize_to(identity, &self.to)).into_owned(),
            date: format_date(&self.date, arrival_timestamp),
            arrival_timestamp,
            webmail_url: webmail.to_string(),
        }
    }
}

fn lossy(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Group delimiters (entries without a host) are skipped.
fn addresses(list: Option<&[imap_proto::types::Address<'_>]>) -> Vec<Address> {
    list.unwrap_or_default()
        .iter()
        .filter(|a| a.host.is_some())
        .map(|a| Address::from_raw(a.mailbox.as_deref(), a.host.as_deref()))
        .collect()
}

/// Parse a `Date:` header, keeping its own UTC offset.
///
/// Trailing comments such as `(UTC)` are ignored. Dates chrono rejects
/// go through mailparse's lenient parser and come back in UTC.
fn parse_header_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = raw.split_once('(').map_or(raw, |(head, _)| head).trim();
    if trimmed.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(trimmed).ok().or_else(|| {
        mailparse::dateparse(trimmed)
            .ok()
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .map(|d| d.fixed_offset())
    })
}

/// Render a `Date:` header as `DD/MM/YYYY HH:MM`.
///
/// An unparseable header falls back to `fallback` (Unix seconds,
/// rendered in UTC).
#[must_use]
pub fn format_date(raw: &str, fallback: i64) -> String {
    parse_header_date(raw).map_or_else(
        || {
            DateTime::<Utc>::from_timestamp(fallback, 0)
                .unwrap_or_default()
                .format(DATE_FORMAT)
                .to_string()
        },
        |d| d.format(DATE_FORMAT).to_string(),
    )
}

/// The error recorded when one message's header cannot be read.
#[must_use]
pub fn header_fetch_failed(uid: u32, address: &str) -> String {
    format!("Header fetch failed for message {uid} on {address}")
}

/// The error recorded when the server rejects the unseen search.
///
/// A rejected search is reported rather than treated as an empty
/// mailbox, so a broken account is not mistaken for one without mail.
#[must_use]
pub fn search_failed(address: &str) -> String {
    format!("Unseen search on {address} server failed")
}

/// UIDs of all unseen messages in the examined folder, ascending.
///
/// # Errors
///
/// Returns [`Error::Imap`] if the server rejects the search.
pub async fn search_unseen(session: &mut ImapSession) -> Result<Vec<u32>> {
    let uids = session
        .uid_search("UNSEEN")
        .await
        .map_err(|e| Error::Imap(format!("Search failed: {e}")))?;

    let mut uid_list: Vec<u32> = uids.into_iter().collect();
    uid_list.sort_unstable();
    Ok(uid_list)
}

/// Fetch header metadata for a single UID.
///
/// Only a response carrying `uid` counts; unsolicited FETCH responses
/// for other messages are skipped. The response stream is always
/// drained so the session stays usable for the next message, even when
/// this one fails.
///
/// # Errors
///
/// Returns [`Error::Imap`] if the fetch fails or the server returns no
/// envelope for `uid`.
pub async fn fetch_header(session: &mut ImapSession, uid: u32) -> Result<MessageHeader> {
    let uid_set = uid.to_string();
    let mut messages = session
        .uid_fetch(&uid_set, HEADER_ITEMS)
        .await
        .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?;

    let mut header = None;
    let mut failure = None;
    while let Some(item) = messages.next().await {
        match item {
            Ok(fetch) if header.is_none() && fetch.uid == Some(uid) => {
                header = MessageHeader::from_fetch(uid, &fetch);
            }
            Ok(fetch) => debug!("Ignoring FETCH for {:?} while waiting for {}", fetch.uid, uid),
            Err(e) => {
                failure.get_or_insert_with(|| Error::Imap(format!("Fetch error: {e}")));
            }
        }
    }
    drop(messages);

    if let Some(e) = failure {
        return Err(e);
    }
    header.ok_or_else(|| Error::Imap(format!("No envelope for UID {uid}")))
}

/// List every unseen message and summarise each one.
///
/// A message whose header cannot be read adds one error and is
/// skipped; the remaining messages are still processed.
///
/// # Errors
///
/// Returns [`Error::Imap`] only if the unseen search itself fails.
pub async fn scan_unseen(session: &mut ImapSession, account: &Account) -> Result<AccountReport> {
    let address = account.address();
    let uids = search_unseen(session).await?;
    if uids.is_empty() {
        debug!("No unseen messages on {}", address);
        return Ok(AccountReport::default());
    }

    info!("Found {} unseen messages on {}", uids.len(), address);

    let mut report = AccountReport::default();
    for uid in uids {
        match fetch_header(session, uid).await {
            Ok(header) => report
                .mails
                .push(header.summarize(&account.login, &account.webmail)),
            Err(e) => {
                warn!("Failed to fetch header of UID {} on {}: {}", uid, address, e);
                report.errors.push(header_fetch_failed(uid, &address));
            }
        }
    }

    Ok(report)
}
