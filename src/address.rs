//! Sender and recipient display strings
//!
//! Envelopes carry addresses as `(mailbox, host)` pairs. The summary
//! shows a single sender and at most one named recipient, so these
//! helpers reduce the lists to short strings.

use std::borrow::Cow;

/// One envelope address, split the way IMAP transmits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub mailbox: String,
    pub host: String,
}

impl Address {
    #[must_use]
    pub fn new(mailbox: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            mailbox: mailbox.into(),
            host: host.into(),
        }
    }

    /// Build from raw envelope bytes. Missing parts become empty.
    #[must_use]
    pub fn from_raw(mailbox: Option<&[u8]>, host: Option<&[u8]>) -> Self {
        Self {
            mailbox: mailbox.map(lossy).unwrap_or_default(),
            host: host.map(lossy).unwrap_or_default(),
        }
    }

    /// `mailbox@host`, exactly as transmitted.
    #[must_use]
    pub fn full(&self) -> String {
        format!("{}@{}", self.mailbox, self.host)
    }
}

fn lossy(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// The first sender, or `""` when there is none.
///
/// Additional senders are ignored.
///
/// ```
/// use mailpeek::{Address, summarize_from};
///
/// assert_eq!(summarize_from(&[]), "");
/// let senders = [Address::new("a", "b.com"), Address::new("x", "y.com")];
/// assert_eq!(summarize_from(&senders), "a@b.com");
/// ```
#[must_use]
pub fn summarize_from(addresses: &[Address]) -> String {
    addresses.first().map(Address::full).unwrap_or_default()
}

/// A one-line recipient summary from the point of view of `identity`.
///
/// - no recipients: `""`
/// - one recipient: that address
/// - several: `"<identity> + others"` when `identity` is among them,
///   `"<first> + others"` otherwise
///
/// `identity` is compared against full `mailbox@host` strings, byte
/// for byte.
#[must_use]
pub fn summarize_to(identity: &str, addresses: &[Address]) -> String {
    let dest: Vec<String> = addresses.iter().map(Address::full).collect();
    match dest.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [first, ..] => {
            if dest.iter().any(|d| d == identity) {
                format!("{identity} + others")
            } else {
                format!("{first} + others")
            }
        }
    }
}

/// Decode RFC 2047 encoded-words (e.g. `=?UTF-8?B?...?=`) to UTF-8.
///
/// Each encoded-word is decoded on its own and spliced back in place,
/// so raw 8-bit text around it is kept as is. Whitespace between two
/// adjacent encoded-words is dropped (RFC 2047 Section 6.2). Anything
/// that does not decode is left untouched.
#[must_use]
pub fn decode_mime_words(raw: &str) -> Cow<'_, str> {
    if !raw.contains("=?") {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    let mut after_word = false;
    while let Some(pos) = rest.find("=?") {
        let (before, candidate) = rest.split_at(pos);
        let decoded = encoded_word_len(candidate)
            .and_then(|len| decode_word(&candidate[..len]).map(|text| (len, text)));
        match decoded {
            Some((len, text)) => {
                if !(after_word && before.chars().all(char::is_whitespace)) {
                    out.push_str(before);
                }
                out.push_str(&text);
                rest = &candidate[len..];
                after_word = true;
            }
            None => {
                out.push_str(before);
                out.push_str("=?");
                rest = &candidate[2..];
                after_word = false;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Byte length of the `=?charset?encoding?text?=` token at the start of
/// `s`, if there is a well-formed one.
fn encoded_word_len(s: &str) -> Option<usize> {
    let rest = s.strip_prefix("=?")?;
    let (charset, rest) = rest.split_once('?')?;
    if charset.is_empty() || charset.contains(char::is_whitespace) {
        return None;
    }
    let (encoding, rest) = rest.split_once('?')?;
    if !matches!(encoding, "B" | "b" | "Q" | "q") {
        return None;
    }
    let (text, _) = rest.split_once("?=")?;
    if text.contains(|c: char| c == '?' || c.is_whitespace()) {
        return None;
    }
    Some(charset.len() + encoding.len() + text.len() + 6)
}

/// Decode a single, pure-ASCII encoded-word. mailparse handles the
/// transfer encoding and the charset conversion.
fn decode_word(word: &str) -> Option<String> {
    let synthetic = format!("X: {word}");
    let (header, _) = mailparse::parse_header(synthetic.as_bytes()).ok()?;
    let value = header.get_value();
    (value != word).then_some(value)
}
