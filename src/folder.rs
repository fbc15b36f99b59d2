//! IMAP folder types
//!
//! Each account scans exactly one folder. INBOX is matched
//! case-insensitively as RFC 3501 requires; anything else is kept
//! verbatim in the `Custom` variant. Accounts files name the folder as
//! a plain string.

use serde::Deserialize;
use std::fmt;

/// The IMAP folder an account is scanned in.
///
/// # Examples
///
/// ```
/// use mailpeek::Folder;
///
/// assert_eq!(Folder::default(), Folder::Inbox);
/// assert_eq!(Folder::from("inbox").as_str(), "INBOX");
/// assert_eq!(Folder::from("Lists/rust").as_str(), "Lists/rust");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum Folder {
    /// The INBOX folder (RFC 3501 required, case-insensitive).
    #[default]
    Inbox,
    /// A user-defined or server-specific folder.
    Custom(String),
}

impl Folder {
    /// Create a folder for a user-defined or non-standard mailbox.
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// The IMAP folder name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Inbox => "INBOX",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Folder {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("inbox") {
            Self::Inbox
        } else {
            Self::Custom(s.to_string())
        }
    }
}

impl From<String> for Folder {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}
