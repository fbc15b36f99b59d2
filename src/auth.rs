//! Shared-secret gate in front of every scan

/// Outcome of checking a caller's token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
}

/// Compares caller tokens against the configured secret.
///
/// Only an exact, byte-for-byte match is accepted. A missing token, or
/// an empty configured secret, is always denied.
#[derive(Debug, Clone, Copy)]
pub struct AuthGate<'a> {
    secret: &'a str,
}

impl<'a> AuthGate<'a> {
    #[must_use]
    pub const fn new(secret: &'a str) -> Self {
        Self { secret }
    }

    #[must_use]
    pub fn check(&self, token: Option<&str>) -> Verdict {
        match token {
            Some(token) if !self.secret.is_empty() && same_bytes(token, self.secret) => {
                Verdict::Allow
            }
            _ => Verdict::Deny,
        }
    }
}

/// Equality that inspects every byte of equal-length inputs, so the
/// time taken does not reveal the length of a matching prefix.
fn same_bytes(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}
