//! # Receipt Identity Newtypes
//!
//! `ReceiptId` identifies a receipt; `CallerPrefix` is the redacted form of
//! the credential that triggered it. Neither is a bare `String` so the two
//! cannot be swapped by accident.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique, time-ordered receipt identifier.
///
/// Backed by a UUIDv7. `uuid` keeps a process-wide counter for v7
/// generation, so identifiers created later in the same process compare
/// greater, both as UUIDs and as hyphenated strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptId(pub String);

impl ReceiptId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ReceiptId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Number of leading credential characters kept by [`CallerPrefix::redact()`].
pub const CALLER_PREFIX_LEN: usize = 8;

/// Redacted caller identity, e.g. `sk_live_...`.
///
/// Never holds a full credential: at most [`CALLER_PREFIX_LEN`] characters
/// survive, and never more than half of the original secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerPrefix(String);

impl CallerPrefix {
    /// Redact a credential down to a short prefix followed by `...`.
    ///
    /// Returns `None` for empty or whitespace-only input.
    pub fn redact(secret: &str) -> Option<Self> {
        let secret = secret.trim();
        if secret.is_empty() {
            return None;
        }
        let total = secret.chars().count();
        let keep = CALLER_PREFIX_LEN.min(total / 2);
        let prefix: String = secret.chars().take(keep).collect();
        Some(Self(format!("{prefix}...")))
    }

    /// Wrap a value that was already redacted, e.g. one read back from storage.
    pub fn from_redacted(redacted: impl Into<String>) -> Self {
        Self(redacted.into())
    }

    /// Access the redacted string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
