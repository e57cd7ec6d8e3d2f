//! # Error Types
//!
//! Errors raised by the pure ledger primitives. All errors use `thiserror`
//! for derive-based `Display` and `Error` implementations.

use thiserror::Error;

/// Top-level error type for `attest-core`.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A timestamp string could not be parsed as RFC 3339.
    #[error("invalid timestamp {input:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        input: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// An action string was neither `invoke` nor `block`.
    #[error("invalid receipt action {0:?}: expected \"invoke\" or \"block\"")]
    InvalidAction(String),

    /// A digest string was not 64 lowercase hex characters.
    #[error("invalid digest: {0}")]
    InvalidDigest(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
