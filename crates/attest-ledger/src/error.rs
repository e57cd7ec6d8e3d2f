//! Ledger error type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The storage directory could not be created.
    #[error("cannot prepare ledger directory {}: {source}", path.display())]
    Io {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A core invariant failed (timestamp, action, digest parsing).
    #[error(transparent)]
    Core(#[from] attest_core::CoreError),

    /// The ledger has been closed.
    #[error("ledger is closed")]
    Closed,

    /// A query filter could not be interpreted.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A stored row could not be decoded into a receipt.
    #[error("corrupt receipt {id}: {reason}")]
    Corrupt {
        /// Id of the undecodable row.
        id: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The append task was aborted before it could report back.
    #[error("append task failed: {0}")]
    Task(String),
}
