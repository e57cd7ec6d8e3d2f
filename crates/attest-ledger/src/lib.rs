//! # attest-ledger: Persistent Receipt Ledger
//!
//! Stores receipts in a single SQLite table and keeps the chain tip in
//! memory so each append costs one `INSERT`.
//!
//! ## Architecture
//!
//! - **Config** (`config.rs`): storage location resolution (explicit path,
//!   `ATTEST_LEDGER_PATH`, then `~/.attest/receipts.db`).
//!
//! - **Schema** (`schema.rs`): the append-only `receipts` table and its
//!   `tool` / `timestamp` indexes.
//!
//! - **Store** (`store.rs`): [`Ledger`] with `open`, `append`, `list`,
//!   `verify_chain`, `summary`, and `close`.
//!
//! - **Query** (`query.rs`): [`ListFilter`] and its clamping rules.
//!
//! - **Summary** (`summary.rs`): [`ReceiptSummary`] aggregate statistics.
//!
//! ## Concurrency
//!
//! The tip read-modify-write (read tip, hash, insert, advance tip) runs under
//! a per-ledger `tokio::sync::Mutex`, so no two receipts can share a
//! `prev_hash`. Reads go straight to the connection pool; SQLite WAL mode
//! gives each read a consistent snapshot and lets other processes read while
//! this one writes.

pub mod config;
pub mod error;
pub mod query;
mod schema;
pub mod store;
pub mod summary;

pub use config::{LedgerConfig, LEDGER_PATH_ENV};
pub use error::LedgerError;
pub use query::{ListFilter, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
pub use store::Ledger;
pub use summary::ReceiptSummary;
