//! # attest-core: Foundational Types for the Receipt Ledger
//!
//! This crate defines the pure, storage-agnostic half of the attest audit
//! ledger: how values are canonicalized and digested, how receipts are
//! identified and timestamped, and how each receipt is bound to its
//! predecessor by a chain hash.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** Input and output fingerprints flow through
//!    `CanonicalBytes::new()` (RFC 8785 JCS). Identical values always digest
//!    identically, across restarts and regardless of object key order.
//!
//! 2. **One chain-hash function.** [`chain::compute_chain_hash()`] is used by
//!    both the append path and the verification walk. Its field order and
//!    encoding are part of the on-disk contract.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] renders as
//!    `YYYY-MM-DDTHH:MM:SS.mmmZ`, so lexicographic order equals chronological
//!    order and range filters can compare stored strings directly.
//!
//! 4. **Time-ordered identifiers.** [`ReceiptId`] wraps a UUIDv7, which sorts
//!    lexicographically in creation order within a process.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `attest-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod chain;
pub mod digest;
pub mod error;
pub mod identity;
pub mod receipt;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use chain::{compute_chain_hash, verify_chain, ChainLink, ChainVerification, GENESIS};
pub use digest::{digest_value, sha256_bytes, sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, CoreError};
pub use identity::{CallerPrefix, ReceiptId};
pub use receipt::{Action, NewReceipt, Receipt};
pub use temporal::Timestamp;
