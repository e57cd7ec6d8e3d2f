//! # attest-cli: Command-Line Interface for the Receipt Ledger
//!
//! Provides the `attest` binary.
//!
//! ## Subcommands
//!
//! - `attest list`: Receipts in chain order, with tool/time/page filters.
//! - `attest verify`: Full chain walk; exits 2 when the chain is broken.
//! - `attest summary`: Totals, per-tool counts, success rate.
//! - `attest record`: Manually append a receipt.
//! - `attest digest`: Canonical SHA-256 of a JSON document.
//! - `attest serve`: Newline-delimited JSON tool server on stdio, with
//!   every non-ledger tool call recorded.
//!
//! ```bash
//! attest --ledger ./receipts.db list --tool hash_text --limit 20
//! attest verify || echo "chain broken"
//! echo '{"b":1,"a":2}' | attest digest
//! ```
//!
//! Logs go to stderr; stdout carries command output only.

pub mod digest;
pub mod logging;
pub mod receipts;
pub mod serve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use attest_core::CallerPrefix;
use attest_ledger::{Ledger, LedgerConfig};

/// Environment variable holding the caller credential.
pub const CALLER_KEY_ENV: &str = "ATTEST_CALLER_KEY";

/// Exit code for a successful command.
pub const EXIT_OK: u8 = 0;

/// Exit code when chain verification finds a break.
pub const EXIT_CHAIN_BROKEN: u8 = 2;

/// Ledger configuration from the `--ledger` flag, falling back to the
/// environment.
pub fn ledger_config(path: Option<PathBuf>) -> LedgerConfig {
    match path {
        Some(path) => LedgerConfig::at(path),
        None => LedgerConfig::from_env(),
    }
}

/// Redacted caller identity from `--caller-key`.
pub fn caller_prefix(key: Option<&str>) -> Option<CallerPrefix> {
    key.and_then(CallerPrefix::redact)
}

/// Open the ledger, failing with the resolved path in the error.
pub async fn open_ledger(config: &LedgerConfig) -> Result<Ledger> {
    let path = config.resolve_path();
    Ledger::open(config)
        .await
        .with_context(|| format!("cannot open receipt ledger at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_ledger_path_wins() {
        let cfg = ledger_config(Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(cfg.path, Some(PathBuf::from("/tmp/x.db")));
    }

    #[test]
    fn caller_key_is_redacted() {
        let prefix = caller_prefix(Some("idbr_abcdef0123456789")).unwrap();
        assert_eq!(prefix.as_str(), "idbr_abc...");
        assert!(caller_prefix(Some("  ")).is_none());
        assert!(caller_prefix(None).is_none());
    }
}
