//! Storage location resolution.
//!
//! Priority: explicit path, then `ATTEST_LEDGER_PATH`, then
//! `$HOME/.attest/receipts.db` (`USERPROFILE` on Windows, `.` as a last
//! resort).

use std::path::PathBuf;

/// Environment variable overriding the ledger location.
pub const LEDGER_PATH_ENV: &str = "ATTEST_LEDGER_PATH";

const DEFAULT_DIR: &str = ".attest";
const DEFAULT_FILE: &str = "receipts.db";

/// Where and how to open a ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Explicit database path. Takes precedence over the environment.
    pub path: Option<PathBuf>,
}

impl LedgerConfig {
    /// Config for an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Config taken from `ATTEST_LEDGER_PATH`, if set and non-empty.
    pub fn from_env() -> Self {
        Self {
            path: std::env::var(LEDGER_PATH_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Resolve the database path against the process environment.
    pub fn resolve_path(&self) -> PathBuf {
        self.resolve_path_with(|key| std::env::var(key).ok())
    }

    /// Resolve the database path using `lookup` for environment variables.
    pub fn resolve_path_with<F>(&self, lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = &self.path {
            return path.clone();
        }
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(path) = non_empty(LEDGER_PATH_ENV) {
            return PathBuf::from(path);
        }
        let home = non_empty("HOME")
            .or_else(|| non_empty("USERPROFILE"))
            .unwrap_or_else(|| ".".to_string());
        PathBuf::from(home).join(DEFAULT_DIR).join(DEFAULT_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn explicit_path_wins() {
        let cfg = LedgerConfig::at("/tmp/explicit.db");
        let path = cfg.resolve_path_with(env(&[(LEDGER_PATH_ENV, "/tmp/env.db"), ("HOME", "/home/op")]));
        assert_eq!(path, PathBuf::from("/tmp/explicit.db"));
    }

    #[test]
    fn env_override_beats_home() {
        let path = LedgerConfig::default()
            .resolve_path_with(env(&[(LEDGER_PATH_ENV, "/tmp/env.db"), ("HOME", "/home/op")]));
        assert_eq!(path, PathBuf::from("/tmp/env.db"));
    }

    #[test]
    fn default_lives_under_home() {
        let path = LedgerConfig::default().resolve_path_with(env(&[("HOME", "/home/op")]));
        assert_eq!(path, PathBuf::from("/home/op/.attest/receipts.db"));
    }

    #[test]
    fn falls_back_to_userprofile_then_cwd() {
        let path = LedgerConfig::default()
            .resolve_path_with(env(&[("HOME", ""), ("USERPROFILE", "C:/Users/op")]));
        assert_eq!(path, PathBuf::from("C:/Users/op/.attest/receipts.db"));

        let path = LedgerConfig::default().resolve_path_with(env(&[]));
        assert_eq!(path, PathBuf::from("./.attest/receipts.db"));
    }
}
