//! Aggregate ledger statistics.

use std::collections::BTreeMap;

use attest_core::Timestamp;
use serde::{Deserialize, Serialize};

/// Snapshot statistics over the whole ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSummary {
    /// Number of receipts.
    pub total: u64,
    /// Receipt count per tool.
    pub by_tool: BTreeMap<String, u64>,
    /// Successful receipts over total; `1.0` for an empty ledger.
    pub success_rate: f64,
    /// Result of a full chain verification.
    pub chain_valid: bool,
    /// Earliest receipt timestamp.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub first_timestamp: Option<Timestamp>,
    /// Latest receipt timestamp.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_timestamp: Option<Timestamp>,
}

impl ReceiptSummary {
    /// Summary of a ledger with no receipts.
    pub fn empty() -> Self {
        Self {
            total: 0,
            by_tool: BTreeMap::new(),
            success_rate: 1.0,
            chain_valid: true,
            first_timestamp: None,
            last_timestamp: None,
        }
    }
}

/// `successes / total`, or `1.0` when nothing has run.
pub(crate) fn success_rate(successes: u64, total: u64) -> f64 {
    if total == 0 {
        1.0
    } else {
        successes as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rate_is_one() {
        assert_eq!(success_rate(0, 0), 1.0);
        assert!((success_rate(2, 3) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_summary_json() {
        let json = serde_json::to_value(ReceiptSummary::empty()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "total": 0,
                "byTool": {},
                "successRate": 1.0,
                "chainValid": true
            })
        );
    }
}
