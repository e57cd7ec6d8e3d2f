//! # Hash Chain
//!
//! Every receipt carries `prev_hash` (the previous receipt's chain hash, or
//! [`GENESIS`]) and `chain_hash`:
//!
//! ```text
//! chain_hash = SHA256(id | tool | action | input_hash | output_hash | success | timestamp | prev_hash)
//! ```
//!
//! Fields are joined with `|`. A field that itself contains `|` or `\` has
//! those characters backslash-escaped first, so distinct field tuples can
//! never produce the same preimage. `success` is rendered as `true`/`false`
//! and `timestamp` in its fixed ISO 8601 form.
//!
//! ## Integrity Invariants
//!
//! - `receipt[0].prev_hash == GENESIS`
//! - `receipt[n].prev_hash == receipt[n-1].chain_hash`
//! - `receipt[n].chain_hash == compute_chain_hash(receipt[n].link())`
//!
//! Field order and encoding are part of the storage contract: changing
//! either invalidates every previously written ledger.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::identity::ReceiptId;
use crate::receipt::Receipt;
use crate::temporal::Timestamp;

/// `prev_hash` of the first receipt in a ledger.
pub const GENESIS: &str = "GENESIS";

const DELIMITER: char = '|';

/// The fields that feed a receipt's chain hash, in hashing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainLink<'a> {
    /// Receipt identifier.
    pub id: &'a str,
    /// Operation name.
    pub tool: &'a str,
    /// `invoke` or `block`.
    pub action: &'a str,
    /// Input digest.
    pub input_hash: &'a str,
    /// Output digest.
    pub output_hash: &'a str,
    /// Outcome.
    pub success: bool,
    /// Seal time.
    pub timestamp: Timestamp,
    /// Previous chain hash.
    pub prev_hash: &'a str,
}

fn escape_field(field: &str) -> Cow<'_, str> {
    if !field.contains([DELIMITER, '\\']) {
        return Cow::Borrowed(field);
    }
    let mut out = String::with_capacity(field.len() + 4);
    for c in field.chars() {
        if c == DELIMITER || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    Cow::Owned(out)
}

/// Compute the lowercase hex SHA-256 chain hash for one receipt.
pub fn compute_chain_hash(link: &ChainLink<'_>) -> String {
    let success = if link.success { "true" } else { "false" };
    let timestamp = link.timestamp.to_iso8601();
    let fields = [
        escape_field(link.id),
        escape_field(link.tool),
        escape_field(link.action),
        escape_field(link.input_hash),
        escape_field(link.output_hash),
        Cow::Borrowed(success),
        Cow::Owned(timestamp),
        escape_field(link.prev_hash),
    ];

    let mut hasher = Sha256::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            hasher.update([DELIMITER as u8]);
        }
        hasher.update(field.as_bytes());
    }
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

/// Outcome of walking a receipt chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainVerification {
    /// Whether every receipt links and hashes correctly.
    pub valid: bool,
    /// Receipts verified before the walk stopped. On failure this is the
    /// zero-based position of the offending receipt.
    pub receipts_checked: u64,
    /// Id of the first receipt that failed verification.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub broken_at: Option<ReceiptId>,
}

impl ChainVerification {
    /// Verification result for an empty chain.
    pub fn empty() -> Self {
        Self {
            valid: true,
            receipts_checked: 0,
            broken_at: None,
        }
    }
}

/// Walk receipts in insertion order and check both invariants at each step.
///
/// Stops at the first receipt whose `prev_hash` does not match the previous
/// `chain_hash` (or [`GENESIS`]) or whose stored `chain_hash` cannot be
/// reproduced from its fields.
pub fn verify_chain<'a, I>(receipts: I) -> ChainVerification
where
    I: IntoIterator<Item = &'a Receipt>,
{
    let mut expected_prev: &str = GENESIS;
    let mut checked: u64 = 0;

    for receipt in receipts {
        if receipt.prev_hash != expected_prev
            || receipt.recompute_chain_hash() != receipt.chain_hash
        {
            return ChainVerification {
                valid: false,
                receipts_checked: checked,
                broken_at: Some(receipt.id.clone()),
            };
        }
        expected_prev = &receipt.chain_hash;
        checked += 1;
    }

    ChainVerification {
        valid: true,
        receipts_checked: checked,
        broken_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipt::NewReceipt;

    fn ts() -> Timestamp {
        Timestamp::parse("2024-01-15T12:00:00.000Z").unwrap()
    }

    fn link<'a>(tool: &'a str, input_hash: &'a str) -> ChainLink<'a> {
        ChainLink {
            id: "id-1",
            tool,
            action: "invoke",
            input_hash,
            output_hash: "o",
            success: true,
            timestamp: ts(),
            prev_hash: GENESIS,
        }
    }

    fn build_chain(n: usize) -> Vec<Receipt> {
        let mut out: Vec<Receipt> = Vec::new();
        for i in 0..n {
            let prev = out.last().map_or(GENESIS.to_string(), |r| r.chain_hash.clone());
            out.push(Receipt::seal(
                NewReceipt::invoke(format!("tool_{i}"), format!("i{i}"), format!("o{i}"), true, 1),
                ReceiptId::generate(),
                ts(),
                prev,
            ));
        }
        out
    }

    #[test]
    fn test_known_vector_matches_plain_join() {
        // No field contains a delimiter, so the preimage is the plain join.
        let expected: String = Sha256::digest(
            b"id-1|a|invoke|i|o|true|2024-01-15T12:00:00.000Z|GENESIS",
        )
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
        assert_eq!(compute_chain_hash(&link("a", "i")), expected);
    }

    #[test]
    fn test_delimiter_in_field_is_unambiguous() {
        // Without escaping, ("a|b", "c") and ("a", "b|c") would collide.
        let left = compute_chain_hash(&link("a|b", "c"));
        let right = compute_chain_hash(&link("a", "b|c"));
        assert_ne!(left, right);
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a|b"), "a\\|b");
        assert_eq!(escape_field("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_empty_chain_is_valid() {
        assert_eq!(verify_chain(&Vec::<Receipt>::new()), ChainVerification::empty());
    }

    #[test]
    fn test_intact_chain_is_valid() {
        let chain = build_chain(5);
        let result = verify_chain(&chain);
        assert!(result.valid);
        assert_eq!(result.receipts_checked, 5);
        assert!(result.broken_at.is_none());
    }

    #[test]
    fn test_tampered_field_reports_position() {
        let mut chain = build_chain(5);
        chain[3].success = false;
        let result = verify_chain(&chain);
        assert!(!result.valid);
        assert_eq!(result.receipts_checked, 3);
        assert_eq!(result.broken_at.as_ref(), Some(&chain[3].id));
    }

    #[test]
    fn test_deleted_receipt_breaks_link() {
        let mut chain = build_chain(4);
        let removed = chain.remove(1);
        let result = verify_chain(&chain);
        assert!(!result.valid);
        assert_eq!(result.receipts_checked, 1);
        assert_eq!(result.broken_at.as_ref(), Some(&chain[1].id));
        assert_ne!(result.broken_at, Some(removed.id));
    }

    #[test]
    fn test_first_receipt_must_start_at_genesis() {
        let mut chain = build_chain(2);
        chain[0].prev_hash = "f".repeat(64);
        let result = verify_chain(&chain);
        assert!(!result.valid);
        assert_eq!(result.receipts_checked, 0);
    }

    #[test]
    fn test_verification_json_omits_broken_at_when_valid() {
        let json = serde_json::to_value(ChainVerification::empty()).unwrap();
        assert_eq!(json, serde_json::json!({"valid": true, "receiptsChecked": 0}));
    }
}
