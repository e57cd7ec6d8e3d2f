//! # Receipts
//!
//! A [`Receipt`] is the immutable record of one tool invocation or block
//! decision. Receipts are only ever produced by [`Receipt::seal()`], which
//! binds the caller-supplied fields to an id, a timestamp, and the previous
//! chain hash.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chain::{compute_chain_hash, ChainLink};
use crate::error::CoreError;
use crate::identity::{CallerPrefix, ReceiptId};
use crate::temporal::Timestamp;

/// What happened to the recorded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// The operation ran.
    Invoke,
    /// The operation was refused before running.
    Block,
}

impl Action {
    /// The stored and hashed string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoke => "invoke",
            Self::Block => "block",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invoke" => Ok(Self::Invoke),
            "block" => Ok(Self::Block),
            other => Err(CoreError::InvalidAction(other.to_string())),
        }
    }
}

/// The caller-supplied half of a receipt, before the ledger seals it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReceipt {
    /// Operation name.
    pub tool: String,
    /// Invoke or block.
    pub action: Action,
    /// Digest of the canonicalized input.
    pub input_hash: String,
    /// Digest of the canonicalized output.
    pub output_hash: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Wall-clock duration of the operation itself.
    pub duration_ms: u64,
    /// Policy under which the decision was taken, if any.
    pub policy_ref: Option<String>,
    /// Redacted identity of the caller, if known.
    pub caller_prefix: Option<CallerPrefix>,
}

impl NewReceipt {
    /// Receipt for an operation that ran.
    pub fn invoke(
        tool: impl Into<String>,
        input_hash: impl Into<String>,
        output_hash: impl Into<String>,
        success: bool,
        duration_ms: u64,
    ) -> Self {
        Self {
            tool: tool.into(),
            action: Action::Invoke,
            input_hash: input_hash.into(),
            output_hash: output_hash.into(),
            success,
            duration_ms,
            policy_ref: None,
            caller_prefix: None,
        }
    }

    /// Override the action (builder pattern).
    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    /// Attach a policy reference (builder pattern).
    #[must_use]
    pub fn with_policy_ref(mut self, policy_ref: impl Into<String>) -> Self {
        self.policy_ref = Some(policy_ref.into());
        self
    }

    /// Attach a redacted caller identity (builder pattern).
    #[must_use]
    pub fn with_caller_prefix(mut self, caller_prefix: Option<CallerPrefix>) -> Self {
        self.caller_prefix = caller_prefix;
        self
    }
}

/// An immutable, chain-linked audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Time-ordered unique identifier.
    pub id: ReceiptId,
    /// Operation name.
    pub tool: String,
    /// Invoke or block.
    pub action: Action,
    /// Digest of the canonicalized input.
    pub input_hash: String,
    /// Digest of the canonicalized output.
    pub output_hash: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Policy reference, if any.
    pub policy_ref: Option<String>,
    /// Redacted caller identity, if any.
    pub caller_prefix: Option<CallerPrefix>,
    /// When the receipt was sealed.
    pub timestamp: Timestamp,
    /// Duration of the recorded operation in milliseconds.
    pub duration_ms: u64,
    /// Chain hash of the preceding receipt, or [`crate::GENESIS`].
    pub prev_hash: String,
    /// Digest binding this receipt to its fields and `prev_hash`.
    pub chain_hash: String,
}

impl Receipt {
    /// Seal a new receipt onto the chain whose tip is `prev_hash`.
    pub fn seal(
        new: NewReceipt,
        id: ReceiptId,
        timestamp: Timestamp,
        prev_hash: impl Into<String>,
    ) -> Self {
        let mut receipt = Self {
            id,
            tool: new.tool,
            action: new.action,
            input_hash: new.input_hash,
            output_hash: new.output_hash,
            success: new.success,
            policy_ref: new.policy_ref,
            caller_prefix: new.caller_prefix,
            timestamp,
            duration_ms: new.duration_ms,
            prev_hash: prev_hash.into(),
            chain_hash: String::new(),
        };
        receipt.chain_hash = receipt.recompute_chain_hash();
        receipt
    }

    /// The hashed subset of this receipt's fields.
    pub fn link(&self) -> ChainLink<'_> {
        ChainLink {
            id: self.id.as_str(),
            tool: &self.tool,
            action: self.action.as_str(),
            input_hash: &self.input_hash,
            output_hash: &self.output_hash,
            success: self.success,
            timestamp: self.timestamp,
            prev_hash: &self.prev_hash,
        }
    }

    /// Recompute the chain hash from the stored fields.
    ///
    /// Equals `chain_hash` for every untampered receipt.
    pub fn recompute_chain_hash(&self) -> String {
        compute_chain_hash(&self.link())
    }
}
