//! # Ledger Query Tools
//!
//! The ledger's own surface, exposed as tools: `record_receipt`,
//! `list_receipts`, `verify_chain`, and `receipt_summary`. All four are in
//! [`crate::EXEMPT_TOOLS`].

use attest_core::{Action, NewReceipt, Receipt};
use attest_ledger::{Ledger, ListFilter};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::outcome::{ToolError, ToolResponse};
use crate::registry::{handler, ToolDefinition, ToolRegistry};

/// Arguments of `record_receipt`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecordArgs {
    pub tool: String,
    #[serde(default = "default_action")]
    pub action: Action,
    pub input_hash: String,
    pub output_hash: String,
    pub success: bool,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub policy_ref: Option<String>,
}

fn default_action() -> Action {
    Action::Invoke
}

impl RecordArgs {
    fn into_new_receipt(self) -> NewReceipt {
        let new = NewReceipt::invoke(
            self.tool,
            self.input_hash,
            self.output_hash,
            self.success,
            self.duration_ms,
        )
        .with_action(self.action);
        match self.policy_ref {
            Some(policy_ref) => new.with_policy_ref(policy_ref),
            None => new,
        }
    }
}

/// Output of `list_receipts`.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptPage {
    pub count: usize,
    pub receipts: Vec<Receipt>,
}

/// Register the four ledger tools on `registry`.
pub fn register_receipt_tools<R: ToolRegistry + ?Sized>(registry: &mut R, ledger: &Ledger) {
    let l = ledger.clone();
    registry.register(
        ToolDefinition::new(
            "record_receipt",
            "Manually append a receipt for an operation outside the interceptor.",
            record_schema(),
        ),
        handler(move |args| {
            let ledger = l.clone();
            async move {
                let args: RecordArgs = parse_args(args)?;
                let receipt = ledger.append(args.into_new_receipt()).await?;
                ToolResponse::json(&receipt)
            }
        }),
    );

    let l = ledger.clone();
    registry.register(
        ToolDefinition::new(
            "list_receipts",
            "List receipts in chain order, filtered by tool and time range.",
            list_schema(),
        ),
        handler(move |args| {
            let ledger = l.clone();
            async move {
                let filter: ListFilter = parse_args(args)?;
                let receipts = ledger.list(&filter).await?;
                ToolResponse::json(&ReceiptPage {
                    count: receipts.len(),
                    receipts,
                })
            }
        }),
    );

    let l = ledger.clone();
    registry.register(
        ToolDefinition::new(
            "verify_chain",
            "Walk the full receipt chain and report the first break, if any.",
            empty_schema(),
        ),
        handler(move |_| {
            let ledger = l.clone();
            async move { ToolResponse::json(&ledger.verify_chain().await?) }
        }),
    );

    let l = ledger.clone();
    registry.register(
        ToolDefinition::new(
            "receipt_summary",
            "Totals, per-tool counts, success rate, and chain validity.",
            empty_schema(),
        ),
        handler(move |_| {
            let ledger = l.clone();
            async move { ToolResponse::json(&ledger.summary().await?) }
        }),
    );
}

/// Deserialize tool arguments, treating a missing body as `{}`.
pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() { json!({}) } else { args };
    Ok(serde_json::from_value(args)?)
}

fn record_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "tool": {"type": "string"},
            "action": {"type": "string", "enum": ["invoke", "block"]},
            "inputHash": {"type": "string"},
            "outputHash": {"type": "string"},
            "success": {"type": "boolean"},
            "durationMs": {"type": "integer", "minimum": 0},
            "policyRef": {"type": "string"}
        },
        "required": ["tool", "inputHash", "outputHash", "success"]
    })
}

fn list_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "tool": {"type": "string"},
            "since": {"type": "string", "description": "Inclusive lower bound: RFC 3339 timestamp or YYYY-MM-DD date"},
            "until": {"type": "string", "description": "Inclusive upper bound: RFC 3339 timestamp or YYYY-MM-DD date"},
            "limit": {"type": "integer"},
            "offset": {"type": "integer"}
        }
    })
}

fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_args_defaults() {
        let args: RecordArgs = parse_args(json!({
            "tool": "deploy",
            "inputHash": "i",
            "outputHash": "o",
            "success": true
        }))
        .unwrap();
        assert_eq!(args.action, Action::Invoke);
        assert_eq!(args.duration_ms, 0);
        assert!(args.policy_ref.is_none());
    }

    #[test]
    fn record_args_reject_unknown_fields() {
        let err = parse_args::<RecordArgs>(json!({
            "tool": "deploy",
            "inputHash": "i",
            "outputHash": "o",
            "success": true,
            "input": "raw payloads are never stored"
        }))
        .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn null_arguments_parse_as_empty_filter() {
        let filter: ListFilter = parse_args(Value::Null).unwrap();
        assert_eq!(filter, ListFilter::default());
    }
}
