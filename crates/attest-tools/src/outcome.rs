//! # Tool Outcomes
//!
//! A tool call ends in exactly one of two ways: `Ok(ToolResponse)` carrying a
//! JSON payload, or `Err(ToolError)` describing the failure. There is no
//! "successful response with an error flag" shape.

use attest_ledger::LedgerError;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Result of a single tool call.
pub type ToolResult = Result<ToolResponse, ToolError>;

/// Successful tool output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ToolResponse(Value);

impl ToolResponse {
    /// Wrap a ready JSON payload.
    pub fn new(payload: Value) -> Self {
        Self(payload)
    }

    /// Serialize `payload` into a response.
    pub fn json(payload: &impl Serialize) -> Result<Self, ToolError> {
        serde_json::to_value(payload)
            .map(Self)
            .map_err(|e| ToolError::Internal(format!("response serialization failed: {e}")))
    }

    /// Borrow the payload.
    pub fn payload(&self) -> &Value {
        &self.0
    }

    /// Take the payload.
    pub fn into_payload(self) -> Value {
        self.0
    }
}

/// Failed tool output.
///
/// Every variant counts as a failed call when recorded, whatever its cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ToolError {
    /// Arguments did not match the tool's input schema.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A remote service answered with an error status.
    #[error("upstream returned {status}: {message}")]
    Upstream {
        /// HTTP-style status code.
        status: u16,
        /// Body or reason phrase.
        message: String,
    },

    /// No tool is registered under this name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Anything else that went wrong inside the tool.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Upstream { .. } => "upstream",
            Self::UnknownTool(_) => "unknown_tool",
            Self::Internal(_) => "internal",
        }
    }

    /// JSON body describing the error. This is what the recorder digests as
    /// the output of a failed call.
    pub fn to_value(&self) -> Value {
        let mut body = json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let Self::Upstream { status, .. } = self {
            body["status"] = json!(status);
        }
        body
    }
}

impl From<LedgerError> for ToolError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InvalidFilter(msg) => Self::InvalidInput(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_carries_kind_and_status() {
        let err = ToolError::Upstream {
            status: 503,
            message: "unavailable".into(),
        };
        let body = err.to_value();
        assert_eq!(body["kind"], "upstream");
        assert_eq!(body["status"], 503);
        assert_eq!(body["message"], "upstream returned 503: unavailable");
    }

    #[test]
    fn invalid_filter_maps_to_invalid_input() {
        let err: ToolError = LedgerError::InvalidFilter("since: bad".into()).into();
        assert!(matches!(err, ToolError::InvalidInput(_)));
        let err: ToolError = LedgerError::Closed.into();
        assert_eq!(err.kind(), "internal");
    }

    #[test]
    fn response_is_transparent_json() {
        let resp = ToolResponse::json(&json!({"ok": true})).unwrap();
        assert_eq!(serde_json::to_value(&resp).unwrap(), json!({"ok": true}));
    }
}
