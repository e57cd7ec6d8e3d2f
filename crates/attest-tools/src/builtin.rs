//! Local tools served alongside the ledger surface. These go through the
//! recorder like any other tool.

use attest_core::{digest_value, sha256_bytes};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::outcome::{ToolError, ToolResponse};
use crate::receipt_tools::parse_args;
use crate::registry::{handler, ToolDefinition, ToolRegistry};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HashTextArgs {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CanonicalDigestArgs {
    value: Value,
}

/// Register `hash_text` and `canonical_digest`.
pub fn register_builtin_tools<R: ToolRegistry + ?Sized>(registry: &mut R) {
    registry.register(
        ToolDefinition::new(
            "hash_text",
            "SHA-256 of a UTF-8 string, hex encoded.",
            json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            }),
        ),
        handler(|args| async move {
            let HashTextArgs { text } = parse_args(args)?;
            let digest = sha256_bytes(text.as_bytes());
            Ok::<_, ToolError>(ToolResponse::new(json!({ "sha256": digest.to_hex() })))
        }),
    );

    registry.register(
        ToolDefinition::new(
            "canonical_digest",
            "SHA-256 of the JCS canonical form of a JSON value.",
            json!({
                "type": "object",
                "properties": {"value": {}},
                "required": ["value"]
            }),
        ),
        handler(|args| async move {
            let CanonicalDigestArgs { value } = parse_args(args)?;
            let digest = digest_value(&value)
                .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
            Ok::<_, ToolError>(ToolResponse::new(json!({ "sha256": digest.to_hex() })))
        }),
    );
}
