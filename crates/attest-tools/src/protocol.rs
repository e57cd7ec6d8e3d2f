//! Newline-delimited JSON request handling for a [`ToolServer`].
//!
//! One request per line:
//!
//! ```json
//! {"id": 1, "method": "tools/list"}
//! {"id": 2, "method": "tools/call", "params": {"name": "hash_text", "arguments": {"text": "hi"}}}
//! ```
//!
//! Each produces one response line carrying the same `id` and either a
//! `result` or an `error` object.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::registry::ToolServer;

/// A decoded request line.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// A response line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Response {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, kind: &str, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(json!({ "kind": kind, "message": message.into() })),
        }
    }
}

/// Decode and dispatch one request line.
pub async fn handle_line(server: &ToolServer, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => handle(server, request).await,
        Err(e) => Response::err(Value::Null, "parse_error", e.to_string()),
    }
}

/// Dispatch a decoded request.
pub async fn handle(server: &ToolServer, request: Request) -> Response {
    let Request { id, method, params } = request;
    match method.as_str() {
        "tools/list" => Response::ok(id, json!({ "tools": server.definitions() })),
        "tools/call" => {
            let params: CallParams = match serde_json::from_value(params) {
                Ok(p) => p,
                Err(e) => return Response::err(id, "invalid_params", e.to_string()),
            };
            match server.call(&params.name, params.arguments).await {
                Ok(response) => Response::ok(id, response.into_payload()),
                Err(error) => Response {
                    id,
                    result: None,
                    error: Some(error.to_value()),
                },
            }
        }
        other => Response::err(id, "unknown_method", format!("unknown method: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::register_builtin_tools;

    fn server() -> ToolServer {
        let mut server = ToolServer::new();
        register_builtin_tools(&mut server);
        server
    }

    #[tokio::test]
    async fn lists_tools() {
        let resp = handle_line(&server(), r#"{"id":1,"method":"tools/list"}"#).await;
        assert_eq!(resp.id, json!(1));
        let tools = resp.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 2);
    }

    #[tokio::test]
    async fn calls_a_tool() {
        let line = r#"{"id":"a","method":"tools/call","params":{"name":"hash_text","arguments":{"text":""}}}"#;
        let resp = handle_line(&server(), line).await;
        assert_eq!(
            resp.result.unwrap()["sha256"],
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn reports_errors_in_band() {
        let resp = handle_line(&server(), "not json").await;
        assert_eq!(resp.error.unwrap()["kind"], "parse_error");

        let line = r#"{"id":3,"method":"tools/call","params":{"name":"nope"}}"#;
        let resp = handle_line(&server(), line).await;
        assert_eq!(resp.error.unwrap()["kind"], "unknown_tool");

        let resp = handle_line(&server(), r#"{"id":4,"method":"shutdown"}"#).await;
        assert_eq!(resp.error.unwrap()["kind"], "unknown_method");
    }
}
