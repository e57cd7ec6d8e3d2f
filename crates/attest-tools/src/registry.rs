//! # Tool Registration
//!
//! [`ToolRegistry`] is the single capability the recorder intercepts:
//! registering a named tool with its handler. [`ToolServer`] is the
//! in-process implementation used by the CLI and tests; it also dispatches
//! calls by name.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::outcome::{ToolError, ToolResult};

/// Boxed future returned by a tool handler.
pub type ToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send + 'static>>;

/// Type-erased async tool handler taking the call arguments.
pub type ToolHandler = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// Box an async closure into a [`ToolHandler`].
pub fn handler<F, Fut>(f: F) -> ToolHandler
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult> + Send + 'static,
{
    Arc::new(move |args| -> ToolFuture { Box::pin(f(args)) })
}

/// Name, description, and JSON Schema of a tool's input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique name callers dispatch on.
    pub name: String,
    /// Human-readable summary shown in `tools/list`.
    pub description: String,
    /// JSON Schema the call arguments are expected to match.
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Build a definition from its three parts.
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// A facility tools can be registered with.
pub trait ToolRegistry {
    /// Register `handler` under `definition.name`.
    fn register(&mut self, definition: ToolDefinition, handler: ToolHandler);
}

impl<R: ToolRegistry + ?Sized> ToolRegistry for &mut R {
    fn register(&mut self, definition: ToolDefinition, handler: ToolHandler) {
        (**self).register(definition, handler);
    }
}

struct RegisteredTool {
    definition: ToolDefinition,
    handler: ToolHandler,
}

/// In-process tool table with name-based dispatch.
#[derive(Default)]
pub struct ToolServer {
    tools: BTreeMap<String, RegisteredTool>,
}

impl std::fmt::Debug for ToolServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolServer")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolServer {
    /// An empty tool table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke the tool registered as `name`.
    pub async fn call(&self, name: &str, args: Value) -> ToolResult {
        let handler = self
            .tools
            .get(name)
            .map(|tool| Arc::clone(&tool.handler))
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        handler(args).await
    }

    /// Definitions of all registered tools, sorted by name.
    pub fn definitions(&self) -> Vec<&ToolDefinition> {
        self.tools.values().map(|t| &t.definition).collect()
    }

    /// Whether a tool is registered as `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl ToolRegistry for ToolServer {
    fn register(&mut self, definition: ToolDefinition, handler: ToolHandler) {
        let name = definition.name.clone();
        let replaced = self
            .tools
            .insert(
                name.clone(),
                RegisteredTool {
                    definition,
                    handler,
                },
            )
            .is_some();
        if replaced {
            tracing::warn!(tool = %name, "tool re-registered; previous handler replaced");
        } else {
            tracing::debug!(tool = %name, "tool registered");
        }
    }
}
