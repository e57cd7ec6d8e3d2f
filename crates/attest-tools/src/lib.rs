//! # attest-tools: Tool Registration and Call Recording
//!
//! Connects arbitrary async tools to the receipt ledger without the tools
//! knowing about auditing.
//!
//! ## Architecture
//!
//! - **Registry** (`registry.rs`): the [`ToolRegistry`] trait, the type-erased
//!   [`ToolHandler`], and [`ToolServer`], an in-process implementation with
//!   name-based dispatch.
//!
//! - **Outcome** (`outcome.rs`): [`ToolResult`], a two-variant result. A
//!   call either returned a [`ToolResponse`] or failed with a [`ToolError`].
//!
//! - **Recorder** (`recorder.rs`): [`RecordingRegistry`], a decorator over
//!   any registry that seals one receipt per call of every non-exempt tool.
//!
//! - **Receipt tools** (`receipt_tools.rs`): `record_receipt`,
//!   `list_receipts`, `verify_chain`, `receipt_summary`.
//!
//! - **Builtins** (`builtin.rs`): local hashing tools.
//!
//! - **Protocol** (`protocol.rs`): newline-delimited JSON request dispatch.
//!
//! ## Failure Classification
//!
//! A call succeeded if and only if its handler returned `Ok`. Every
//! `ToolError` variant and every panic is recorded as a failure. Recording
//! is best-effort: a ledger error is logged and never changes what the
//! caller sees.

pub mod builtin;
pub mod outcome;
pub mod protocol;
pub mod receipt_tools;
pub mod recorder;
pub mod registry;

pub use builtin::register_builtin_tools;
pub use outcome::{ToolError, ToolResponse, ToolResult};
pub use receipt_tools::{register_receipt_tools, ReceiptPage, RecordArgs};
pub use recorder::{is_exempt, PendingReceipts, RecordingRegistry, EXEMPT_TOOLS};
pub use registry::{handler, ToolDefinition, ToolFuture, ToolHandler, ToolRegistry, ToolServer};
