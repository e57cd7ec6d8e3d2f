//! # Recording Interceptor
//!
//! [`RecordingRegistry`] wraps any [`ToolRegistry`] so that every tool
//! registered through it seals exactly one receipt per call. Only
//! `register` is intercepted; every other method of the wrapped facility is
//! reached through `Deref`/`DerefMut`.
//!
//! ## Per-call sequence
//!
//! 1. Digest the arguments.
//! 2. Run the original handler on its own task and time it.
//! 3. Classify: `Ok` is a success; `Err` and panics are failures.
//! 4. Digest the output: the response payload, the error body, or the
//!    `null` marker when a panic left no output.
//! 5. Append an `invoke` receipt. A failed append is logged and dropped.
//! 6. Hand the original result back, or resume the original panic.
//!
//! Steps 2 through 5 run on a detached task. A caller that stops waiting
//! (a timeout, a dropped request, shutdown) does not stop the handler, and
//! the receipt is still sealed once the handler finishes. Before closing the
//! ledger, await [`PendingReceipts::settle`] so those late receipts land.
//!
//! Tools in [`EXEMPT_TOOLS`] are the ledger's own surface and are
//! registered untouched, so reading or recording receipts never records
//! itself.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;

use attest_core::{digest_value, CallerPrefix, NewReceipt};
use attest_ledger::Ledger;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::outcome::ToolError;
use crate::registry::{ToolDefinition, ToolFuture, ToolHandler, ToolRegistry};

/// Tools that are never recorded.
pub const EXEMPT_TOOLS: [&str; 4] = [
    "record_receipt",
    "list_receipts",
    "verify_chain",
    "receipt_summary",
];

/// Whether calls to `name` bypass recording.
pub fn is_exempt(name: &str) -> bool {
    EXEMPT_TOOLS.contains(&name)
}

/// Decorator that records every registered tool's calls in a [`Ledger`].
pub struct RecordingRegistry<R> {
    inner: R,
    ledger: Ledger,
    caller_prefix: Option<CallerPrefix>,
    pending: PendingReceipts,
}

/// Handle on the recordings still in progress for one [`RecordingRegistry`].
///
/// Each wrapped call holds a shared lock until its receipt is appended (or
/// the append fails); [`settle`](Self::settle) takes the exclusive lock.
#[derive(Clone, Default)]
pub struct PendingReceipts(Arc<RwLock<()>>);

impl PendingReceipts {
    /// Wait until every call started so far has finished recording.
    pub async fn settle(&self) {
        drop(self.0.write().await);
    }
}

impl<R> RecordingRegistry<R> {
    /// Wrap `inner`, recording into `ledger` under `caller_prefix`.
    pub fn new(inner: R, ledger: Ledger, caller_prefix: Option<CallerPrefix>) -> Self {
        Self {
            inner,
            ledger,
            caller_prefix,
            pending: PendingReceipts::default(),
        }
    }

    /// Handle for waiting on in-progress recordings.
    pub fn pending(&self) -> PendingReceipts {
        self.pending.clone()
    }

    /// The ledger receipts are written to.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Unwrap the decorated facility. Handlers already registered keep
    /// recording.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R> Deref for RecordingRegistry<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.inner
    }
}

impl<R> DerefMut for RecordingRegistry<R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

impl<R: ToolRegistry> ToolRegistry for RecordingRegistry<R> {
    fn register(&mut self, definition: ToolDefinition, handler: ToolHandler) {
        if is_exempt(&definition.name) {
            tracing::debug!(tool = %definition.name, "exempt from recording");
            self.inner.register(definition, handler);
            return;
        }
        let recorded = instrument(
            definition.name.clone(),
            handler,
            self.ledger.clone(),
            self.caller_prefix.clone(),
            self.pending.clone(),
        );
        self.inner.register(definition, recorded);
    }
}

fn instrument(
    tool: String,
    original: ToolHandler,
    ledger: Ledger,
    caller_prefix: Option<CallerPrefix>,
    pending: PendingReceipts,
) -> ToolHandler {
    let tool: Arc<str> = tool.into();
    Arc::new(move |args: Value| {
        let tool = Arc::clone(&tool);
        let original = Arc::clone(&original);
        let ledger = ledger.clone();
        let caller_prefix = caller_prefix.clone();
        let pending = Arc::clone(&pending.0);
        Box::pin(async move {
            let guard = pending.read_owned().await;
            let input_hash = digest_hex(&args);

            let recording = tokio::spawn(async move {
                let started = Instant::now();
                let joined = tokio::spawn(original(args)).await;
                let duration_ms =
                    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

                let (success, output_hash) = match &joined {
                    Ok(Ok(response)) => (true, digest_hex(response.payload())),
                    Ok(Err(error)) => (false, digest_hex(&error.to_value())),
                    Err(_) => (false, digest_hex(&Value::Null)),
                };

                let receipt = NewReceipt::invoke(
                    tool.as_ref(),
                    input_hash,
                    output_hash,
                    success,
                    duration_ms,
                )
                .with_caller_prefix(caller_prefix);
                if let Err(e) = ledger.append(receipt).await {
                    tracing::warn!(tool = %tool, error = %e, "failed to record receipt");
                }
                drop(guard);
                joined
            });

            match recording.await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) | Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Ok(Err(e)) | Err(e) => Err(ToolError::Internal(format!(
                    "tool task ended without a result: {e}"
                ))),
            }
        }) as ToolFuture
    })
}

fn digest_hex(value: &Value) -> String {
    match digest_value(value) {
        Ok(digest) => digest.to_hex(),
        Err(e) => {
            tracing::warn!(error = %e, "canonicalization failed; digesting null");
            digest_value(&Value::Null)
                .map(|d| d.to_hex())
                .unwrap_or_default()
        }
    }
}
