//! # Serve CLI: recorded tool server on stdio.
//!
//! Reads one JSON request per line from stdin and writes one JSON response
//! per line to stdout. Every tool except the ledger's own is wrapped by the
//! recorder.
//!
//! If the ledger cannot be opened the server still runs, without auditing
//! and without the receipt tools; the failure is logged once.
//!
//! The ledger is closed exactly once on every exit path: end of input,
//! Ctrl-C, SIGTERM, or an I/O error. Calls still running at that point get
//! a short grace period to seal their receipts first.

use std::time::Duration;

use anyhow::Result;
use attest_core::CallerPrefix;
use attest_ledger::{Ledger, LedgerConfig};
use attest_tools::protocol::handle_line;
use attest_tools::{
    register_builtin_tools, register_receipt_tools, PendingReceipts, RecordingRegistry,
    ToolServer,
};
use clap::Args;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::EXIT_OK;

/// `attest serve` arguments.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Serve without opening the ledger (no receipts are written).
    #[arg(long)]
    pub no_audit: bool,
}

/// How long shutdown waits for in-flight calls to seal their receipts.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Build the tool table. With a ledger, every tool is registered through
/// the recorder and the returned handle tracks its in-flight recordings;
/// without one, tools are registered directly.
pub fn build_server(
    ledger: Option<&Ledger>,
    caller_prefix: Option<CallerPrefix>,
) -> (ToolServer, Option<PendingReceipts>) {
    match ledger {
        Some(ledger) => {
            let mut registry =
                RecordingRegistry::new(ToolServer::new(), ledger.clone(), caller_prefix);
            register_receipt_tools(&mut registry, ledger);
            register_builtin_tools(&mut registry);
            let pending = registry.pending();
            (registry.into_inner(), Some(pending))
        }
        None => {
            let mut server = ToolServer::new();
            register_builtin_tools(&mut server);
            (server, None)
        }
    }
}

/// Execute `attest serve`.
pub async fn run_serve(
    args: &ServeArgs,
    config: &LedgerConfig,
    caller_prefix: Option<CallerPrefix>,
) -> Result<u8> {
    let ledger = if args.no_audit {
        None
    } else {
        match crate::open_ledger(config).await {
            Ok(ledger) => Some(ledger),
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "auditing disabled for this session");
                None
            }
        }
    };

    let (server, pending) = build_server(ledger.as_ref(), caller_prefix);
    tracing::info!(tools = server.len(), audited = ledger.is_some(), "serving on stdio");

    let served = tokio::select! {
        res = serve_lines(&server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()) => res,
        signal = shutdown_signal() => {
            signal.map(|name| tracing::info!(signal = name, "shutting down"))
        }
    };

    if let Some(pending) = &pending {
        if tokio::time::timeout(SHUTDOWN_GRACE, pending.settle()).await.is_err() {
            tracing::warn!("in-flight calls did not finish; their receipts are lost");
        }
    }
    if let Some(ledger) = &ledger {
        ledger.close().await;
    }
    served.map(|()| EXIT_OK)
}

/// Resolves with the signal's name on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() -> Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.map(|()| "SIGINT").map_err(Into::into),
            _ = terminate.recv() => Ok("SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("ctrl-c")
    }
}

/// Answer each request line until `reader` is exhausted. Blank lines are
/// skipped.
pub async fn serve_lines<R, W>(server: &ToolServer, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(server, &line).await;
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_ledger::ListFilter;
    use serde_json::Value;

    fn responses(out: &[u8]) -> Vec<Value> {
        out.split(|b| *b == b'\n')
            .filter(|l| !l.is_empty())
            .map(|l| serde_json::from_slice(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn unaudited_server_has_only_builtins() {
        let (server, pending) = build_server(None, None);
        assert!(pending.is_none());
        assert!(server.contains("hash_text"));
        assert!(!server.contains("list_receipts"));
    }

    #[tokio::test]
    async fn serves_lines_and_records_calls() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::open(&LedgerConfig::at(dir.path().join("r.db")))
            .await
            .unwrap();
        let (server, pending) =
            build_server(Some(&ledger), CallerPrefix::redact("key_0123456789abcdef"));

        let input = concat!(
            "{\"id\":1,\"method\":\"tools/call\",\"params\":{\"name\":\"hash_text\",\"arguments\":{\"text\":\"a\"}}}\n",
            "\n",
            "{\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"verify_chain\"}}\n",
        );
        let mut out = Vec::new();
        serve_lines(&server, input.as_bytes(), &mut out).await.unwrap();

        let resp = responses(&out);
        assert_eq!(resp.len(), 2);
        assert_eq!(resp[0]["id"], 1);
        assert_eq!(resp[1]["result"]["valid"], true);
        assert_eq!(resp[1]["result"]["receiptsChecked"], 1);

        pending.unwrap().settle().await;
        let stored = ledger.list(&ListFilter::default()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].tool, "hash_text");
        assert_eq!(stored[0].caller_prefix.as_ref().unwrap().as_str(), "key_0123...");
        ledger.close().await;
    }
}
