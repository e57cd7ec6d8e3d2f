//! # Receipt CLI: list, verify, summarize, and record.
//!
//! Every subcommand here operates on an open [`Ledger`]. Output is a plain
//! table by default and JSON with `--json`.

use anyhow::Result;
use attest_core::{Action, CallerPrefix, NewReceipt, Receipt};
use attest_ledger::{Ledger, ListFilter};
use attest_tools::ReceiptPage;
use clap::Args;
use serde::Serialize;

use crate::{EXIT_CHAIN_BROKEN, EXIT_OK};

/// `attest list` arguments.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only receipts for this tool.
    #[arg(long)]
    pub tool: Option<String>,

    /// Inclusive lower bound (RFC 3339).
    #[arg(long)]
    pub since: Option<String>,

    /// Inclusive upper bound (RFC 3339).
    #[arg(long)]
    pub until: Option<String>,

    /// Page size (clamped to 1..=1000).
    #[arg(long)]
    pub limit: Option<i64>,

    /// Receipts to skip.
    #[arg(long, allow_hyphen_values = true)]
    pub offset: Option<i64>,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    fn filter(&self) -> ListFilter {
        ListFilter {
            tool: self.tool.clone(),
            since: self.since.clone(),
            until: self.until.clone(),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// `attest verify` / `attest summary` arguments.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// `attest record` arguments.
#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Operation name.
    #[arg(long)]
    pub tool: String,

    /// What happened to the operation.
    #[arg(long, value_enum, default_value_t = ActionArg::Invoke)]
    pub action: ActionArg,

    /// Digest of the operation's input.
    #[arg(long)]
    pub input_hash: String,

    /// Digest of the operation's output.
    #[arg(long)]
    pub output_hash: String,

    /// Record the operation as failed.
    #[arg(long)]
    pub failed: bool,

    /// Operation duration in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub duration_ms: u64,

    /// Policy under which the decision was taken.
    #[arg(long)]
    pub policy_ref: Option<String>,
}

/// CLI spelling of [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ActionArg {
    Invoke,
    Block,
}

impl From<ActionArg> for Action {
    fn from(a: ActionArg) -> Self {
        match a {
            ActionArg::Invoke => Action::Invoke,
            ActionArg::Block => Action::Block,
        }
    }
}

impl RecordArgs {
    fn to_new_receipt(&self, caller_prefix: Option<CallerPrefix>) -> NewReceipt {
        let new = NewReceipt::invoke(
            &self.tool,
            &self.input_hash,
            &self.output_hash,
            !self.failed,
            self.duration_ms,
        )
        .with_action(self.action.into())
        .with_caller_prefix(caller_prefix);
        match &self.policy_ref {
            Some(policy_ref) => new.with_policy_ref(policy_ref),
            None => new,
        }
    }
}

/// Execute `attest list`.
pub async fn run_list(args: &ListArgs, ledger: &Ledger) -> Result<u8> {
    let receipts = ledger.list(&args.filter()).await?;
    if args.json {
        print_json(&ReceiptPage {
            count: receipts.len(),
            receipts,
        })?;
    } else {
        for receipt in &receipts {
            println!("{}", table_row(receipt));
        }
        println!();
        println!("{} receipt(s)", receipts.len());
    }
    Ok(EXIT_OK)
}

/// Execute `attest verify`.
pub async fn run_verify(args: &ReportArgs, ledger: &Ledger) -> Result<u8> {
    let verification = ledger.verify_chain().await?;
    if args.json {
        print_json(&verification)?;
    } else if verification.valid {
        println!("chain valid: {} receipt(s) checked", verification.receipts_checked);
    } else {
        let at = verification
            .broken_at
            .as_ref()
            .map_or("<unknown>", |id| id.as_str());
        println!(
            "chain BROKEN at {at} after {} valid receipt(s)",
            verification.receipts_checked
        );
    }
    if verification.valid {
        Ok(EXIT_OK)
    } else {
        tracing::warn!(broken_at = ?verification.broken_at, "receipt chain failed verification");
        Ok(EXIT_CHAIN_BROKEN)
    }
}

/// Execute `attest summary`.
pub async fn run_summary(args: &ReportArgs, ledger: &Ledger) -> Result<u8> {
    let summary = ledger.summary().await?;
    if args.json {
        print_json(&summary)?;
        return Ok(EXIT_OK);
    }
    println!("total:        {}", summary.total);
    println!("success rate: {:.1}%", summary.success_rate * 100.0);
    println!("chain valid:  {}", summary.chain_valid);
    if let (Some(first), Some(last)) = (&summary.first_timestamp, &summary.last_timestamp) {
        println!("range:        {first} .. {last}");
    }
    for (tool, count) in &summary.by_tool {
        println!("  {tool:<32} {count}");
    }
    Ok(EXIT_OK)
}

/// Execute `attest record`.
pub async fn run_record(
    args: &RecordArgs,
    ledger: &Ledger,
    caller_prefix: Option<CallerPrefix>,
) -> Result<u8> {
    let receipt = ledger.append(args.to_new_receipt(caller_prefix)).await?;
    print_json(&receipt)?;
    Ok(EXIT_OK)
}

fn table_row(r: &Receipt) -> String {
    format!(
        "{}  {}  {:<6} {:<24} {:<4} {:>6}ms  {}",
        r.timestamp,
        r.id,
        r.action,
        r.tool,
        if r.success { "ok" } else { "FAIL" },
        r.duration_ms,
        &r.chain_hash[..r.chain_hash.len().min(12)],
    )
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
