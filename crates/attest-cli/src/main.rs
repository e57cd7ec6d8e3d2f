//! # attest CLI entry point
//!
//! Parses command-line arguments, installs logging, resolves the ledger
//! location, and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use attest_cli::digest::{run_digest, DigestArgs};
use attest_cli::logging::{self, LogFormat};
use attest_cli::receipts::{
    run_list, run_record, run_summary, run_verify, ListArgs, RecordArgs, ReportArgs,
};
use attest_cli::serve::{run_serve, ServeArgs};
use attest_cli::{caller_prefix, ledger_config, open_ledger, CALLER_KEY_ENV};
use attest_core::CallerPrefix;
use attest_ledger::{LedgerConfig, LEDGER_PATH_ENV};

/// Tamper-evident receipt ledger for tool calls.
///
/// Every recorded call is sealed into a SHA-256 hash chain stored in a local
/// SQLite database. `verify` detects any edit, deletion, or reordering.
#[derive(Parser, Debug)]
#[command(name = "attest", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log line format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Path to the receipt database.
    #[arg(long, env = LEDGER_PATH_ENV, global = true)]
    ledger: Option<PathBuf>,

    /// Caller credential; only a redacted prefix is ever stored.
    #[arg(long, env = CALLER_KEY_ENV, hide_env_values = true, global = true)]
    caller_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List receipts in chain order.
    List(ListArgs),

    /// Verify the whole hash chain. Exits 2 if it is broken.
    Verify(ReportArgs),

    /// Aggregate statistics over the ledger.
    Summary(ReportArgs),

    /// Manually append a receipt.
    Record(RecordArgs),

    /// Canonical SHA-256 digest of a JSON document.
    Digest(DigestArgs),

    /// Serve tools over stdio, recording every call.
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format);

    let config = ledger_config(cli.ledger);
    let caller = caller_prefix(cli.caller_key.as_deref());
    tracing::debug!(ledger = %config.resolve_path().display(), "attest starting");

    let result = match cli.command {
        Commands::Digest(args) => run_digest(&args),
        Commands::Serve(args) => run_serve(&args, &config, caller).await,
        command => run_with_ledger(command, &config, caller).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

/// Open the ledger, run `command`, and close the ledger whatever the outcome.
async fn run_with_ledger(
    command: Commands,
    config: &LedgerConfig,
    caller: Option<CallerPrefix>,
) -> Result<u8> {
    let ledger = open_ledger(config).await?;
    let result = match &command {
        Commands::List(args) => run_list(args, &ledger).await,
        Commands::Verify(args) => run_verify(args, &ledger).await,
        Commands::Summary(args) => run_summary(args, &ledger).await,
        Commands::Record(args) => run_record(args, &ledger, caller).await,
        Commands::Digest(_) | Commands::Serve(_) => {
            Err(anyhow::anyhow!("subcommand does not operate on an open ledger"))
        }
    };
    ledger.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_list_with_filters() {
        let cli = Cli::try_parse_from([
            "attest", "list", "--tool", "hash_text", "--limit", "5", "--offset", "-1", "--json",
        ])
        .unwrap();
        if let Commands::List(args) = cli.command {
            assert_eq!(args.tool.as_deref(), Some("hash_text"));
            assert_eq!(args.limit, Some(5));
            assert_eq!(args.offset, Some(-1));
            assert!(args.json);
            assert!(args.since.is_none());
        } else {
            panic!("expected list");
        }
    }

    #[test]
    fn cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "attest",
            "verify",
            "--ledger",
            "/tmp/r.db",
            "-vv",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.ledger, Some(PathBuf::from("/tmp/r.db")));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(matches!(cli.command, Commands::Verify(_)));
    }

    #[test]
    fn cli_parse_record_defaults() {
        let cli = Cli::try_parse_from([
            "attest",
            "record",
            "--tool",
            "deploy",
            "--input-hash",
            "aa",
            "--output-hash",
            "bb",
        ])
        .unwrap();
        if let Commands::Record(args) = cli.command {
            assert_eq!(args.duration_ms, 0);
            assert!(!args.failed);
            assert!(args.policy_ref.is_none());
        } else {
            panic!("expected record");
        }
    }

    #[test]
    fn cli_parse_record_requires_hashes() {
        assert!(Cli::try_parse_from(["attest", "record", "--tool", "deploy"]).is_err());
    }

    #[test]
    fn cli_parse_digest_and_serve() {
        let cli = Cli::try_parse_from(["attest", "digest", "doc.json"]).unwrap();
        if let Commands::Digest(args) = cli.command {
            assert_eq!(args.file, Some(PathBuf::from("doc.json")));
        }
        let cli = Cli::try_parse_from(["attest", "serve", "--no-audit"]).unwrap();
        if let Commands::Serve(args) = cli.command {
            assert!(args.no_audit);
        }
    }

    #[test]
    fn cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["attest"]).is_err());
    }
}
