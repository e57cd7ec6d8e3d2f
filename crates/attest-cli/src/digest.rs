//! # Digest CLI: canonical SHA-256 of a JSON document.
//!
//! Prints the same digest the recorder stores as `input_hash` /
//! `output_hash`, so an operator holding a payload can match it to a
//! receipt.
//!
//! ```bash
//! attest digest request.json
//! echo '{"text":"hi"}' | attest digest
//! ```

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use attest_core::digest_value;
use clap::Args;
use serde_json::Value;

use crate::EXIT_OK;

/// Digest subcommand arguments.
#[derive(Args, Debug)]
pub struct DigestArgs {
    /// JSON file to digest. Reads stdin when omitted or `-`.
    pub file: Option<PathBuf>,
}

/// Execute the digest subcommand.
pub fn run_digest(args: &DigestArgs) -> Result<u8> {
    let text = match args.file.as_deref() {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("cannot read stdin")?;
            buf
        }
    };
    println!("{}", digest_json(&text)?);
    Ok(EXIT_OK)
}

/// Canonical digest of a JSON document, hex encoded.
pub fn digest_json(text: &str) -> Result<String> {
    let value: Value = serde_json::from_str(text).context("input is not valid JSON")?;
    Ok(digest_value(&value)?.to_hex())
}
