//! # gatepass-cli: Command-Line Tool
//!
//! ## Subcommands
//!
//! - `gatepass issue`: issue a pass from a document image, either against
//!   the configured ledger gateway or fully offline on an in-memory ledger.
//! - `gatepass verify`: verify a scanned QR payload against the ledger.
//! - `gatepass keygen`: generate an Ed25519 signer seed and its account id.
//! - `gatepass digest`: compute the identity digest for an identity number.
//!
//! ```bash
//! gatepass issue --image card.jpg --name "Asha Rao" --aadhaar 234567897812
//! gatepass verify --qr @scan.json
//! ```

pub mod issue;
pub mod keys;
pub mod verify;

use std::path::Path;

use anyhow::{Context, Result};

/// Read an argument that is either inline text or `@path` to a file.
pub fn read_inline_or_file(arg: &str) -> Result<Vec<u8>> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read(Path::new(path))
            .with_context(|| format!("failed to read {path}")),
        None => Ok(arg.as_bytes().to_vec()),
    }
}

/// Pretty-print a value as JSON on stdout.
pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to render JSON")?;
    println!("{text}");
    Ok(())
}
