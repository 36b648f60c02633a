//! # Verify Subcommand

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use gatepass_ledger::{HorizonClient, HorizonConfig, LedgerRpc};
use gatepass_protocol::{VerificationEngine, VerificationVerdict};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// QR payload JSON, or `@path` to a file holding it.
    #[arg(long)]
    pub qr: String,
    /// Only accept passes issued by this account. Repeatable.
    #[arg(long = "trusted-issuer")]
    pub trusted_issuers: Vec<String>,
}

/// Exit code for a verdict: 0 when valid, 2 otherwise.
pub fn exit_code(verdict: &VerificationVerdict) -> u8 {
    if verdict.is_valid() {
        0
    } else {
        2
    }
}

pub async fn verify_with(
    rpc: Arc<dyn LedgerRpc>,
    qr: &[u8],
    trusted_issuers: &[String],
) -> Result<VerificationVerdict> {
    let mut engine = VerificationEngine::new(rpc);
    if !trusted_issuers.is_empty() {
        engine = engine.with_trusted_issuers(trusted_issuers.iter().cloned());
    }
    Ok(engine.verify_pass(qr).await?)
}

pub async fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let qr = crate::read_inline_or_file(&args.qr)?;
    let config = HorizonConfig::from_env().context("ledger configuration")?;
    tracing::info!(horizon = %config.horizon_url, "verifying against ledger gateway");
    let horizon = Arc::new(HorizonClient::new(config)?);
    let verdict = verify_with(horizon, &qr, &args.trusted_issuers).await?;
    crate::print_json(&verdict)?;
    Ok(exit_code(&verdict))
}
