//! # Key and Digest Subcommands
//!
//! `keygen` prints a fresh custodial signer seed. `digest` computes the
//! identity digest that would be anchored for an identity number, which is
//! useful when checking a pass by hand. The number is read from stdin
//! unless given on the command line, where it would be visible in the
//! process list and shell history.

use std::io::BufRead;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use gatepass_core::{AadhaarNumber, DigestKey, IdentityDigest};
use gatepass_ledger::Network;
use gatepass_signing::LocalKeyAgent;

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Network the key will sign for (`testnet`, `public`, or a passphrase).
    #[arg(long, default_value = "testnet")]
    pub network: String,
}

#[derive(Args, Debug)]
pub struct DigestArgs {
    /// Identity number. Defaults to `-`, which reads it from stdin.
    #[arg(value_name = "AADHAAR", default_value = "-")]
    pub aadhaar: String,
}

#[derive(Debug, Serialize)]
pub struct GeneratedKey {
    pub account_id: String,
    pub public_key: String,
    pub seed_hex: String,
    pub network: String,
}

pub fn generate_key(network: Network) -> Result<GeneratedKey> {
    let agent = LocalKeyAgent::generate(network);
    Ok(GeneratedKey {
        account_id: agent.account_id().to_string(),
        public_key: agent.public_key_hex(),
        seed_hex: agent.seed_hex().to_string(),
        network: agent.network().name().to_string(),
    })
}

pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let network = Network::from_name(&args.network)
        .with_context(|| format!("unknown network {:?}", args.network))?;
    let key = generate_key(network)?;
    crate::print_json(&key)?;
    eprintln!("Store seed_hex as GATEPASS_SIGNER_SEED. It is not shown again.");
    Ok(0)
}

pub fn digest_of(raw: &str, key: &DigestKey) -> Result<IdentityDigest> {
    let number = AadhaarNumber::parse(raw).context("invalid identity number")?;
    Ok(IdentityDigest::derive(&number, key))
}

/// The identity number from the arguments, or the first line of `input`.
pub fn identity_number(args: &DigestArgs, mut input: impl BufRead) -> Result<String> {
    if args.aadhaar != "-" {
        tracing::warn!("identity number given as an argument; omit it to read from stdin");
        return Ok(args.aadhaar.clone());
    }
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read identity number from stdin")?;
    Ok(line)
}

pub fn run_digest(args: &DigestArgs) -> Result<u8> {
    let key = gatepass_clients::digest_key_from_env()?;
    let raw = identity_number(args, std::io::stdin().lock())?;
    println!("{}", digest_of(&raw, &key)?);
    Ok(0)
}
