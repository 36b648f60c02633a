//! # gatepass CLI entry point

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gatepass_cli::issue::{run_issue, IssueArgs};
use gatepass_cli::keys::{run_digest, run_keygen, DigestArgs, KeygenArgs};
use gatepass_cli::verify::{run_verify, VerifyArgs};

/// Issue and verify ledger-anchored gate passes.
#[derive(Parser, Debug)]
#[command(name = "gatepass", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Issue a pass from a document image.
    Issue(IssueArgs),

    /// Verify a scanned QR payload against the ledger.
    Verify(VerifyArgs),

    /// Generate an Ed25519 signer seed and account id.
    Keygen(KeygenArgs),

    /// Print the identity digest for an identity number.
    Digest(DigestArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Issue(args) => run_issue(&args).await,
        Commands::Verify(args) => run_verify(&args).await,
        Commands::Keygen(args) => run_keygen(&args),
        Commands::Digest(args) => run_digest(&args),
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
