//! # Issue Subcommand
//!
//! Two modes:
//!
//! - `--ledger horizon`: extraction, pinning, signer and ledger gateway all
//!   come from the environment. The resulting pass is durable.
//! - `--ledger memory` (default): nothing leaves the process. Facts come
//!   from `--name` and `--aadhaar`, the photo is pinned in memory and the
//!   transaction lands on an in-memory ledger. The pass is verified
//!   immediately since the ledger disappears when the command exits.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;
use url::Url;

use gatepass_clients::{
    digest_key_from_env, HttpExtractionClient, InMemoryPinner, PinataClient, ServiceConfig,
    StaticExtractor,
};
use gatepass_core::{AccountId, DigestKey, IdentityFacts, PassRecord, Timestamp};
use gatepass_ledger::{HorizonClient, HorizonConfig, InMemoryLedger, Network};
use gatepass_protocol::{
    IssuedPass, PassIssuer, SubmissionCoordinator, TransactionBuilder, VerificationEngine,
    VerificationVerdict,
};
use gatepass_signing::{LocalKeyAgent, SignerConfig, SignerSession, SigningGateway};

/// Digest key used offline when `GATEPASS_DIGEST_KEY` is unset.
const OFFLINE_DIGEST_KEY: &[u8] = b"gatepass-offline";
const OFFLINE_GATEWAY: &str = "https://gateway.pinata.cloud";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LedgerKind {
    Memory,
    Horizon,
}

#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Path to the identity document image.
    #[arg(long)]
    pub image: PathBuf,
    #[arg(long, value_enum, default_value_t = LedgerKind::Memory)]
    pub ledger: LedgerKind,
    /// Holder name (offline mode).
    #[arg(long)]
    pub name: Option<String>,
    /// Identity number (offline mode). Digested before use.
    #[arg(long)]
    pub aadhaar: Option<String>,
    /// Issue from this account instead of the signer's own.
    #[arg(long)]
    pub account: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IssueOutput {
    pub pass: PassRecord,
    pub qr_payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Present in offline mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<VerificationVerdict>,
}

impl IssueOutput {
    fn new(issued: IssuedPass, verdict: Option<VerificationVerdict>) -> Self {
        Self {
            qr_payload: issued.qr_payload.to_json(),
            pass: issued.record,
            photo_url: issued.photo_url,
            verdict,
        }
    }
}

pub async fn run_issue(args: &IssueArgs) -> Result<u8> {
    let image = std::fs::read(&args.image)
        .with_context(|| format!("failed to read image {}", args.image.display()))?;
    let output = match args.ledger {
        LedgerKind::Memory => {
            let (Some(name), Some(aadhaar)) = (&args.name, &args.aadhaar) else {
                bail!("offline issuance needs --name and --aadhaar");
            };
            let key = digest_key_from_env().unwrap_or_else(|_| {
                tracing::warn!("GATEPASS_DIGEST_KEY unset; using the offline digest key");
                DigestKey::new(OFFLINE_DIGEST_KEY.to_vec())
            });
            let facts = IdentityFacts {
                full_name: name.clone(),
                identity_digest: crate::keys::digest_of(aadhaar, &key)?,
                issued_at: Timestamp::now(),
            };
            issue_offline(&image, facts, offline_agent()?).await?
        }
        LedgerKind::Horizon => issue_online(&image, args.account.as_deref()).await?,
    };
    crate::print_json(&output)?;
    Ok(0)
}

fn offline_agent() -> Result<LocalKeyAgent> {
    match std::env::var("GATEPASS_SIGNER_SEED") {
        Ok(seed) => Ok(LocalKeyAgent::from_seed_hex(&seed, Network::Testnet)?),
        Err(_) => Ok(LocalKeyAgent::generate(Network::Testnet)),
    }
}

/// Issue and verify on a throwaway in-memory ledger.
pub async fn issue_offline(
    image: &[u8],
    facts: IdentityFacts,
    agent: LocalKeyAgent,
) -> Result<IssueOutput> {
    let network = agent.network().clone();
    let account = agent.account_id();
    let ledger = Arc::new(InMemoryLedger::new(network.clone()).with_account(account.clone(), 0));
    let pinner = Arc::new(InMemoryPinner::new(Url::parse(OFFLINE_GATEWAY)?));
    let issuer = PassIssuer::new(
        Arc::new(StaticExtractor::new(facts)),
        pinner,
        ledger.clone(),
        TransactionBuilder::new(network.clone()),
        SubmissionCoordinator::new(ledger.clone()),
    );
    let session = SignerSession::new(account, network, SigningGateway::new(Arc::new(agent)));

    let issued = issuer.issue_pass(image, &session).await?;
    let verdict = VerificationEngine::new(ledger)
        .verify_pass(issued.qr_payload.to_json().as_bytes())
        .await?;
    Ok(IssueOutput::new(issued, Some(verdict)))
}

async fn issue_online(image: &[u8], account: Option<&str>) -> Result<IssueOutput> {
    let horizon_config = HorizonConfig::from_env().context("ledger configuration")?;
    let network = horizon_config.network.clone();
    let horizon = Arc::new(HorizonClient::new(horizon_config)?);
    let services = ServiceConfig::from_env().context("service configuration")?;
    let mut session = SignerConfig::from_env()
        .context("signer configuration")?
        .session(network.clone())?;
    if let Some(account) = account {
        session = SignerSession::new(
            AccountId::new(account)?,
            network.clone(),
            session.gateway().clone(),
        );
    }

    let issuer = PassIssuer::new(
        Arc::new(HttpExtractionClient::new(&services)?),
        Arc::new(PinataClient::new(&services)?),
        horizon.clone(),
        TransactionBuilder::new(network),
        SubmissionCoordinator::new(horizon),
    );
    let issued = issuer.issue_pass(image, &session).await?;
    Ok(IssueOutput::new(issued, None))
}
