//! # gatepass-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Verification is always available;
//! issuance is enabled when the extraction, pinning and signer settings are
//! present in the environment.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use gatepass_api::{AppConfig, AppState};
use gatepass_clients::{HttpExtractionClient, PinataClient, ServiceConfig};
use gatepass_ledger::{HorizonClient, HorizonConfig, Network};
use gatepass_protocol::{PassIssuer, SubmissionCoordinator, TransactionBuilder, VerificationEngine};
use gatepass_signing::SignerConfig;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("GATEPASS_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn verifier(horizon: Arc<HorizonClient>) -> VerificationEngine {
    let mut engine = VerificationEngine::new(horizon);
    if let Some(secs) = std::env::var("GATEPASS_PASS_VALIDITY_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
    {
        engine = engine.with_validity(Duration::from_secs(secs));
    }
    if let Ok(list) = std::env::var("GATEPASS_TRUSTED_ISSUERS") {
        let accounts: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(String::from)
            .collect();
        if !accounts.is_empty() {
            tracing::info!(count = accounts.len(), "restricting verification to trusted issuers");
            engine = engine.with_trusted_issuers(accounts);
        }
    }
    engine
}

fn issuer(horizon: Arc<HorizonClient>, network: &Network) -> anyhow::Result<PassIssuer> {
    let services = ServiceConfig::from_env()?;
    Ok(PassIssuer::new(
        Arc::new(HttpExtractionClient::new(&services)?),
        Arc::new(PinataClient::new(&services)?),
        horizon.clone(),
        TransactionBuilder::new(network.clone()),
        SubmissionCoordinator::new(horizon),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env();
    let horizon_config = HorizonConfig::from_env().context("ledger configuration")?;
    let network = horizon_config.network.clone();
    tracing::info!(horizon = %horizon_config.horizon_url, network = %network, "ledger gateway configured");
    let horizon = Arc::new(HorizonClient::new(horizon_config).context("ledger client")?);

    let mut state = AppState::new(config.clone(), verifier(horizon.clone()));

    let signer = SignerConfig::from_env()
        .map_err(anyhow::Error::from)
        .and_then(|cfg| Ok(cfg.session(network.clone())?));
    match (issuer(horizon, &network), signer) {
        (Ok(issuer), Ok(session)) => {
            tracing::info!(agent = session.gateway().agent_name(), "issuance enabled");
            state = state.with_issuance(issuer, session);
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("issuance not configured: {e:#}. POST /v1/passes will return 503.");
        }
    }

    let app = gatepass_api::app(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("gatepass API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
