//! Signer selection from the environment.

use std::sync::Arc;

use url::Url;
use zeroize::Zeroizing;

use gatepass_core::AccountId;
use gatepass_ledger::Network;

use crate::agent::SigningAgent;
use crate::error::SigningError;
use crate::gateway::{SignerSession, SigningGateway};
use crate::intent::{IntentAgent, IntentConfig};
use crate::local::LocalKeyAgent;

/// Which signing protocol to use.
#[derive(Clone)]
pub enum SignerKind {
    /// Custodial key, hex-encoded 32-byte Ed25519 seed.
    Local { seed_hex: Zeroizing<String> },
    /// Remote intent wallet signing for `account`.
    Intent { url: Url, account: AccountId },
}

/// Signer configuration.
///
/// Custom `Debug` implementation redacts the seed.
#[derive(Clone)]
pub struct SignerConfig {
    pub kind: SignerKind,
}

impl std::fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            SignerKind::Local { .. } => f
                .debug_struct("SignerConfig")
                .field("kind", &"local")
                .field("seed_hex", &"[REDACTED]")
                .finish(),
            SignerKind::Intent { url, account } => f
                .debug_struct("SignerConfig")
                .field("kind", &"intent")
                .field("url", url)
                .field("account", account)
                .finish(),
        }
    }
}

impl SignerConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `GATEPASS_SIGNER` (`local` or `intent`; default: `local`)
    /// - `GATEPASS_SIGNER_SEED` (required for `local`, 64 hex chars)
    /// - `GATEPASS_SIGNER_URL` (required for `intent`)
    /// - `GATEPASS_SIGNER_ACCOUNT` (required for `intent`)
    pub fn from_env() -> Result<Self, SignerConfigError> {
        let kind = std::env::var("GATEPASS_SIGNER").unwrap_or_else(|_| "local".to_string());
        match kind.as_str() {
            "local" => {
                let seed = std::env::var("GATEPASS_SIGNER_SEED")
                    .map_err(|_| SignerConfigError::Missing("GATEPASS_SIGNER_SEED"))?;
                Ok(Self {
                    kind: SignerKind::Local {
                        seed_hex: Zeroizing::new(seed),
                    },
                })
            }
            "intent" => {
                let raw_url = std::env::var("GATEPASS_SIGNER_URL")
                    .map_err(|_| SignerConfigError::Missing("GATEPASS_SIGNER_URL"))?;
                let url = Url::parse(&raw_url).map_err(|e| {
                    SignerConfigError::InvalidUrl("GATEPASS_SIGNER_URL".into(), e.to_string())
                })?;
                let account = std::env::var("GATEPASS_SIGNER_ACCOUNT")
                    .map_err(|_| SignerConfigError::Missing("GATEPASS_SIGNER_ACCOUNT"))?;
                let account = AccountId::new(account)
                    .map_err(|e| SignerConfigError::InvalidAccount(e.to_string()))?;
                Ok(Self {
                    kind: SignerKind::Intent { url, account },
                })
            }
            other => Err(SignerConfigError::UnknownSigner(other.to_string())),
        }
    }

    /// Build the configured agent and wrap it in a session for `network`.
    pub fn session(&self, network: Network) -> Result<SignerSession, SigningError> {
        let (agent, account): (Arc<dyn SigningAgent>, AccountId) = match &self.kind {
            SignerKind::Local { seed_hex } => {
                let agent = LocalKeyAgent::from_seed_hex(seed_hex, network.clone())?;
                let account = agent.account_id();
                (Arc::new(agent), account)
            }
            SignerKind::Intent { url, account } => (
                Arc::new(IntentAgent::new(IntentConfig::new(url.clone()))?),
                account.clone(),
            ),
        };
        tracing::info!(agent = agent.agent_name(), account = %account, network = %network, "signer session ready");
        Ok(SignerSession::new(
            account,
            network,
            SigningGateway::new(agent),
        ))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignerConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid signer account: {0}")]
    InvalidAccount(String),
    #[error("unknown signer {0:?}; expected \"local\" or \"intent\"")]
    UnknownSigner(String),
}
