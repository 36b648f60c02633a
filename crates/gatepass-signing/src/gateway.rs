//! # Signing Gateway and Signer Sessions
//!
//! The gateway is a pass-through with two post-conditions on the agent's
//! answer: the envelope was signed for the requested network, and it embeds
//! the exact bytes that were handed out. Entry content is never parsed
//! here.

use std::sync::Arc;

use gatepass_core::AccountId;
use gatepass_ledger::{Network, SignedEnvelope};

use crate::agent::SigningAgent;
use crate::error::SigningError;

/// Routes unsigned transactions to one configured [`SigningAgent`].
#[derive(Clone)]
pub struct SigningGateway {
    agent: Arc<dyn SigningAgent>,
}

impl std::fmt::Debug for SigningGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningGateway")
            .field("agent", &self.agent.agent_name())
            .finish()
    }
}

impl SigningGateway {
    pub fn new(agent: Arc<dyn SigningAgent>) -> Self {
        Self { agent }
    }

    pub fn agent_name(&self) -> &str {
        self.agent.agent_name()
    }

    /// Obtain a signed envelope for `unsigned` under `network`.
    ///
    /// # Errors
    ///
    /// Agent errors are returned unchanged. [`SigningError::NetworkMismatch`]
    /// when the envelope names another network,
    /// [`SigningError::EnvelopeAltered`] when its embedded bytes differ from
    /// `unsigned`, [`SigningError::MalformedEnvelope`] when it carries no
    /// signature.
    pub async fn sign(
        &self,
        unsigned: &[u8],
        network: &Network,
    ) -> Result<SignedEnvelope, SigningError> {
        let envelope = self.agent.sign(unsigned, network).await.map_err(|e| {
            tracing::warn!(agent = self.agent.agent_name(), error = %e, "signing failed");
            e
        })?;

        if envelope.network() != network {
            return Err(SigningError::NetworkMismatch {
                requested: network.name().to_string(),
                signed: envelope.network().name().to_string(),
            });
        }
        if envelope.transaction_bytes() != unsigned {
            return Err(SigningError::EnvelopeAltered);
        }
        if envelope.signatures().is_empty() {
            return Err(SigningError::MalformedEnvelope {
                reason: "envelope carries no signatures".into(),
            });
        }
        tracing::debug!(agent = self.agent.agent_name(), "transaction signed");
        Ok(envelope)
    }
}

/// Explicit signer handle passed into every issuance.
///
/// Names the source account, the network, and the gateway that will sign
/// for it.
#[derive(Debug, Clone)]
pub struct SignerSession {
    account: AccountId,
    network: Network,
    gateway: SigningGateway,
}

impl SignerSession {
    pub fn new(account: AccountId, network: Network, gateway: SigningGateway) -> Self {
        Self {
            account,
            network,
            gateway,
        }
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn gateway(&self) -> &SigningGateway {
        &self.gateway
    }

    /// Sign under this session's network.
    pub async fn sign(&self, unsigned: &[u8]) -> Result<SignedEnvelope, SigningError> {
        self.gateway.sign(unsigned, &self.network).await
    }
}
