//! # Local Key Agent
//!
//! Custodial Ed25519 signer. The agent signs the transaction's signature
//! payload hash for the network it was configured with, whatever network
//! the caller asks for; a mismatch is caught by the gateway, exactly as
//! with a remote wallet pinned to one network.
//!
//! The account id is the `G…` strkey of the verifying key.

use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use zeroize::Zeroizing;

use gatepass_core::AccountId;
use gatepass_ledger::{transaction_hash, EnvelopeSignature, Network, SignedEnvelope};

use crate::agent::SigningAgent;
use crate::error::SigningError;

/// Ed25519 signing agent holding its key in process memory.
///
/// `ed25519_dalek::SigningKey` zeroizes on drop.
pub struct LocalKeyAgent {
    key: SigningKey,
    network: Network,
}

impl std::fmt::Debug for LocalKeyAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeyAgent")
            .field("public_key", &self.public_key_hex())
            .field("network", &self.network)
            .finish()
    }
}

impl LocalKeyAgent {
    /// Generate a new random key using the OS CSPRNG.
    pub fn generate(network: Network) -> Self {
        Self {
            key: SigningKey::generate(&mut rand_core::OsRng),
            network,
        }
    }

    pub fn from_seed(seed: &[u8; 32], network: Network) -> Self {
        Self {
            key: SigningKey::from_bytes(seed),
            network,
        }
    }

    /// Load from a 64-character hex seed.
    pub fn from_seed_hex(hex: &str, network: Network) -> Result<Self, SigningError> {
        let bytes = Zeroizing::new(hex_to_bytes(hex.trim())?);
        let seed: &[u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            SigningError::InvalidKey(format!(
                "expected 32 bytes (64 hex chars), got {} bytes",
                bytes.len()
            ))
        })?;
        Ok(Self::from_seed(seed, network))
    }

    /// Hex seed, for `keygen` output only.
    pub fn seed_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(bytes_to_hex(&self.key.to_bytes()))
    }

    pub fn public_key_hex(&self) -> String {
        bytes_to_hex(self.key.verifying_key().as_bytes())
    }

    /// Ledger account controlled by this key.
    pub fn account_id(&self) -> AccountId {
        AccountId::from_public_key(self.key.verifying_key().to_bytes())
    }

    pub fn network(&self) -> &Network {
        &self.network
    }
}

#[async_trait]
impl SigningAgent for LocalKeyAgent {
    async fn sign(
        &self,
        unsigned: &[u8],
        network: &Network,
    ) -> Result<SignedEnvelope, SigningError> {
        if network != &self.network {
            tracing::warn!(
                requested = %network,
                configured = %self.network,
                "local signer asked to sign for a foreign network"
            );
        }
        let hash = transaction_hash(&self.network, unsigned).map_err(|e| {
            SigningError::MalformedEnvelope {
                reason: format!("unsigned transaction: {e}"),
            }
        })?;
        let signature = self.key.sign(hash.as_bytes());
        Ok(SignedEnvelope::new(
            self.network.clone(),
            unsigned.to_vec(),
            vec![EnvelopeSignature::new(
                self.key.verifying_key().as_bytes(),
                signature.to_bytes().to_vec(),
            )],
        ))
    }

    fn agent_name(&self) -> &str {
        "LocalKeyAgent"
    }
}

/// Check every signature in `envelope` against the transaction's source
/// account.
///
/// Returns `false` for an unsigned envelope, undecodable transaction bytes,
/// or any signature whose hint or bytes do not belong to the source key.
pub fn verify_envelope(envelope: &SignedEnvelope) -> bool {
    let (Ok(tx), Ok(hash)) = (envelope.transaction(), envelope.hash()) else {
        return false;
    };
    let key = tx.source_account.public_key();
    let Ok(vk) = VerifyingKey::from_bytes(key) else {
        return false;
    };
    let hint = EnvelopeSignature::hint_for(key);
    !envelope.signatures().is_empty()
        && envelope.signatures().iter().all(|sig| {
            let Ok(bytes) = <[u8; 64]>::try_from(sig.signature.as_slice()) else {
                return false;
            };
            sig.hint == hint
                && vk
                    .verify(hash.as_bytes(), &Signature::from_bytes(&bytes))
                    .is_ok()
        })
}

fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, SigningError> {
    if hex.len() % 2 != 0 {
        return Err(SigningError::InvalidKey("odd-length hex string".into()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| SigningError::InvalidKey("invalid hex character".into()))
        })
        .collect()
}
