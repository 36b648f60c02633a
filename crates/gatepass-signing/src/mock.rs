//! Scripted signing agent for tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use gatepass_core::sha256;
use gatepass_ledger::{EnvelopeSignature, Network, SignedEnvelope};

use crate::agent::SigningAgent;
use crate::error::SigningError;

/// What the mock does on its next call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    /// Sign deterministically under the requested network.
    Sign,
    /// Sign, but for the given network instead.
    SignForNetwork(Network),
    /// Sign different bytes than were handed over.
    Alter,
    /// Return an envelope with no signatures.
    Unsigned,
    Reject,
    Unavailable,
}

/// Signing agent that replays a script of outcomes, then signs.
///
/// Signatures are `sha256(network_id ‖ bytes)` under a fixed hint, so the
/// same bytes always produce the same envelope. The bytes are never
/// decoded, which lets gateway tests hand over arbitrary payloads.
#[derive(Debug, Default)]
pub struct MockSigningAgent {
    script: Mutex<VecDeque<MockOutcome>>,
    requests: Mutex<Vec<Vec<u8>>>,
}

impl MockSigningAgent {
    pub const HINT: [u8; 4] = *b"mock";

    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for the next calls.
    pub fn with_script(outcomes: impl IntoIterator<Item = MockOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, outcome: MockOutcome) {
        self.script.lock().push_back(outcome);
    }

    /// Bytes received on every call so far.
    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn envelope(network: &Network, bytes: Vec<u8>) -> SignedEnvelope {
        let mut payload = network.network_id().as_bytes().to_vec();
        payload.extend_from_slice(&bytes);
        let signature = sha256(&payload).as_bytes().to_vec();
        SignedEnvelope::new(
            network.clone(),
            bytes,
            vec![EnvelopeSignature {
                hint: Self::HINT,
                signature,
            }],
        )
    }
}

#[async_trait]
impl SigningAgent for MockSigningAgent {
    async fn sign(
        &self,
        unsigned: &[u8],
        network: &Network,
    ) -> Result<SignedEnvelope, SigningError> {
        self.requests.lock().push(unsigned.to_vec());
        let outcome = self.script.lock().pop_front().unwrap_or(MockOutcome::Sign);
        match outcome {
            MockOutcome::Sign => Ok(Self::envelope(network, unsigned.to_vec())),
            MockOutcome::SignForNetwork(other) => Ok(Self::envelope(&other, unsigned.to_vec())),
            MockOutcome::Alter => {
                let mut altered = unsigned.to_vec();
                altered.extend_from_slice(b" ");
                Ok(Self::envelope(network, altered))
            }
            MockOutcome::Unsigned => Ok(SignedEnvelope::new(
                network.clone(),
                unsigned.to_vec(),
                Vec::new(),
            )),
            MockOutcome::Reject => Err(SigningError::UserRejected {
                reason: "holder declined".into(),
            }),
            MockOutcome::Unavailable => Err(SigningError::AgentUnavailable {
                reason: "mock agent offline".into(),
            }),
        }
    }

    fn agent_name(&self) -> &str {
        "MockSigningAgent"
    }
}
