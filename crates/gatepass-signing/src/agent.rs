//! The signing capability.

use async_trait::async_trait;

use gatepass_ledger::{Network, SignedEnvelope};

use crate::error::SigningError;

/// Produces a signed envelope for given unsigned transaction bytes under a
/// named network.
///
/// Implementations must be `Send + Sync` for use across async tasks, and
/// must embed `unsigned` in the envelope unchanged.
#[async_trait]
pub trait SigningAgent: Send + Sync {
    async fn sign(&self, unsigned: &[u8], network: &Network)
        -> Result<SignedEnvelope, SigningError>;

    /// Human-readable name for diagnostics and logging.
    fn agent_name(&self) -> &str;
}
