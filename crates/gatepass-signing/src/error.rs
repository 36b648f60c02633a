//! Signing errors.
//!
//! Surfaced verbatim to the caller and never retried: a rejection is the
//! holder's decision, and an unavailable agent may already be showing a
//! prompt.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SigningError {
    /// The holder (or the agent on their behalf) declined to sign.
    #[error("signing rejected by user: {reason}")]
    UserRejected { reason: String },

    /// The agent could not be reached or failed internally.
    #[error("signing agent unavailable: {reason}")]
    AgentUnavailable { reason: String },

    /// The agent signed for a different ledger network than requested.
    #[error("signing agent signed for network {signed:?}, requested {requested:?}")]
    NetworkMismatch { requested: String, signed: String },

    /// The envelope embeds different transaction bytes than were handed out.
    #[error("signed envelope does not carry the transaction that was submitted for signing")]
    EnvelopeAltered,

    /// The agent returned something that is not a usable envelope.
    #[error("malformed signed envelope: {reason}")]
    MalformedEnvelope { reason: String },

    /// Signer key material could not be loaded.
    #[error("invalid signer key: {0}")]
    InvalidKey(String),
}
