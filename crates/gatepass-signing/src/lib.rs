//! # gatepass-signing: Signing Gateway
//!
//! Hands serialized unsigned transactions to exactly one external signing
//! agent and returns the signed envelope.
//!
//! ## Agents
//!
//! Each supported signing protocol is one implementation of
//! [`SigningAgent`], selected by [`SignerConfig`]:
//!
//! - [`LocalKeyAgent`]: custodial Ed25519 key held in process memory.
//! - [`IntentAgent`]: remote wallet reached over an HTTP intent protocol.
//! - [`MockSigningAgent`]: scripted outcomes for tests.
//!
//! ## Security Invariant
//!
//! The [`SigningGateway`] never inspects or modifies entry content. It
//! checks two things about what comes back: the envelope was signed for the
//! requested network, and the embedded transaction bytes are byte-for-byte
//! the bytes that were handed out. What was built is what gets signed.
//!
//! There is no ambient wallet connection. Callers pass a [`SignerSession`]
//! into every issuance.

pub mod agent;
pub mod config;
pub mod error;
pub mod gateway;
pub mod intent;
pub mod local;
pub mod mock;

pub use agent::SigningAgent;
pub use config::{SignerConfig, SignerConfigError, SignerKind};
pub use error::SigningError;
pub use gateway::{SignerSession, SigningGateway};
pub use intent::{IntentAgent, IntentConfig};
pub use local::{verify_envelope, LocalKeyAgent};
pub use mock::{MockOutcome, MockSigningAgent};
