//! # gatepass-protocol: Pass Issuance & Verification
//!
//! The protocol core. Issuance runs leaves first:
//!
//! ```text
//! extract ─┐
//!          ├─▶ codec::encode ─▶ TransactionBuilder ─▶ SigningGateway ─▶ SubmissionCoordinator ─▶ PassRecord
//! pin ─────┘                                                                                         │
//!                                                                                        codec::to_qr_payload
//! ```
//!
//! Verification is independent and stateless:
//!
//! ```text
//! QR bytes ─▶ VerificationEngine ─▶ ledger queries ─▶ codec::decode ─▶ verdict
//! ```
//!
//! ## Invariants
//!
//! - A [`PassRecord`](gatepass_core::PassRecord) exists only once the ledger
//!   accepted the transaction. Nothing is persisted locally.
//! - The coordinator submits each envelope at most once.
//! - Verification always yields a verdict for any input bytes. The only
//!   error is a ledger outage, which is retryable and never reported as
//!   `NotFound`.
//! - The photo in a `Valid` verdict comes from the ledger entries, never
//!   from the QR payload.

pub mod builder;
pub mod codec;
pub mod issuance;
pub mod submission;
pub mod verification;

pub use builder::{BuildError, BuiltTransaction, LedgerState, TransactionBuilder};
pub use codec::{
    DecodingError, EncodingError, EntryVocabulary, PayloadError, QrPayload, UnsignedEntrySet,
};
pub use issuance::{IssuanceError, IssuanceStage, IssuedPass, PassIssuer};
pub use submission::{SubmissionCoordinator, SubmissionError};
pub use verification::{InvalidReason, VerificationEngine, VerificationError, VerificationVerdict};
