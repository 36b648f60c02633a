//! # gatepass-core: Foundational Types for the Gate Pass Stack
//!
//! Every other crate in the workspace depends on `gatepass-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `PassId`, `TransactionId`,
//!    `ContentId`, `AccountId` are distinct types with validated
//!    constructors. A presentation label can never be passed where the
//!    ledger-assigned transaction id is expected.
//!
//! 2. **The full identity number never leaves extraction.** `AadhaarNumber`
//!    is not `Serialize`, redacts itself in `Debug`, and zeroizes on drop.
//!    The only thing derived from it is an [`IdentityDigest`], which refuses
//!    at construction to hold anything that looks like a full number.
//!
//! 3. **UTC-only timestamps** truncated to seconds, rendered with a `Z`
//!    suffix.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `gatepass-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod identity;
pub mod pass;
pub mod retry;
pub mod temporal;

pub use digest::{sha256, DigestKey, IdentityDigest, Sha256Digest};
pub use error::ValidationError;
pub use identity::{AadhaarNumber, AccountId, ContentId, PassId, TransactionId};
pub use pass::{IdentityFacts, PassRecord, PhotoReference};
pub use temporal::Timestamp;
