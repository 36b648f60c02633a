//! # gatepass-clients: Extraction and Pinning Clients
//!
//! The two leaf collaborators of issuance, each behind a narrow trait:
//!
//! - [`IdentityExtractor`]: document image in, [`IdentityFacts`] out. The
//!   full identity number is parsed, digested and dropped inside the
//!   extractor; it never crosses this crate's public API.
//! - [`ContentPinner`]: photo bytes in, [`PhotoReference`] out, plus
//!   resolution of a reference to a gateway URL.
//!
//! HTTP implementations ([`HttpExtractionClient`], [`PinataClient`]) and
//! in-memory doubles ([`StaticExtractor`], [`InMemoryPinner`]) are provided.
//! Both uploads are idempotent, so transport failures are retried with the
//! shared backoff helper.
//!
//! [`IdentityFacts`]: gatepass_core::IdentityFacts
//! [`PhotoReference`]: gatepass_core::PhotoReference

pub mod config;
pub mod extraction;
pub mod pinning;

pub use config::{digest_key_from_env, ConfigError, ServiceConfig};
pub use extraction::{ExtractionError, HttpExtractionClient, IdentityExtractor, StaticExtractor};
pub use pinning::{ContentPinner, InMemoryPinner, PinError, PinataClient};
