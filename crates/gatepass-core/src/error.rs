//! # Error Types: Structured Error Hierarchy
//!
//! Core errors shared by every crate in the workspace. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! Validation errors never echo identity numbers back in their messages.

use thiserror::Error;

/// A domain value was rejected at construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The value was empty or whitespace-only.
    #[error("{kind} must not be empty")]
    Empty {
        /// Which kind of value was rejected.
        kind: &'static str,
    },

    /// The value exceeds the byte limit for its kind.
    #[error("{kind} exceeds {max} bytes (got {actual})")]
    TooLong {
        /// Which kind of value was rejected.
        kind: &'static str,
        /// Maximum permitted length in bytes.
        max: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// The value contains characters outside the permitted set.
    #[error("{kind} contains characters outside {allowed}")]
    InvalidCharacters {
        /// Which kind of value was rejected.
        kind: &'static str,
        /// Human-readable description of the permitted set.
        allowed: &'static str,
    },

    /// An identity number did not have exactly 12 digits.
    #[error("identity number must have exactly 12 digits, got {digits}")]
    IdentityNumberLength {
        /// Number of digits found after stripping separators.
        digits: usize,
    },

    /// An identity number was masked (e.g. `XXXXXXXX1234`) and cannot be digested.
    #[error("identity number is masked; a full number is required to derive a digest")]
    MaskedIdentityNumber,

    /// A digest value looked like a full identity number.
    #[error("identity digest must not carry a full identity number")]
    DigestCarriesIdentityNumber,

    /// An account id was not a valid Ed25519 public key strkey.
    #[error("account id {value:?} is not a valid G... public key: {reason}")]
    AccountId {
        /// The rejected input.
        value: String,
        /// Decoder diagnostic.
        reason: String,
    },

    /// A timestamp string could not be parsed.
    #[error("invalid timestamp {value:?}: {reason}")]
    Timestamp {
        /// The rejected input.
        value: String,
        /// Parser diagnostic.
        reason: String,
    },
}
