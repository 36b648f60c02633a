//! # Digests
//!
//! SHA-256 helpers and the [`IdentityDigest`] carried in the ledger memo
//! and the QR payload.
//!
//! ## Security Invariant
//!
//! An `IdentityDigest` can never hold a full identity number. The keyed
//! derivation in [`IdentityDigest::derive()`] is the only path from an
//! [`AadhaarNumber`] to a digest, and the validating constructor rejects
//! any value carrying 12 or more digits. Without the deployment key the
//! 10^12 input space cannot be enumerated from public ledger data.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::ValidationError;
use crate::identity::AadhaarNumber;

/// Domain separation tag for identity digests.
const IDENTITY_DIGEST_DOMAIN: &[u8] = b"gatepass/aadhaar-digest/v1";

/// Hex characters kept from the keyed hash.
const IDENTITY_DIGEST_HEX_LEN: usize = 16;

/// A raw 32-byte SHA-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Digest([u8; 32]);

impl Sha256Digest {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Return the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// SHA-256 of arbitrary bytes.
pub fn sha256(data: &[u8]) -> Sha256Digest {
    Sha256Digest(Sha256::digest(data).into())
}

/// Deployment secret mixed into identity digests.
#[derive(Clone)]
pub struct DigestKey(Zeroizing<Vec<u8>>);

impl DigestKey {
    /// Wrap key material.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for DigestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DigestKey([REDACTED])")
    }
}

/// Non-reversible stand-in for an identity number.
///
/// Fits inside the ledger memo after the `Gate:` prefix (at most 23 bytes,
/// ASCII alphanumeric).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityDigest(String);

impl IdentityDigest {
    /// Maximum length in bytes.
    pub const MAX_LEN: usize = 23;

    /// Validate an existing digest string (as read from a memo or QR code).
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::Empty {
                kind: "identity digest",
            });
        }
        if value.len() > Self::MAX_LEN {
            return Err(ValidationError::TooLong {
                kind: "identity digest",
                max: Self::MAX_LEN,
                actual: value.len(),
            });
        }
        if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::InvalidCharacters {
                kind: "identity digest",
                allowed: "[A-Za-z0-9]",
            });
        }
        if value.chars().filter(char::is_ascii_digit).count() >= AadhaarNumber::DIGITS {
            return Err(ValidationError::DigestCarriesIdentityNumber);
        }
        Ok(Self(value))
    }

    /// Derive the digest for `number` under `key`.
    pub fn derive(number: &AadhaarNumber, key: &DigestKey) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(IDENTITY_DIGEST_DOMAIN);
        hasher.update([0u8]);
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(number.expose_digits().as_bytes());
        let full = Sha256Digest(hasher.finalize().into()).to_hex();
        let mut truncated: String = full.chars().take(IDENTITY_DIGEST_HEX_LEN).collect();
        // 16 hex chars carrying 12+ decimal digits is possible; re-map
        // digits past the limit onto letters so the invariant holds.
        let digits = truncated.chars().filter(char::is_ascii_digit).count();
        if digits >= AadhaarNumber::DIGITS {
            truncated = remap_excess_digits(&truncated);
        }
        Self(truncated)
    }

    /// Access the digest string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn remap_excess_digits(hex: &str) -> String {
    let mut seen = 0usize;
    hex.chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => {
                seen += 1;
                if seen >= AadhaarNumber::DIGITS {
                    char::from(b'g' + d as u8)
                } else {
                    c
                }
            }
            None => c,
        })
        .collect()
}

impl TryFrom<String> for IdentityDigest {
    type Error = ValidationError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IdentityDigest> for String {
    fn from(value: IdentityDigest) -> String {
        value.0
    }
}

impl std::fmt::Display for IdentityDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number() -> AadhaarNumber {
        AadhaarNumber::parse("2345 6789 7812").unwrap()
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            sha256(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn derive_is_deterministic_and_keyed() {
        let k1 = DigestKey::new(b"pepper-one".to_vec());
        let k2 = DigestKey::new(b"pepper-two".to_vec());
        let a = IdentityDigest::derive(&number(), &k1);
        let b = IdentityDigest::derive(&number(), &k1);
        let c = IdentityDigest::derive(&number(), &k2);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), IDENTITY_DIGEST_HEX_LEN);
    }

    #[test]
    fn derived_digest_never_contains_the_number() {
        let key = DigestKey::new(b"k".to_vec());
        let d = IdentityDigest::derive(&number(), &key);
        assert!(!d.as_str().contains("234567897812"));
        assert!(IdentityDigest::new(d.as_str()).is_ok());
    }

    #[test]
    fn new_rejects_full_number() {
        assert_eq!(
            IdentityDigest::new("234567897812").unwrap_err(),
            ValidationError::DigestCarriesIdentityNumber
        );
        assert_eq!(
            IdentityDigest::new("1a2b3c4d5e6f7g8h9i0j1k2").unwrap_err(),
            ValidationError::DigestCarriesIdentityNumber
        );
    }

    #[test]
    fn new_accepts_short_tokens() {
        assert!(IdentityDigest::new("7812").is_ok());
        assert!(IdentityDigest::new("9f86d081884c7d65").is_ok());
    }

    #[test]
    fn new_rejects_empty_long_and_symbols() {
        assert!(IdentityDigest::new("").is_err());
        assert!(IdentityDigest::new("a".repeat(24)).is_err());
        assert!(IdentityDigest::new("78 12").is_err());
    }

    #[test]
    fn remap_keeps_eleven_digits() {
        let out = remap_excess_digits("0123456789012345");
        assert_eq!(out.chars().filter(char::is_ascii_digit).count(), 11);
        assert!(IdentityDigest::new(out).is_ok());
    }

    #[test]
    fn digest_key_debug_redacted() {
        let key = DigestKey::new(b"super-secret".to_vec());
        assert!(!format!("{key:?}").contains("super"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn derived_digest_always_validates(
                digits in "[0-9]{12}",
                key in proptest::collection::vec(any::<u8>(), 0..64),
            ) {
                let number = AadhaarNumber::parse(&digits).unwrap();
                let digest = IdentityDigest::derive(&number, &DigestKey::new(key));
                prop_assert!(IdentityDigest::new(digest.as_str()).is_ok());
                prop_assert!(!digest.as_str().contains(digits.as_str()));
            }
        }
    }
}
