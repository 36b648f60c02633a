//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier that crosses a component boundary.
//! These prevent accidental identifier confusion: a [`PassId`] (the
//! presentation label written into the `gate_pass_id` entry) can never be
//! passed where the ledger-assigned [`TransactionId`] is expected.
//!
//! ## Security Invariant
//!
//! [`TransactionId`] and [`AccountId`] are interpolated into ledger gateway
//! URL paths, so their character set is restricted at construction. An
//! [`AccountId`] must additionally decode as a checksummed public key. A QR
//! code carrying `../` or a query string cannot reach the HTTP layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ValidationError;

/// Ledger data entries hold at most 64 bytes per value.
const MAX_ENTRY_VALUE_BYTES: usize = 64;

fn validate_token(
    kind: &'static str,
    value: &str,
    max: usize,
    allowed: &'static str,
    is_allowed: impl Fn(char) -> bool,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { kind });
    }
    if value.len() > max {
        return Err(ValidationError::TooLong {
            kind,
            max,
            actual: value.len(),
        });
    }
    if !value.chars().all(is_allowed) {
        return Err(ValidationError::InvalidCharacters { kind, allowed });
    }
    Ok(())
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Presentation label for a pass (`GP-…`), written to the `gate_pass_id`
/// ledger entry. Unique per issuance but never used as a lookup handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PassId(String);

impl PassId {
    /// Generate a fresh label from a random UUIDv4.
    pub fn generate() -> Self {
        Self(format!("GP-{}", Uuid::new_v4().simple()).to_uppercase())
    }

    /// Parse an existing label (e.g. one read back from the ledger).
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        validate_token("pass id", &value, MAX_ENTRY_VALUE_BYTES, "[A-Za-z0-9_-]", is_id_char)?;
        Ok(Self(value))
    }

    /// Access the label.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Ledger-assigned transaction identifier (a transaction hash on the
/// production network). The only handle used for verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(String);

impl TransactionId {
    /// Maximum accepted length; real hashes are 64 hex chars.
    pub const MAX_LEN: usize = 128;

    /// Validate and wrap a transaction identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        validate_token("transaction id", &value, Self::MAX_LEN, "[A-Za-z0-9_-]", is_id_char)?;
        Ok(Self(value))
    }

    /// Access the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier returned by the content-addressed store (an IPFS CID).
///
/// Not validated at construction: the codec decides whether an empty or
/// oversized id is acceptable for a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Wrap a content identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty or whitespace-only.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Ledger account that sources (and pays for) a pass transaction.
///
/// Always an Ed25519 public key in strkey form: 56 base32 characters
/// starting with `G`, checksum verified at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId {
    encoded: String,
    key: [u8; 32],
}

impl AccountId {
    /// Length of an encoded account id.
    pub const LEN: usize = 56;

    /// Validate and wrap an account identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        validate_token("account id", &value, Self::LEN, "[A-Z2-7]", |c| {
            c.is_ascii_uppercase() || ('2'..='7').contains(&c)
        })?;
        let decoded = stellar_strkey::ed25519::PublicKey::from_string(&value).map_err(|e| {
            ValidationError::AccountId {
                value: value.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            encoded: value,
            key: decoded.0,
        })
    }

    /// Account controlled by the given Ed25519 public key.
    pub fn from_public_key(key: [u8; 32]) -> Self {
        Self {
            encoded: stellar_strkey::ed25519::PublicKey(key).to_string(),
            key,
        }
    }

    /// Access the identifier.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Raw Ed25519 public key.
    pub fn public_key(&self) -> &[u8; 32] {
        &self.key
    }
}

impl TryFrom<String> for AccountId {
    type Error = ValidationError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> String {
        value.encoded
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encoded)
    }
}

macro_rules! string_newtype_conversions {
    ($($ty:ident),*) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = ValidationError;
                fn try_from(value: String) -> Result<Self, Self::Error> {
                    Self::new(value)
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> String {
                    value.0
                }
            }

            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )*
    };
}

string_newtype_conversions!(PassId, TransactionId);

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A full 12-digit Aadhaar number.
///
/// Exists only inside the extraction step. Deliberately not `Serialize`,
/// redacted in `Debug`, and wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AadhaarNumber(String);

impl AadhaarNumber {
    /// Number of digits in a full identity number.
    pub const DIGITS: usize = 12;

    /// Parse an identity number, stripping spaces and dashes.
    ///
    /// Masked forms such as `XXXX XXXX 1234` are rejected with
    /// [`ValidationError::MaskedIdentityNumber`].
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        if compact.chars().any(|c| c == 'x' || c == 'X') {
            return Err(ValidationError::MaskedIdentityNumber);
        }
        if !compact.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidCharacters {
                kind: "identity number",
                allowed: "[0-9]",
            });
        }
        if compact.len() != Self::DIGITS {
            return Err(ValidationError::IdentityNumberLength {
                digits: compact.len(),
            });
        }
        Ok(Self(compact))
    }

    /// Access the digits. Callers must not log or persist the result.
    pub fn expose_digits(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AadhaarNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AadhaarNumber([REDACTED])")
    }
}
