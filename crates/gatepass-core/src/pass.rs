//! Pass facts and the record produced by a successful issuance.

use serde::{Deserialize, Serialize};

use crate::digest::IdentityDigest;
use crate::identity::{ContentId, PassId, TransactionId};
use crate::temporal::Timestamp;

/// The minimal fact set anchored on the ledger for one pass.
///
/// Produced once by identity extraction and immutable afterwards. The full
/// identity number has already been replaced by its digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityFacts {
    /// Holder name as printed on the document.
    pub full_name: String,
    /// Non-reversible digest of the identity number.
    pub identity_digest: IdentityDigest,
    /// When the facts were captured.
    pub issued_at: Timestamp,
}

/// Pointer into the content-addressed photo store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhotoReference {
    pub content_id: ContentId,
}

impl PhotoReference {
    pub fn new(content_id: impl Into<String>) -> Self {
        Self {
            content_id: ContentId::new(content_id),
        }
    }
}

/// The durable result of an accepted issuance.
///
/// Exists only once the ledger has accepted the transaction. The ledger is
/// the system of record; nothing here is persisted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassRecord {
    /// Ledger-assigned id. The sole verification handle.
    pub transaction_id: TransactionId,
    /// Presentation label written to the `gate_pass_id` entry.
    pub pass_id: PassId,
    pub facts: IdentityFacts,
    pub photo: PhotoReference,
    pub issued_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_record_serializes_ids_as_strings() {
        let issued_at = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        let record = PassRecord {
            transaction_id: TransactionId::new("T1").unwrap(),
            pass_id: PassId::new("GP-ABC").unwrap(),
            facts: IdentityFacts {
                full_name: "Asha Rao".into(),
                identity_digest: IdentityDigest::new("7812").unwrap(),
                issued_at,
            },
            photo: PhotoReference::new("bafy123"),
            issued_at,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["transaction_id"], "T1");
        assert_eq!(json["pass_id"], "GP-ABC");
        assert_eq!(json["facts"]["identity_digest"], "7812");
        assert_eq!(json["photo"]["content_id"], "bafy123");

        let back: PassRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn deserialize_rejects_full_number_digest() {
        let json = serde_json::json!({
            "full_name": "Asha Rao",
            "identity_digest": "234567897812",
            "issued_at": "2026-01-15T12:00:00Z"
        });
        assert!(serde_json::from_value::<IdentityFacts>(json).is_err());
    }
}
