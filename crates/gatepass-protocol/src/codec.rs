//! # Pass Payload Codec
//!
//! Maps the minimal fact set onto ledger fields and onto the QR payload.
//!
//! ## Vocabulary `v1`
//!
//! | Ledger field | Content |
//! |--------------|---------|
//! | `gate_pass_id` | presentation label (`GP-…`) |
//! | `visitor_name` | holder name |
//! | `datetime` | issuance time, `YYYY-MM-DDTHH:MM:SSZ` |
//! | `aadhaar_cid` | photo content id |
//! | memo | `Gate:<identity digest>` |
//!
//! Entries are looked up by key, never by position. `gate_pass_id` is
//! added by the builder, not by [`encode`], and is not needed to recover
//! the facts.
//!
//! ## QR payload
//!
//! `{"name", "aadhaarDigest", "tx"}`. The photo is deliberately absent: a
//! verifier fetches it through the transaction so a forged code cannot
//! substitute a different face.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use gatepass_core::{
    IdentityDigest, IdentityFacts, PassId, PassRecord, PhotoReference, Timestamp, TransactionId,
};
use gatepass_ledger::{DataEntry, EntryError, Memo};

pub const KEY_GATE_PASS_ID: &str = "gate_pass_id";
pub const KEY_VISITOR_NAME: &str = "visitor_name";
pub const KEY_DATETIME: &str = "datetime";
pub const KEY_PHOTO_CID: &str = "aadhaar_cid";
pub const MEMO_PREFIX: &str = "Gate:";

/// Largest QR payload accepted before parsing.
pub const MAX_QR_PAYLOAD_BYTES: usize = 4096;

/// Versioned set of ledger keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryVocabulary {
    V1,
}

impl EntryVocabulary {
    pub const CURRENT: Self = Self::V1;

    /// Every key the vocabulary defines.
    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            Self::V1 => &[KEY_GATE_PASS_ID, KEY_VISITOR_NAME, KEY_DATETIME, KEY_PHOTO_CID],
        }
    }

    /// Keys needed to reconstruct the facts.
    pub fn fact_keys(&self) -> &'static [&'static str] {
        match self {
            Self::V1 => &[KEY_VISITOR_NAME, KEY_DATETIME, KEY_PHOTO_CID],
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys().contains(&key)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("holder name must not be empty")]
    EmptyName,
    #[error("photo content id is missing")]
    MissingPhoto,
    #[error("value for {key} exceeds the ledger entry limit ({len} bytes)")]
    ValueTooLong { key: &'static str, len: usize },
    #[error("memo exceeds the ledger memo limit ({len} bytes)")]
    MemoTooLong { len: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodingError {
    #[error("required ledger field {0} is absent")]
    MissingKey(&'static str),
    #[error("ledger field {key} is malformed: {reason}")]
    MalformedValue { key: &'static str, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("QR payload is not a JSON object: {0}")]
    NotJson(String),
    #[error("QR payload exceeds {MAX_QR_PAYLOAD_BYTES} bytes")]
    TooLarge,
    #[error("QR payload is missing {0}")]
    MissingField(&'static str),
    #[error("QR payload field {field} is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Fact entries plus memo, ready for the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedEntrySet {
    pub entries: Vec<DataEntry>,
    pub memo: Memo,
}

fn entry(key: &'static str, value: &str) -> Result<DataEntry, EncodingError> {
    DataEntry::new(key, value).map_err(|e| match e {
        EntryError::ValueTooLong { len, .. } => EncodingError::ValueTooLong { key, len },
        _ => EncodingError::ValueTooLong {
            key,
            len: value.len(),
        },
    })
}

/// Map facts and photo onto the `v1` vocabulary.
pub fn encode(
    facts: &IdentityFacts,
    photo: &PhotoReference,
) -> Result<UnsignedEntrySet, EncodingError> {
    if facts.full_name.trim().is_empty() {
        return Err(EncodingError::EmptyName);
    }
    if photo.content_id.is_empty() {
        return Err(EncodingError::MissingPhoto);
    }
    let entries = vec![
        entry(KEY_VISITOR_NAME, &facts.full_name)?,
        entry(KEY_DATETIME, &facts.issued_at.to_iso8601())?,
        entry(KEY_PHOTO_CID, photo.content_id.as_str())?,
    ];
    let memo_text = format!("{MEMO_PREFIX}{}", facts.identity_digest);
    let memo = Memo::text(memo_text.as_str()).map_err(|_| EncodingError::MemoTooLong {
        len: memo_text.len(),
    })?;
    Ok(UnsignedEntrySet { entries, memo })
}

/// Index entries by key, rejecting duplicates of vocabulary keys.
fn index(entries: &[DataEntry]) -> Result<HashMap<&str, &str>, DecodingError> {
    let mut map = HashMap::new();
    for e in entries {
        if let Some(&key) = EntryVocabulary::CURRENT
            .keys()
            .iter()
            .find(|k| **k == e.key())
        {
            if map.insert(key, e.value()).is_some() {
                return Err(DecodingError::MalformedValue {
                    key,
                    reason: "key appears more than once".into(),
                });
            }
        }
    }
    Ok(map)
}

/// Recover facts and photo from ledger entries and the memo.
pub fn decode(
    entries: &[DataEntry],
    memo: Option<&str>,
) -> Result<(IdentityFacts, PhotoReference), DecodingError> {
    let map = index(entries)?;
    let get = |key: &'static str| map.get(key).copied().ok_or(DecodingError::MissingKey(key));

    let full_name = get(KEY_VISITOR_NAME)?;
    if full_name.trim().is_empty() {
        return Err(DecodingError::MalformedValue {
            key: KEY_VISITOR_NAME,
            reason: "empty".into(),
        });
    }
    let issued_at =
        Timestamp::parse(get(KEY_DATETIME)?).map_err(|e| DecodingError::MalformedValue {
            key: KEY_DATETIME,
            reason: e.to_string(),
        })?;
    let cid = get(KEY_PHOTO_CID)?;
    if cid.trim().is_empty() {
        return Err(DecodingError::MalformedValue {
            key: KEY_PHOTO_CID,
            reason: "empty".into(),
        });
    }

    let memo = memo.ok_or(DecodingError::MissingKey("memo"))?;
    let digest = memo
        .strip_prefix(MEMO_PREFIX)
        .ok_or_else(|| DecodingError::MalformedValue {
            key: "memo",
            reason: format!("missing {MEMO_PREFIX:?} prefix"),
        })?;
    let identity_digest =
        IdentityDigest::new(digest).map_err(|e| DecodingError::MalformedValue {
            key: "memo",
            reason: e.to_string(),
        })?;

    Ok((
        IdentityFacts {
            full_name: full_name.to_string(),
            identity_digest,
            issued_at,
        },
        PhotoReference::new(cid),
    ))
}

/// Read the `gate_pass_id` label.
pub fn pass_id(entries: &[DataEntry]) -> Result<PassId, DecodingError> {
    let map = index(entries)?;
    let raw = map
        .get(KEY_GATE_PASS_ID)
        .ok_or(DecodingError::MissingKey(KEY_GATE_PASS_ID))?;
    PassId::new(*raw).map_err(|e| DecodingError::MalformedValue {
        key: KEY_GATE_PASS_ID,
        reason: e.to_string(),
    })
}

/// Content of the scannable code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    pub name: String,
    #[serde(rename = "aadhaarDigest")]
    pub aadhaar_digest: IdentityDigest,
    pub tx: TransactionId,
}

impl QrPayload {
    /// JSON text for the code.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "name": self.name,
            "aadhaarDigest": self.aadhaar_digest.as_str(),
            "tx": self.tx.as_str(),
        })
        .to_string()
    }
}

pub fn to_qr_payload(record: &PassRecord) -> QrPayload {
    QrPayload {
        name: record.facts.full_name.clone(),
        aadhaar_digest: record.facts.identity_digest.clone(),
        tx: record.transaction_id.clone(),
    }
}

/// Parse scanned bytes. Never panics, whatever the input.
pub fn from_qr_payload(bytes: &[u8]) -> Result<QrPayload, PayloadError> {
    if bytes.len() > MAX_QR_PAYLOAD_BYTES {
        return Err(PayloadError::TooLarge);
    }
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| PayloadError::NotJson(e.to_string()))?;
    let Value::Object(obj) = value else {
        return Err(PayloadError::NotJson("top-level value is not an object".into()));
    };
    let field = |name: &'static str| -> Result<&str, PayloadError> {
        match obj.get(name) {
            None | Some(Value::Null) => Err(PayloadError::MissingField(name)),
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(_) => Err(PayloadError::InvalidField {
                field: name,
                reason: "not a string".into(),
            }),
        }
    };

    let tx = TransactionId::new(field("tx")?).map_err(|e| PayloadError::InvalidField {
        field: "tx",
        reason: e.to_string(),
    })?;
    let name = field("name")?;
    if name.trim().is_empty() {
        return Err(PayloadError::InvalidField {
            field: "name",
            reason: "empty".into(),
        });
    }
    let aadhaar_digest =
        IdentityDigest::new(field("aadhaarDigest")?).map_err(|e| PayloadError::InvalidField {
            field: "aadhaarDigest",
            reason: e.to_string(),
        })?;

    Ok(QrPayload {
        name: name.to_string(),
        aadhaar_digest,
        tx,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn facts(name: &str, digest: &str) -> IdentityFacts {
        IdentityFacts {
            full_name: name.into(),
            identity_digest: IdentityDigest::new(digest).unwrap(),
            issued_at: Timestamp::parse("2026-01-15T12:00:00Z").unwrap(),
        }
    }

    #[test]
    fn encode_uses_v1_keys_and_memo() {
        let set = encode(&facts("Asha Rao", "7812"), &PhotoReference::new("bafy123")).unwrap();
        let keys: Vec<&str> = set.entries.iter().map(|e| e.key()).collect();
        assert_eq!(keys, vec!["visitor_name", "datetime", "aadhaar_cid"]);
        assert_eq!(set.entries[1].value(), "2026-01-15T12:00:00Z");
        assert_eq!(set.memo.as_str(), "Gate:7812");
    }

    #[test]
    fn encode_rejects_empty_inputs() {
        let photo = PhotoReference::new("bafy123");
        assert_eq!(
            encode(&facts("  ", "7812"), &photo).unwrap_err(),
            EncodingError::EmptyName
        );
        assert_eq!(
            encode(&facts("Asha Rao", "7812"), &PhotoReference::new("")).unwrap_err(),
            EncodingError::MissingPhoto
        );
    }

    #[test]
    fn encode_rejects_long_name() {
        let err = encode(&facts(&"n".repeat(65), "7812"), &PhotoReference::new("bafy")).unwrap_err();
        assert_eq!(
            err,
            EncodingError::ValueTooLong {
                key: "visitor_name",
                len: 65
            }
        );
    }

    #[test]
    fn roundtrip_example() {
        let f = facts("Asha Rao", "7812");
        let p = PhotoReference::new("bafy123");
        let set = encode(&f, &p).unwrap();
        assert_eq!(decode(&set.entries, Some(set.memo.as_str())).unwrap(), (f, p));
    }

    #[test]
    fn decode_is_order_independent() {
        let set = encode(&facts("Asha Rao", "7812"), &PhotoReference::new("bafy123")).unwrap();
        let mut reversed = set.entries.clone();
        reversed.reverse();
        assert_eq!(
            decode(&reversed, Some(set.memo.as_str())).unwrap(),
            decode(&set.entries, Some(set.memo.as_str())).unwrap()
        );
    }

    #[test]
    fn decode_reports_missing_keys() {
        let set = encode(&facts("Asha Rao", "7812"), &PhotoReference::new("bafy123")).unwrap();
        let without_cid: Vec<_> = set.entries[..2].to_vec();
        assert_eq!(
            decode(&without_cid, Some("Gate:7812")).unwrap_err(),
            DecodingError::MissingKey("aadhaar_cid")
        );
        assert_eq!(
            decode(&set.entries, None).unwrap_err(),
            DecodingError::MissingKey("memo")
        );
    }

    #[test]
    fn decode_reports_malformed_values() {
        let entries = vec![
            DataEntry::new("visitor_name", "Asha Rao").unwrap(),
            DataEntry::new("datetime", "yesterday").unwrap(),
            DataEntry::new("aadhaar_cid", "bafy123").unwrap(),
        ];
        assert!(matches!(
            decode(&entries, Some("Gate:7812")),
            Err(DecodingError::MalformedValue { key: "datetime", .. })
        ));

        let mut ok = entries.clone();
        ok[1] = DataEntry::new("datetime", "2026-01-15T12:00:00Z").unwrap();
        assert!(matches!(
            decode(&ok, Some("Pass:7812")),
            Err(DecodingError::MalformedValue { key: "memo", .. })
        ));
        assert!(matches!(
            decode(&ok, Some("Gate:234567897812")),
            Err(DecodingError::MalformedValue { key: "memo", .. })
        ));
    }

    #[test]
    fn decode_rejects_duplicate_keys() {
        let entries = vec![
            DataEntry::new("visitor_name", "Asha Rao").unwrap(),
            DataEntry::new("visitor_name", "Other Person").unwrap(),
        ];
        assert!(matches!(
            decode(&entries, Some("Gate:7812")),
            Err(DecodingError::MalformedValue { key: "visitor_name", .. })
        ));
    }

    #[test]
    fn decode_ignores_foreign_keys() {
        let mut set = encode(&facts("Asha Rao", "7812"), &PhotoReference::new("bafy123")).unwrap();
        set.entries.push(DataEntry::new("unrelated", "x").unwrap());
        assert!(decode(&set.entries, Some(set.memo.as_str())).is_ok());
    }

    #[test]
    fn pass_id_lookup() {
        let entries = vec![DataEntry::new("gate_pass_id", "GP-ABC").unwrap()];
        assert_eq!(pass_id(&entries).unwrap().as_str(), "GP-ABC");
        assert_eq!(
            pass_id(&[]).unwrap_err(),
            DecodingError::MissingKey("gate_pass_id")
        );
    }

    #[test]
    fn qr_payload_parses_and_renders() {
        let raw = br#"{"name":"Asha Rao","aadhaarDigest":"7812","tx":"T1"}"#;
        let payload = from_qr_payload(raw).unwrap();
        assert_eq!(payload.name, "Asha Rao");
        assert_eq!(payload.tx.as_str(), "T1");
        assert_eq!(from_qr_payload(payload.to_json().as_bytes()).unwrap(), payload);
    }

    #[test]
    fn qr_payload_errors() {
        assert!(matches!(from_qr_payload(b"not json"), Err(PayloadError::NotJson(_))));
        assert!(matches!(from_qr_payload(b"[1,2]"), Err(PayloadError::NotJson(_))));
        assert_eq!(
            from_qr_payload(br#"{"name":"A","aadhaarDigest":"7812"}"#).unwrap_err(),
            PayloadError::MissingField("tx")
        );
        assert_eq!(
            from_qr_payload(br#"{"aadhaarDigest":"7812","tx":"T1"}"#).unwrap_err(),
            PayloadError::MissingField("name")
        );
        assert_eq!(
            from_qr_payload(br#"{"name":"A","tx":"T1"}"#).unwrap_err(),
            PayloadError::MissingField("aadhaarDigest")
        );
        assert!(matches!(
            from_qr_payload(br#"{"name":"A","aadhaarDigest":"7812","tx":"../accounts"}"#),
            Err(PayloadError::InvalidField { field: "tx", .. })
        ));
        assert!(matches!(
            from_qr_payload(br#"{"name":"A","aadhaarDigest":"234567897812","tx":"T1"}"#),
            Err(PayloadError::InvalidField { field: "aadhaarDigest", .. })
        ));
        assert!(matches!(
            from_qr_payload(br#"{"name":5,"aadhaarDigest":"7812","tx":"T1"}"#),
            Err(PayloadError::InvalidField { field: "name", .. })
        ));
        let huge = vec![b' '; MAX_QR_PAYLOAD_BYTES + 1];
        assert_eq!(from_qr_payload(&huge).unwrap_err(), PayloadError::TooLarge);
    }

    fn arb_facts() -> impl Strategy<Value = (IdentityFacts, PhotoReference)> {
        (
            "[A-Za-z][A-Za-z .'-]{0,40}",
            "[a-f0-9]{4,16}",
            0i64..4_000_000_000,
            "bafy[a-z2-7]{10,50}",
        )
            .prop_filter_map("digest must be representable", |(name, digest, secs, cid)| {
                let identity_digest = IdentityDigest::new(digest).ok()?;
                Some((
                    IdentityFacts {
                        full_name: name,
                        identity_digest,
                        issued_at: Timestamp::from_epoch_secs(secs).ok()?,
                    },
                    PhotoReference::new(cid),
                ))
            })
    }

    proptest! {
        #[test]
        fn decode_inverts_encode((f, p) in arb_facts()) {
            let set = encode(&f, &p).unwrap();
            let decoded = decode(&set.entries, Some(set.memo.as_str())).unwrap();
            prop_assert_eq!(decoded.clone(), (f, p));
            prop_assert_eq!(decode(&set.entries, Some(set.memo.as_str())).unwrap(), decoded);
        }

        #[test]
        fn qr_parser_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let _ = from_qr_payload(&bytes);
        }

        #[test]
        fn qr_payload_carries_only_the_digest((f, _p) in arb_facts(), tx in "[A-Za-z0-9]{1,64}") {
            let record = PassRecord {
                transaction_id: TransactionId::new(tx).unwrap(),
                pass_id: PassId::generate(),
                issued_at: f.issued_at,
                facts: f.clone(),
                photo: PhotoReference::new("bafy123"),
            };
            let json = to_qr_payload(&record).to_json();
            let value: Value = serde_json::from_str(&json).unwrap();
            let obj = value.as_object().unwrap();
            prop_assert_eq!(obj.len(), 3);
            prop_assert!(!json.contains("bafy123"));
            prop_assert_eq!(obj["aadhaarDigest"].as_str().unwrap(), f.identity_digest.as_str());
        }
    }
}
