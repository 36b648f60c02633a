//! # Pass Transactions and Signed Envelopes
//!
//! An [`UnsignedPassTransaction`] is encoded once as a Stellar XDR
//! `Transaction`: one `ManageData` operation per entry, a text memo and
//! time-bound preconditions. Those bytes travel to the signing agent and
//! come back inside a [`SignedEnvelope`]. XDR has exactly one encoding per
//! value, and the envelope refuses to wrap bytes that do not re-encode
//! identically, so the bytes a signer approved are the bytes the ledger
//! receives.
//!
//! The hash that gets signed is the SHA-256 of the XDR
//! `TransactionSignaturePayload`: the network id (SHA-256 of the network
//! passphrase) followed by the tagged transaction.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use stellar_xdr::curr as xdr;
use thiserror::Error;
use xdr::{Limits, ReadXdr, WriteXdr};

use gatepass_core::{sha256, AccountId, Sha256Digest};

use crate::network::Network;

/// Maximum bytes in a data entry key or value.
pub const MAX_ENTRY_BYTES: usize = 64;

/// Maximum bytes in a text memo.
pub const MAX_MEMO_BYTES: usize = 28;

/// Maximum operations (and so entries) in one transaction.
pub const MAX_OPERATIONS: usize = 100;

/// Maximum signatures on one envelope.
pub const MAX_SIGNATURES: usize = 20;

/// Errors from constructing ledger fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error("data entry key must not be empty")]
    EmptyKey,
    #[error("data entry key {key:?} exceeds {MAX_ENTRY_BYTES} bytes (got {len})")]
    KeyTooLong { key: String, len: usize },
    #[error("value for data entry {key:?} exceeds {MAX_ENTRY_BYTES} bytes (got {len})")]
    ValueTooLong { key: String, len: usize },
    #[error("memo exceeds {MAX_MEMO_BYTES} bytes (got {len})")]
    MemoTooLong { len: usize },
}

/// Errors encoding or decoding envelopes and transaction bytes.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("envelope is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid XDR: {0}")]
    Xdr(#[from] xdr::Error),
    #[error("invalid {field}: {reason}")]
    Field { field: &'static str, reason: String },
    #[error("invalid data entry: {0}")]
    Entry(#[from] EntryError),
    #[error("unsupported {0}")]
    Unsupported(&'static str),
    #[error("transaction bytes are not in canonical XDR form")]
    NonCanonical,
}

impl EnvelopeError {
    fn field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Field {
            field,
            reason: reason.into(),
        }
    }
}

/// A named key/value field attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawEntry")]
pub struct DataEntry {
    key: String,
    value: String,
}

#[derive(Deserialize)]
struct RawEntry {
    key: String,
    value: String,
}

impl TryFrom<RawEntry> for DataEntry {
    type Error = EntryError;
    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        Self::new(raw.key, raw.value)
    }
}

impl DataEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, EntryError> {
        let key = key.into();
        let value = value.into();
        if key.is_empty() {
            return Err(EntryError::EmptyKey);
        }
        if key.len() > MAX_ENTRY_BYTES {
            let len = key.len();
            return Err(EntryError::KeyTooLong { key, len });
        }
        if value.len() > MAX_ENTRY_BYTES {
            return Err(EntryError::ValueTooLong {
                len: value.len(),
                key,
            });
        }
        Ok(Self { key, value })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Text memo attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Memo(String);

impl Memo {
    pub fn text(value: impl Into<String>) -> Result<Self, EntryError> {
        let value = value.into();
        if value.len() > MAX_MEMO_BYTES {
            return Err(EntryError::MemoTooLong { len: value.len() });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Memo {
    type Error = EntryError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::text(value)
    }
}

impl From<Memo> for String {
    fn from(value: Memo) -> String {
        value.0
    }
}

/// Validity window in Unix seconds. Zero means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeBounds {
    pub min_time: u64,
    pub max_time: u64,
}

impl TimeBounds {
    /// Valid from now until `max_time`.
    pub fn until(max_time: u64) -> Self {
        Self {
            min_time: 0,
            max_time,
        }
    }

    /// Whether the window has closed at `now` (Unix seconds).
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.max_time != 0 && now > self.max_time
    }
}

impl DataEntry {
    fn to_operation(&self) -> Result<xdr::Operation, EnvelopeError> {
        let name = xdr::StringM::<64>::try_from(self.key.as_bytes().to_vec())
            .map_err(|e| EnvelopeError::field("data name", e.to_string()))?;
        let value = xdr::BytesM::<64>::try_from(self.value.as_bytes().to_vec())
            .map_err(|e| EnvelopeError::field("data value", e.to_string()))?;
        Ok(xdr::Operation {
            source_account: None,
            body: xdr::OperationBody::ManageData(xdr::ManageDataOp {
                data_name: xdr::String64(name),
                data_value: Some(xdr::DataValue(value)),
            }),
        })
    }

    fn from_operation(op: &xdr::Operation) -> Result<Self, EnvelopeError> {
        if op.source_account.is_some() {
            return Err(EnvelopeError::Unsupported("operation source account"));
        }
        let xdr::OperationBody::ManageData(data) = &op.body else {
            return Err(EnvelopeError::Unsupported("operation type"));
        };
        let key = utf8("data name", data.data_name.0.as_slice())?;
        let value = match &data.data_value {
            Some(value) => utf8("data value", value.0.as_slice())?,
            None => String::new(),
        };
        Ok(Self::new(key, value)?)
    }
}

impl Memo {
    fn to_xdr(&self) -> Result<xdr::Memo, EnvelopeError> {
        if self.0.is_empty() {
            return Ok(xdr::Memo::None);
        }
        let text = xdr::StringM::<28>::try_from(self.0.as_bytes().to_vec())
            .map_err(|e| EnvelopeError::field("memo", e.to_string()))?;
        Ok(xdr::Memo::Text(text))
    }

    fn from_xdr(memo: &xdr::Memo) -> Result<Self, EnvelopeError> {
        match memo {
            xdr::Memo::None => Ok(Self(String::new())),
            xdr::Memo::Text(text) => Ok(Self::text(utf8("memo", text.as_slice())?)?),
            _ => Err(EnvelopeError::Unsupported("memo type")),
        }
    }
}

fn utf8(field: &'static str, bytes: &[u8]) -> Result<String, EnvelopeError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| EnvelopeError::field(field, e.to_string()))
}

/// An unsigned transaction carrying pass entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedPassTransaction {
    pub source_account: AccountId,
    pub sequence: u64,
    /// Total fee in stroops across all operations.
    pub fee: u32,
    /// Not part of the encoded bytes; bound in through the signed hash.
    pub network: Network,
    pub memo: Memo,
    pub entries: Vec<DataEntry>,
    pub time_bounds: TimeBounds,
}

impl UnsignedPassTransaction {
    /// The XDR transaction this pass transaction encodes to.
    pub fn to_transaction(&self) -> Result<xdr::Transaction, EnvelopeError> {
        let seq_num = i64::try_from(self.sequence)
            .map_err(|_| EnvelopeError::field("sequence", format!("{} exceeds i64", self.sequence)))?;
        let operations = self
            .entries
            .iter()
            .map(DataEntry::to_operation)
            .collect::<Result<Vec<_>, _>>()?;
        let operations = xdr::VecM::try_from(operations).map_err(|_| {
            EnvelopeError::field(
                "operations",
                format!("{} entries exceed {MAX_OPERATIONS}", self.entries.len()),
            )
        })?;
        Ok(xdr::Transaction {
            source_account: xdr::MuxedAccount::Ed25519(xdr::Uint256(
                *self.source_account.public_key(),
            )),
            fee: self.fee,
            seq_num: xdr::SequenceNumber(seq_num),
            cond: xdr::Preconditions::Time(xdr::TimeBounds {
                min_time: xdr::TimePoint(self.time_bounds.min_time),
                max_time: xdr::TimePoint(self.time_bounds.max_time),
            }),
            memo: self.memo.to_xdr()?,
            operations,
            ext: xdr::TransactionExt::V0,
        })
    }

    /// Read a pass transaction back out of an XDR transaction.
    ///
    /// Only what the builder emits is accepted: an unmuxed source, manage
    /// data operations without their own source, a text memo (or none) and
    /// time bounds (or none).
    pub fn from_transaction(tx: &xdr::Transaction, network: Network) -> Result<Self, EnvelopeError> {
        let xdr::MuxedAccount::Ed25519(xdr::Uint256(key)) = &tx.source_account else {
            return Err(EnvelopeError::Unsupported("muxed source account"));
        };
        let sequence = u64::try_from(tx.seq_num.0)
            .map_err(|_| EnvelopeError::field("sequence", format!("{} is negative", tx.seq_num.0)))?;
        let time_bounds = match &tx.cond {
            xdr::Preconditions::None => TimeBounds {
                min_time: 0,
                max_time: 0,
            },
            xdr::Preconditions::Time(tb) => TimeBounds {
                min_time: tb.min_time.0,
                max_time: tb.max_time.0,
            },
            xdr::Preconditions::V2(_) => return Err(EnvelopeError::Unsupported("v2 preconditions")),
        };
        let entries = tx
            .operations
            .as_slice()
            .iter()
            .map(DataEntry::from_operation)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            source_account: AccountId::from_public_key(*key),
            sequence,
            fee: tx.fee,
            network,
            memo: Memo::from_xdr(&tx.memo)?,
            entries,
            time_bounds,
        })
    }

    /// The exact bytes handed to a signing agent: the XDR `Transaction`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(self.to_transaction()?.to_xdr(Limits::none())?)
    }

    /// Parse transaction bytes as embedded in an envelope.
    pub fn from_bytes(bytes: &[u8], network: Network) -> Result<Self, EnvelopeError> {
        let tx = xdr::Transaction::from_xdr(bytes, Limits::none())?;
        Self::from_transaction(&tx, network)
    }

    /// One manage-data operation per entry.
    pub fn operation_count(&self) -> usize {
        self.entries.len()
    }

    /// Hash that a signer signs and the ledger uses as the transaction id.
    pub fn hash(&self) -> Result<Sha256Digest, EnvelopeError> {
        signature_payload_hash(&self.network, self.to_transaction()?)
    }
}

/// Hash of the signature payload for XDR transaction bytes on `network`.
pub fn transaction_hash(
    network: &Network,
    transaction_bytes: &[u8],
) -> Result<Sha256Digest, EnvelopeError> {
    let tx = xdr::Transaction::from_xdr(transaction_bytes, Limits::none())?;
    signature_payload_hash(network, tx)
}

fn signature_payload_hash(
    network: &Network,
    tx: xdr::Transaction,
) -> Result<Sha256Digest, EnvelopeError> {
    let payload = xdr::TransactionSignaturePayload {
        network_id: xdr::Hash(*network.network_id().as_bytes()),
        tagged_transaction: xdr::TransactionSignaturePayloadTaggedTransaction::Tx(tx),
    };
    Ok(sha256(&payload.to_xdr(Limits::none())?))
}

/// One decorated signature over a transaction hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeSignature {
    /// Last four bytes of the signer's public key.
    pub hint: [u8; 4],
    pub signature: Vec<u8>,
}

impl EnvelopeSignature {
    /// Signature by `public_key`, hinted the way the ledger expects.
    pub fn new(public_key: &[u8; 32], signature: Vec<u8>) -> Self {
        Self {
            hint: Self::hint_for(public_key),
            signature,
        }
    }

    pub fn hint_for(public_key: &[u8; 32]) -> [u8; 4] {
        [public_key[28], public_key[29], public_key[30], public_key[31]]
    }

    fn to_xdr(&self) -> Result<xdr::DecoratedSignature, EnvelopeError> {
        let signature = xdr::BytesM::<64>::try_from(self.signature.clone())
            .map_err(|e| EnvelopeError::field("signature", e.to_string()))?;
        Ok(xdr::DecoratedSignature {
            hint: xdr::SignatureHint(self.hint),
            signature: xdr::Signature(signature),
        })
    }
}

/// A signed transaction, opaque to everything except submission and
/// self-consistency checks.
///
/// The network is not part of the wire form; whoever decodes an envelope
/// says which network it was meant for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    network: Network,
    transaction: Vec<u8>,
    signatures: Vec<EnvelopeSignature>,
}

impl SignedEnvelope {
    pub fn new(network: Network, transaction: Vec<u8>, signatures: Vec<EnvelopeSignature>) -> Self {
        Self {
            network,
            transaction,
            signatures,
        }
    }

    /// Network the envelope was signed for.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// The embedded transaction bytes, untouched since the builder.
    pub fn transaction_bytes(&self) -> &[u8] {
        &self.transaction
    }

    pub fn signatures(&self) -> &[EnvelopeSignature] {
        &self.signatures
    }

    /// Decode the embedded bytes back into the transaction.
    pub fn transaction(&self) -> Result<UnsignedPassTransaction, EnvelopeError> {
        UnsignedPassTransaction::from_bytes(&self.transaction, self.network.clone())
    }

    /// Hash of the embedded transaction under the envelope's network.
    pub fn hash(&self) -> Result<Sha256Digest, EnvelopeError> {
        transaction_hash(&self.network, &self.transaction)
    }

    /// The XDR `TransactionEnvelope` this envelope stands for.
    pub fn to_xdr(&self) -> Result<xdr::TransactionEnvelope, EnvelopeError> {
        let tx = xdr::Transaction::from_xdr(&self.transaction, Limits::none())?;
        if tx.to_xdr(Limits::none())? != self.transaction {
            return Err(EnvelopeError::NonCanonical);
        }
        let signatures = self
            .signatures
            .iter()
            .map(EnvelopeSignature::to_xdr)
            .collect::<Result<Vec<_>, _>>()?;
        let signatures = xdr::VecM::try_from(signatures).map_err(|_| {
            EnvelopeError::field(
                "signatures",
                format!("{} exceed {MAX_SIGNATURES}", self.signatures.len()),
            )
        })?;
        Ok(xdr::TransactionEnvelope::Tx(xdr::TransactionV1Envelope {
            tx,
            signatures,
        }))
    }

    /// Base64 of the XDR envelope, as submitted to the ledger gateway.
    pub fn to_base64(&self) -> Result<String, EnvelopeError> {
        Ok(STANDARD.encode(self.to_xdr()?.to_xdr(Limits::none())?))
    }

    /// Decode a base64 XDR envelope that was signed for `network`.
    pub fn from_base64(encoded: &str, network: Network) -> Result<Self, EnvelopeError> {
        let raw = STANDARD.decode(encoded.trim())?;
        let xdr::TransactionEnvelope::Tx(envelope) =
            xdr::TransactionEnvelope::from_xdr(raw, Limits::none())?
        else {
            return Err(EnvelopeError::Unsupported("envelope type"));
        };
        let signatures = envelope
            .signatures
            .as_slice()
            .iter()
            .map(|sig| EnvelopeSignature {
                hint: sig.hint.0,
                signature: sig.signature.0.as_slice().to_vec(),
            })
            .collect();
        Ok(Self {
            network,
            transaction: envelope.tx.to_xdr(Limits::none())?,
            signatures,
        })
    }
}
