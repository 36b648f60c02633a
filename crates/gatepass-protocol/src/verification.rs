//! # Verification Engine
//!
//! Derives a verdict for scanned QR bytes using only ledger queries.
//!
//! One attempt is a typestate machine. Each state is a distinct type, so a
//! transition can only be called once its inputs exist:
//!
//! ```text
//! Start ──decode_payload()──▶ PayloadDecoded ──fetch_transaction()──▶ TxFetched
//!                                                                      │
//!                                                          fetch_entries()
//!                                                                      ▼
//!            Verdict ◀──conclude()── Reconciled ◀──reconcile()── EntriesFetched
//! ```
//!
//! Any transition may stop early with a verdict. A ledger outage stops with
//! [`VerificationError::LedgerUnavailable`], which is retryable and is never
//! reported as `NotFound`. Nothing is retained between attempts.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatepass_core::{IdentityFacts, PassId, PhotoReference, Timestamp, TransactionId};
use gatepass_ledger::{DataEntry, LedgerRpc, QueryError, TxRecord};

use crate::codec::{self, EntryVocabulary, QrPayload};

/// Why a pass failed verification.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidReason {
    #[error("QR payload is malformed: {detail}")]
    MalformedPayload { detail: String },
    #[error("ledger records the transaction as failed")]
    TransactionFailed,
    #[error("transaction source {source_account} is not a trusted issuer")]
    UntrustedIssuer { source_account: String },
    #[error("transaction carries no gate pass entries")]
    NoEntries,
    #[error("gate pass entries are malformed: {detail}")]
    MalformedEntries { detail: String },
    #[error("QR field {field} does not match the ledger")]
    FieldMismatch { field: String },
    #[error("pass expired at {valid_until}")]
    Expired { valid_until: Timestamp },
}

/// Outcome of verifying one QR payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum VerificationVerdict {
    Valid {
        pass_id: PassId,
        holder_name: String,
        issue_date: Timestamp,
        valid_until: Timestamp,
        /// Read from the ledger entries, never from the QR payload.
        photo: PhotoReference,
        transaction_id: TransactionId,
    },
    Invalid {
        reason: InvalidReason,
    },
    NotFound,
}

impl VerificationVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Valid { .. } => "valid",
            Self::Invalid { .. } => "invalid",
            Self::NotFound => "not_found",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The ledger could not be queried. Retry later.
    #[error("ledger unavailable: {reason}")]
    LedgerUnavailable { reason: String },
}

// ─── Attempt states ──────────────────────────────────────────────────

trait AttemptState {
    const NAME: &'static str;
}

#[derive(Debug)]
struct Start<'a> {
    qr: &'a [u8],
}

#[derive(Debug)]
struct PayloadDecoded {
    payload: QrPayload,
}

#[derive(Debug)]
struct TxFetched {
    payload: QrPayload,
    tx: TxRecord,
}

#[derive(Debug)]
struct EntriesFetched {
    payload: QrPayload,
    tx: TxRecord,
    entries: Vec<DataEntry>,
}

#[derive(Debug)]
struct Reconciled {
    pass_id: PassId,
    facts: IdentityFacts,
    photo: PhotoReference,
    transaction_id: TransactionId,
}

impl AttemptState for Start<'_> {
    const NAME: &'static str = "start";
}
impl AttemptState for PayloadDecoded {
    const NAME: &'static str = "payload_decoded";
}
impl AttemptState for TxFetched {
    const NAME: &'static str = "tx_fetched";
}
impl AttemptState for EntriesFetched {
    const NAME: &'static str = "entries_fetched";
}
impl AttemptState for Reconciled {
    const NAME: &'static str = "reconciled";
}

/// Why an attempt stopped before reaching a `Valid` verdict.
#[derive(Debug)]
enum Stopped {
    Verdict(VerificationVerdict),
    Unavailable(VerificationError),
}

impl Stopped {
    fn invalid(reason: InvalidReason) -> Self {
        Self::Verdict(VerificationVerdict::Invalid { reason })
    }

    fn unavailable(error: QueryError) -> Self {
        Self::Unavailable(VerificationError::LedgerUnavailable {
            reason: error.to_string(),
        })
    }
}

#[derive(Debug)]
struct Attempt<S> {
    now: Timestamp,
    state: S,
}

impl<S: AttemptState> Attempt<S> {
    fn advance<N: AttemptState>(self, next: impl FnOnce(S) -> N) -> Attempt<N> {
        tracing::debug!(from = S::NAME, to = N::NAME, "verification transition");
        Attempt {
            now: self.now,
            state: next(self.state),
        }
    }
}

impl<'a> Attempt<Start<'a>> {
    fn new(qr: &'a [u8], now: Timestamp) -> Self {
        Self {
            now,
            state: Start { qr },
        }
    }

    fn decode_payload(self) -> Result<Attempt<PayloadDecoded>, Stopped> {
        let payload = codec::from_qr_payload(self.state.qr).map_err(|e| {
            Stopped::invalid(InvalidReason::MalformedPayload {
                detail: e.to_string(),
            })
        })?;
        Ok(self.advance(|_| PayloadDecoded { payload }))
    }
}

impl Attempt<PayloadDecoded> {
    async fn fetch_transaction(
        self,
        rpc: &dyn LedgerRpc,
        trusted_issuers: Option<&[String]>,
    ) -> Result<Attempt<TxFetched>, Stopped> {
        let tx = match rpc.get_transaction(&self.state.payload.tx).await {
            Ok(tx) => tx,
            Err(QueryError::NotFound) => {
                return Err(Stopped::Verdict(VerificationVerdict::NotFound))
            }
            Err(e) => return Err(Stopped::unavailable(e)),
        };
        if !tx.successful {
            return Err(Stopped::invalid(InvalidReason::TransactionFailed));
        }
        if let Some(trusted) = trusted_issuers {
            if !trusted.iter().any(|a| a == &tx.source_account) {
                return Err(Stopped::invalid(InvalidReason::UntrustedIssuer {
                    source_account: tx.source_account,
                }));
            }
        }
        Ok(self.advance(|s| TxFetched {
            payload: s.payload,
            tx,
        }))
    }
}

impl Attempt<TxFetched> {
    async fn fetch_entries(self, rpc: &dyn LedgerRpc) -> Result<Attempt<EntriesFetched>, Stopped> {
        let entries = match rpc.get_operations(&self.state.tx.id).await {
            Ok(entries) => entries,
            Err(QueryError::NotFound) => {
                return Err(Stopped::Verdict(VerificationVerdict::NotFound))
            }
            Err(QueryError::Malformed { reason }) => {
                return Err(Stopped::invalid(InvalidReason::MalformedEntries {
                    detail: reason,
                }))
            }
            Err(e) => return Err(Stopped::unavailable(e)),
        };

        let vocabulary = EntryVocabulary::CURRENT;
        let missing: Vec<&str> = vocabulary
            .keys()
            .iter()
            .copied()
            .filter(|k| !entries.iter().any(|e| e.key() == *k))
            .collect();
        if missing.len() == vocabulary.keys().len() {
            return Err(Stopped::invalid(InvalidReason::NoEntries));
        }
        if !missing.is_empty() {
            return Err(Stopped::invalid(InvalidReason::MalformedEntries {
                detail: format!("missing {}", missing.join(", ")),
            }));
        }

        Ok(self.advance(|TxFetched { payload, tx }| EntriesFetched {
            payload,
            tx,
            entries,
        }))
    }
}

impl Attempt<EntriesFetched> {
    fn reconcile(self) -> Result<Attempt<Reconciled>, Stopped> {
        let malformed = |detail: String| Stopped::invalid(InvalidReason::MalformedEntries { detail });
        let EntriesFetched {
            payload,
            tx,
            entries,
        } = &self.state;
        let (facts, photo) =
            codec::decode(entries, tx.memo.as_deref()).map_err(|e| malformed(e.to_string()))?;
        let pass_id = codec::pass_id(entries).map_err(|e| malformed(e.to_string()))?;

        if payload.name != facts.full_name {
            return Err(Stopped::invalid(InvalidReason::FieldMismatch {
                field: "name".into(),
            }));
        }
        if payload.aadhaar_digest != facts.identity_digest {
            return Err(Stopped::invalid(InvalidReason::FieldMismatch {
                field: "aadhaarDigest".into(),
            }));
        }

        let transaction_id = tx.id.clone();
        Ok(self.advance(|_| Reconciled {
            pass_id,
            facts,
            photo,
            transaction_id,
        }))
    }
}

impl Attempt<Reconciled> {
    fn conclude(self, validity: Duration) -> VerificationVerdict {
        let Reconciled {
            pass_id,
            facts,
            photo,
            transaction_id,
        } = self.state;
        let Some(valid_until) = facts.issued_at.checked_add(validity) else {
            return VerificationVerdict::Invalid {
                reason: InvalidReason::MalformedEntries {
                    detail: "validity window overflows".into(),
                },
            };
        };
        if self.now > valid_until {
            return VerificationVerdict::Invalid {
                reason: InvalidReason::Expired { valid_until },
            };
        }
        VerificationVerdict::Valid {
            pass_id,
            holder_name: facts.full_name,
            issue_date: facts.issued_at,
            valid_until,
            photo,
            transaction_id,
        }
    }
}

// ─── Engine ──────────────────────────────────────────────────────────

/// Stateless verifier shared across concurrent scans.
#[derive(Clone)]
pub struct VerificationEngine {
    rpc: Arc<dyn LedgerRpc>,
    validity: Duration,
    trusted_issuers: Option<Vec<String>>,
}

impl std::fmt::Debug for VerificationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationEngine")
            .field("validity", &self.validity)
            .field("trusted_issuers", &self.trusted_issuers)
            .finish_non_exhaustive()
    }
}

impl VerificationEngine {
    /// Passes are valid for one day from issuance.
    pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);

    pub fn new(rpc: Arc<dyn LedgerRpc>) -> Self {
        Self {
            rpc,
            validity: Self::DEFAULT_VALIDITY,
            trusted_issuers: None,
        }
    }

    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// Only accept transactions sourced by one of `accounts`.
    pub fn with_trusted_issuers(mut self, accounts: impl IntoIterator<Item = String>) -> Self {
        self.trusted_issuers = Some(accounts.into_iter().collect());
        self
    }

    pub async fn verify_pass(&self, qr: &[u8]) -> Result<VerificationVerdict, VerificationError> {
        self.verify_at(qr, Timestamp::now()).await
    }

    /// Verify as of `now`.
    pub async fn verify_at(
        &self,
        qr: &[u8],
        now: Timestamp,
    ) -> Result<VerificationVerdict, VerificationError> {
        match self.run(qr, now).await {
            Ok(verdict) | Err(Stopped::Verdict(verdict)) => {
                tracing::info!(verdict = verdict.label(), "pass verified");
                Ok(verdict)
            }
            Err(Stopped::Unavailable(e)) => {
                tracing::warn!(error = %e, "verification deferred");
                Err(e)
            }
        }
    }

    async fn run(&self, qr: &[u8], now: Timestamp) -> Result<VerificationVerdict, Stopped> {
        let rpc = self.rpc.as_ref();
        let verdict = Attempt::new(qr, now)
            .decode_payload()?
            .fetch_transaction(rpc, self.trusted_issuers.as_deref())
            .await?
            .fetch_entries(rpc)
            .await?
            .reconcile()?
            .conclude(self.validity);
        Ok(verdict)
    }
}
