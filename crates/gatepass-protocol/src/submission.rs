//! # Submission Coordinator
//!
//! Submits a signed envelope exactly once and turns acceptance into a
//! [`PassRecord`].
//!
//! Submission is not idempotent from the caller's point of view: a timed
//! out submission may still land. The coordinator therefore never retries.
//! On [`SubmissionError::Timeout`] the outcome is unknown and the caller
//! must not reissue blindly.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use gatepass_core::{IdentityFacts, PassId, PassRecord, PhotoReference, Timestamp};
use gatepass_ledger::{LedgerRpc, SignedEnvelope, SubmitError};

use crate::codec;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("ledger rejected the transaction: {code}")]
    Rejected { code: String },
    /// Outcome unknown; the transaction may have been accepted.
    #[error("submission timed out; outcome unknown")]
    Timeout,
    #[error("ledger unreachable: {reason}")]
    NetworkUnavailable { reason: String },
    #[error("transaction validity window closed before submission")]
    Expired,
    #[error("signed envelope does not carry the expected pass: {reason}")]
    EnvelopeMismatch { reason: String },
}

/// Submits signed pass transactions.
#[derive(Clone)]
pub struct SubmissionCoordinator {
    rpc: Arc<dyn LedgerRpc>,
    timeout: Duration,
}

impl std::fmt::Debug for SubmissionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionCoordinator")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SubmissionCoordinator {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(rpc: Arc<dyn LedgerRpc>) -> Self {
        Self {
            rpc,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Submit `envelope` and return the record of the accepted pass.
    ///
    /// The envelope's embedded entries must decode to `facts` and `photo`
    /// and carry `pass_id`, otherwise nothing is submitted.
    pub async fn submit(
        &self,
        envelope: &SignedEnvelope,
        pass_id: &PassId,
        facts: &IdentityFacts,
        photo: &PhotoReference,
    ) -> Result<PassRecord, SubmissionError> {
        let tx = envelope
            .transaction()
            .map_err(|e| SubmissionError::EnvelopeMismatch {
                reason: e.to_string(),
            })?;
        let mismatch = |reason: String| SubmissionError::EnvelopeMismatch { reason };
        let (decoded_facts, decoded_photo) =
            codec::decode(&tx.entries, Some(tx.memo.as_str())).map_err(|e| mismatch(e.to_string()))?;
        let decoded_id = codec::pass_id(&tx.entries).map_err(|e| mismatch(e.to_string()))?;
        if &decoded_facts != facts || &decoded_photo != photo {
            return Err(mismatch("entries differ from the issued facts".into()));
        }
        if &decoded_id != pass_id {
            return Err(mismatch(format!("pass id {decoded_id} differs from {pass_id}")));
        }

        let now = u64::try_from(Timestamp::now().epoch_secs()).unwrap_or(0);
        if tx.time_bounds.is_expired_at(now) {
            tracing::warn!(pass_id = %pass_id, "transaction expired before submission");
            return Err(SubmissionError::Expired);
        }

        let hash = envelope.hash().map_err(|e| mismatch(e.to_string()))?;
        tracing::info!(pass_id = %pass_id, hash = %hash, "submitting pass transaction");
        let response = match tokio::time::timeout(self.timeout, self.rpc.submit(envelope)).await {
            Ok(Ok(response)) => response,
            Ok(Err(SubmitError::Rejected { code })) => {
                tracing::warn!(pass_id = %pass_id, code = %code, "ledger rejected pass");
                return Err(SubmissionError::Rejected { code });
            }
            Ok(Err(SubmitError::Timeout)) | Err(_) => {
                tracing::warn!(pass_id = %pass_id, "submission outcome unknown");
                return Err(SubmissionError::Timeout);
            }
            Ok(Err(SubmitError::Unavailable { reason })) => {
                return Err(SubmissionError::NetworkUnavailable { reason });
            }
        };

        tracing::info!(
            pass_id = %pass_id,
            transaction_id = %response.transaction_id,
            "pass anchored on ledger"
        );
        Ok(PassRecord {
            transaction_id: response.transaction_id,
            pass_id: pass_id.clone(),
            facts: facts.clone(),
            photo: photo.clone(),
            issued_at: facts.issued_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatepass_core::{AccountId, IdentityDigest};
    use gatepass_ledger::{AccountState, EnvelopeSignature, Fee, InMemoryLedger, Network};

    use crate::builder::{LedgerState, TransactionBuilder};

    struct Fixture {
        ledger: Arc<InMemoryLedger>,
        coordinator: SubmissionCoordinator,
        facts: IdentityFacts,
        photo: PhotoReference,
        pass_id: PassId,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(
            InMemoryLedger::new(Network::Testnet)
                .with_sequential_ids("T")
                .with_account(account(), 10),
        );
        Fixture {
            coordinator: SubmissionCoordinator::new(ledger.clone()),
            ledger,
            facts: IdentityFacts {
                full_name: "Asha Rao".into(),
                identity_digest: IdentityDigest::new("7812").unwrap(),
                issued_at: Timestamp::parse("2026-01-15T12:00:00Z").unwrap(),
            },
            photo: PhotoReference::new("bafy123"),
            pass_id: PassId::new("GP-1").unwrap(),
        }
    }

    fn account() -> AccountId {
        AccountId::new("GAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQDZ7H").unwrap()
    }

    fn envelope(f: &Fixture, now: Timestamp) -> SignedEnvelope {
        let state = LedgerState {
            account: AccountState {
                account_id: account(),
                sequence: 10,
            },
            base_fee: Fee(100),
        };
        let built = TransactionBuilder::new(Network::Testnet)
            .build_at(&f.facts, &f.photo, &f.pass_id, &state, now)
            .unwrap();
        SignedEnvelope::new(
            Network::Testnet,
            built.bytes,
            vec![EnvelopeSignature::new(account().public_key(), vec![0; 64])],
        )
    }

    #[tokio::test]
    async fn accepted_submission_yields_record() {
        let f = fixture();
        let record = f
            .coordinator
            .submit(&envelope(&f, Timestamp::now()), &f.pass_id, &f.facts, &f.photo)
            .await
            .unwrap();
        assert_eq!(record.transaction_id.as_str(), "T1");
        assert_eq!(record.facts, f.facts);
        assert_eq!(record.issued_at, f.facts.issued_at);
        assert_eq!(f.ledger.submit_count(), 1);
    }

    #[tokio::test]
    async fn rejection_is_not_retried() {
        let f = fixture();
        f.ledger.fail_next_submit(SubmitError::Rejected {
            code: "tx_bad_seq".into(),
        });
        let err = f
            .coordinator
            .submit(&envelope(&f, Timestamp::now()), &f.pass_id, &f.facts, &f.photo)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SubmissionError::Rejected {
                code: "tx_bad_seq".into()
            }
        );
        assert_eq!(f.ledger.submit_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_ledger_times_out_once() {
        let f = fixture();
        f.ledger.set_submit_delay(Some(Duration::from_secs(60)));
        let coordinator = f.coordinator.clone().with_timeout(Duration::from_secs(5));
        let err = coordinator
            .submit(&envelope(&f, Timestamp::now()), &f.pass_id, &f.facts, &f.photo)
            .await
            .unwrap_err();
        assert_eq!(err, SubmissionError::Timeout);
        assert_eq!(f.ledger.submit_count(), 1);
    }

    #[tokio::test]
    async fn offline_ledger_is_unavailable() {
        let f = fixture();
        f.ledger.set_offline(true);
        let err = f
            .coordinator
            .submit(&envelope(&f, Timestamp::now()), &f.pass_id, &f.facts, &f.photo)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::NetworkUnavailable { .. }));
    }

    #[tokio::test]
    async fn expired_envelope_is_not_submitted() {
        let f = fixture();
        let stale = Timestamp::parse("2020-01-01T00:00:00Z").unwrap();
        let err = f
            .coordinator
            .submit(&envelope(&f, stale), &f.pass_id, &f.facts, &f.photo)
            .await
            .unwrap_err();
        assert_eq!(err, SubmissionError::Expired);
        assert_eq!(f.ledger.submit_count(), 0);
    }

    #[tokio::test]
    async fn mismatched_facts_are_not_submitted() {
        let f = fixture();
        let env = envelope(&f, Timestamp::now());
        let mut other = f.facts.clone();
        other.full_name = "Other Person".into();
        let err = f
            .coordinator
            .submit(&env, &f.pass_id, &other, &f.photo)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::EnvelopeMismatch { .. }));

        let err = f
            .coordinator
            .submit(&env, &PassId::new("GP-2").unwrap(), &f.facts, &f.photo)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::EnvelopeMismatch { .. }));
        assert_eq!(f.ledger.submit_count(), 0);
    }
}
