//! # Pass Issuer
//!
//! Orchestrates one issuance: extract and pin concurrently, encode, build,
//! sign, submit. Every failure is tagged with the [`IssuanceStage`] it came
//! from so callers know what to redo: re-upload after extraction or pinning
//! errors, refetch after build errors, and never blindly reissue after a
//! submission timeout.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatepass_clients::{ContentPinner, ExtractionError, IdentityExtractor, PinError};
use gatepass_core::{IdentityFacts, PassId, PassRecord, PhotoReference, Timestamp};
use gatepass_ledger::AccountAccessor;
use gatepass_signing::{SignerSession, SigningError};

use crate::builder::{BuildError, TransactionBuilder};
use crate::codec::{self, EncodingError, QrPayload};
use crate::submission::{SubmissionCoordinator, SubmissionError};

/// Step of the issuance pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuanceStage {
    Extraction,
    Pinning,
    Encoding,
    Build,
    Signing,
    Submission,
}

impl IssuanceStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extraction => "extraction",
            Self::Pinning => "pinning",
            Self::Encoding => "encoding",
            Self::Build => "build",
            Self::Signing => "signing",
            Self::Submission => "submission",
        }
    }
}

impl std::fmt::Display for IssuanceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum IssuanceError {
    #[error("identity extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("photo pinning failed: {0}")]
    Pinning(#[from] PinError),
    #[error("pass encoding failed: {0}")]
    Encoding(#[from] EncodingError),
    #[error("transaction build failed: {0}")]
    Build(BuildError),
    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),
    #[error("submission failed: {0}")]
    Submission(#[from] SubmissionError),
}

impl IssuanceError {
    pub fn stage(&self) -> IssuanceStage {
        match self {
            Self::Extraction(_) => IssuanceStage::Extraction,
            Self::Pinning(_) => IssuanceStage::Pinning,
            Self::Encoding(_) => IssuanceStage::Encoding,
            Self::Build(_) => IssuanceStage::Build,
            Self::Signing(_) => IssuanceStage::Signing,
            Self::Submission(_) => IssuanceStage::Submission,
        }
    }
}

impl From<BuildError> for IssuanceError {
    fn from(e: BuildError) -> Self {
        match e {
            BuildError::Encoding(inner) => Self::Encoding(inner),
            other => Self::Build(other),
        }
    }
}

/// Result of a successful issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedPass {
    pub record: PassRecord,
    pub qr_payload: QrPayload,
    /// Gateway URL for the pinned photo, for display at issuance time only.
    pub photo_url: Option<String>,
}

/// Issues passes against one ledger network.
#[derive(Clone)]
pub struct PassIssuer {
    extractor: Arc<dyn IdentityExtractor>,
    pinner: Arc<dyn ContentPinner>,
    accounts: Arc<dyn AccountAccessor>,
    builder: TransactionBuilder,
    coordinator: SubmissionCoordinator,
}

impl std::fmt::Debug for PassIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassIssuer")
            .field("builder", &self.builder)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl PassIssuer {
    pub fn new(
        extractor: Arc<dyn IdentityExtractor>,
        pinner: Arc<dyn ContentPinner>,
        accounts: Arc<dyn AccountAccessor>,
        builder: TransactionBuilder,
        coordinator: SubmissionCoordinator,
    ) -> Self {
        Self {
            extractor,
            pinner,
            accounts,
            builder,
            coordinator,
        }
    }

    pub fn pinner(&self) -> &dyn ContentPinner {
        self.pinner.as_ref()
    }

    /// Issue a pass from a document image.
    ///
    /// Extraction and pinning are independent and run concurrently. If both
    /// fail, the extraction error is reported.
    pub async fn issue_pass(
        &self,
        image: &[u8],
        session: &SignerSession,
    ) -> Result<IssuedPass, IssuanceError> {
        let (facts, photo) = tokio::join!(self.extractor.extract(image), self.pinner.pin(image));
        let facts = facts?;
        let photo = photo?;
        self.issue_from_facts(facts, photo, session).await
    }

    /// Issue a pass from already extracted facts and a pinned photo.
    pub async fn issue_from_facts(
        &self,
        facts: IdentityFacts,
        photo: PhotoReference,
        session: &SignerSession,
    ) -> Result<IssuedPass, IssuanceError> {
        if session.network() != self.builder.network() {
            return Err(SigningError::NetworkMismatch {
                requested: self.builder.network().name().to_string(),
                signed: session.network().name().to_string(),
            }
            .into());
        }

        let entry_set = codec::encode(&facts, &photo)?;
        let pass_id = PassId::generate();
        tracing::info!(
            pass_id = %pass_id,
            account = %session.account(),
            agent = session.gateway().agent_name(),
            "issuing pass"
        );

        let state = self
            .builder
            .prepare(self.accounts.as_ref(), session.account())
            .await?;
        let built = self
            .builder
            .assemble(entry_set, &pass_id, &state, Timestamp::now())?;
        let envelope = session.sign(&built.bytes).await?;
        let record = self
            .coordinator
            .submit(&envelope, &pass_id, &facts, &photo)
            .await?;

        let photo_url = match self.pinner.resolve(&record.photo) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "could not resolve photo url");
                None
            }
        };
        Ok(IssuedPass {
            qr_payload: codec::to_qr_payload(&record),
            record,
            photo_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatepass_clients::{InMemoryPinner, StaticExtractor};
    use gatepass_core::{AccountId, IdentityDigest};
    use gatepass_ledger::{InMemoryLedger, Network, SubmitError};
    use gatepass_signing::{MockOutcome, MockSigningAgent, SigningGateway};

    struct Fixture {
        issuer: PassIssuer,
        ledger: Arc<InMemoryLedger>,
        pinner: Arc<InMemoryPinner>,
        extractor: Arc<StaticExtractor>,
    }

    fn account() -> AccountId {
        AccountId::new("GAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQDZ7H").unwrap()
    }

    fn facts() -> IdentityFacts {
        IdentityFacts {
            full_name: "Asha Rao".into(),
            identity_digest: IdentityDigest::new("7812").unwrap(),
            issued_at: Timestamp::now(),
        }
    }

    fn fixture_with(extractor: StaticExtractor) -> Fixture {
        let ledger = Arc::new(
            InMemoryLedger::new(Network::Testnet)
                .with_sequential_ids("T")
                .with_account(account(), 10),
        );
        let pinner = Arc::new(InMemoryPinner::new(
            url::Url::parse("https://gateway.test").unwrap(),
        ));
        let extractor = Arc::new(extractor);
        let issuer = PassIssuer::new(
            extractor.clone(),
            pinner.clone(),
            ledger.clone(),
            TransactionBuilder::new(Network::Testnet),
            SubmissionCoordinator::new(ledger.clone()),
        );
        Fixture {
            issuer,
            ledger,
            pinner,
            extractor,
        }
    }

    fn session(outcomes: Vec<MockOutcome>, network: Network) -> SignerSession {
        let agent = Arc::new(MockSigningAgent::with_script(outcomes));
        SignerSession::new(account(), network, SigningGateway::new(agent))
    }

    #[tokio::test]
    async fn issues_pass_end_to_end() {
        let f = fixture_with(StaticExtractor::new(facts()));
        let issued = f
            .issuer
            .issue_pass(b"document-image", &session(vec![], Network::Testnet))
            .await
            .unwrap();
        assert_eq!(issued.record.transaction_id.as_str(), "T1");
        assert_eq!(issued.qr_payload.tx.as_str(), "T1");
        assert_eq!(issued.qr_payload.name, "Asha Rao");
        assert!(issued.record.pass_id.as_str().starts_with("GP-"));
        assert!(f.pinner.get(&issued.record.photo).is_some());
        assert!(issued
            .photo_url
            .unwrap()
            .ends_with(issued.record.photo.content_id.as_str()));
        assert_eq!(f.ledger.account_sequence(&account()), Some(11));
    }

    #[tokio::test]
    async fn extraction_failure_stops_before_ledger() {
        let f = fixture_with(StaticExtractor::failing(ExtractionError::FieldNotFound {
            field: "name",
        }));
        let err = f
            .issuer
            .issue_pass(b"blurry", &session(vec![], Network::Testnet))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), IssuanceStage::Extraction);
        assert_eq!(f.ledger.submit_count(), 0);
        assert_eq!(f.extractor.call_count(), 1);
    }

    #[tokio::test]
    async fn pinning_failure_is_tagged() {
        let f = fixture_with(StaticExtractor::new(facts()));
        f.pinner.set_failure(Some(PinError::Unavailable {
            reason: "down".into(),
        }));
        let err = f
            .issuer
            .issue_pass(b"img", &session(vec![], Network::Testnet))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), IssuanceStage::Pinning);
    }

    #[tokio::test]
    async fn empty_name_is_an_encoding_error() {
        let f = fixture_with(StaticExtractor::new(facts()));
        let mut bad = facts();
        bad.full_name = " ".into();
        let err = f
            .issuer
            .issue_from_facts(bad, PhotoReference::new("bafy123"), &session(vec![], Network::Testnet))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), IssuanceStage::Encoding);
    }

    #[tokio::test]
    async fn unknown_account_is_a_build_error() {
        let f = fixture_with(StaticExtractor::new(facts()));
        let agent = Arc::new(MockSigningAgent::new());
        let stranger = SignerSession::new(
            AccountId::new("GACAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAJJHP").unwrap(),
            Network::Testnet,
            SigningGateway::new(agent.clone()),
        );
        let err = f
            .issuer
            .issue_from_facts(facts(), PhotoReference::new("bafy123"), &stranger)
            .await
            .unwrap_err();
        assert!(matches!(err, IssuanceError::Build(BuildError::StaleAccountState { .. })));
        assert_eq!(agent.call_count(), 0);
    }

    #[tokio::test]
    async fn rejected_signature_is_never_submitted() {
        let f = fixture_with(StaticExtractor::new(facts()));
        let err = f
            .issuer
            .issue_from_facts(
                facts(),
                PhotoReference::new("bafy123"),
                &session(vec![MockOutcome::Reject], Network::Testnet),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IssuanceError::Signing(SigningError::UserRejected { .. })
        ));
        assert_eq!(f.ledger.submit_count(), 0);
    }

    #[tokio::test]
    async fn session_on_wrong_network_is_refused_upfront() {
        let f = fixture_with(StaticExtractor::new(facts()));
        let err = f
            .issuer
            .issue_from_facts(
                facts(),
                PhotoReference::new("bafy123"),
                &session(vec![], Network::Public),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IssuanceError::Signing(SigningError::NetworkMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn ledger_rejection_is_tagged_submission() {
        let f = fixture_with(StaticExtractor::new(facts()));
        f.ledger.fail_next_submit(SubmitError::Rejected {
            code: "tx_insufficient_balance".into(),
        });
        let err = f
            .issuer
            .issue_from_facts(facts(), PhotoReference::new("bafy123"), &session(vec![], Network::Testnet))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), IssuanceStage::Submission);
        assert_eq!(f.ledger.submit_count(), 1);
    }

    #[test]
    fn stage_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(IssuanceStage::Submission).unwrap(),
            "submission"
        );
        assert_eq!(IssuanceStage::Build.to_string(), "build");
    }
}
