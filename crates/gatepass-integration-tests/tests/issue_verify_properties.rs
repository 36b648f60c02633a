//! Property: any pass the issuer accepts verifies as valid for the same
//! holder, and any other name on the QR code is caught.

use std::sync::Arc;

use gatepass_core::{AccountId, IdentityDigest, IdentityFacts, PassId, PhotoReference, Timestamp};
use gatepass_ledger::{InMemoryLedger, Network};
use gatepass_protocol::{
    InvalidReason, SubmissionCoordinator, TransactionBuilder, VerificationEngine,
    VerificationVerdict,
};
use gatepass_signing::{MockSigningAgent, SignerSession, SigningGateway};
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn anchor(ledger: &Arc<InMemoryLedger>, facts: &IdentityFacts) -> String {
    let account = AccountId::new("GAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQDZ7H").unwrap();
    let builder = TransactionBuilder::new(Network::Testnet);
    let session = SignerSession::new(
        account.clone(),
        Network::Testnet,
        SigningGateway::new(Arc::new(MockSigningAgent::new())),
    );
    let photo = PhotoReference::new("bafy123");
    let pass_id = PassId::generate();
    let state = builder.prepare(ledger.as_ref(), &account).await.unwrap();
    let built = builder.build(facts, &photo, &pass_id, &state).unwrap();
    let envelope = session.sign(&built.bytes).await.unwrap();
    let record = SubmissionCoordinator::new(ledger.clone())
        .submit(&envelope, &pass_id, facts, &photo)
        .await
        .unwrap();
    record.transaction_id.to_string()
}

fn qr(name: &str, digest: &str, tx: &str) -> Vec<u8> {
    serde_json::json!({"name": name, "aadhaarDigest": digest, "tx": tx})
        .to_string()
        .into_bytes()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn issued_pass_verifies(
        name in "[A-Za-z][A-Za-z.'-]{0,20}( [A-Za-z]{1,20})?",
        digest in "[a-f0-9]{16}",
    ) {
        prop_assume!(IdentityDigest::new(digest.clone()).is_ok());
        let rt = runtime();
        let verdict = rt.block_on(async {
            let ledger = Arc::new(
                InMemoryLedger::new(Network::Testnet)
                    .with_account(AccountId::new("GAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQDZ7H").unwrap(), 0),
            );
            let facts = IdentityFacts {
                full_name: name.clone(),
                identity_digest: IdentityDigest::new(digest.clone()).unwrap(),
                issued_at: Timestamp::now(),
            };
            let tx = anchor(&ledger, &facts).await;
            VerificationEngine::new(ledger).verify_pass(&qr(&name, &digest, &tx)).await.unwrap()
        });
        match verdict {
            VerificationVerdict::Valid { holder_name, .. } => prop_assert_eq!(holder_name, name),
            other => prop_assert!(false, "expected valid, got {:?}", other),
        }
    }

    #[test]
    fn other_name_never_verifies(
        name in "[A-Za-z]{1,20}",
        impostor in "[A-Za-z]{1,20}",
    ) {
        prop_assume!(name != impostor);
        let rt = runtime();
        let verdict = rt.block_on(async {
            let ledger = Arc::new(
                InMemoryLedger::new(Network::Testnet)
                    .with_account(AccountId::new("GAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQDZ7H").unwrap(), 0),
            );
            let facts = IdentityFacts {
                full_name: name.clone(),
                identity_digest: IdentityDigest::new("7812").unwrap(),
                issued_at: Timestamp::now(),
            };
            let tx = anchor(&ledger, &facts).await;
            VerificationEngine::new(ledger).verify_pass(&qr(&impostor, "7812", &tx)).await.unwrap()
        });
        prop_assert_eq!(
            verdict,
            VerificationVerdict::Invalid {
                reason: InvalidReason::FieldMismatch { field: "name".into() }
            }
        );
    }
}
