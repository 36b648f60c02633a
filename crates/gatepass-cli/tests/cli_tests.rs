//! Offline issuance and verification through the CLI library surface.

use std::sync::Arc;

use gatepass_cli::issue::issue_offline;
use gatepass_cli::keys::digest_of;
use gatepass_cli::verify::{exit_code, verify_with};
use gatepass_core::{DigestKey, IdentityFacts, Timestamp};
use gatepass_ledger::{InMemoryLedger, Network};
use gatepass_protocol::VerificationVerdict;
use gatepass_signing::LocalKeyAgent;

fn facts() -> IdentityFacts {
    let key = DigestKey::new(b"cli-test".to_vec());
    IdentityFacts {
        full_name: "Asha Rao".into(),
        identity_digest: digest_of("2345 6789 7812", &key).unwrap(),
        issued_at: Timestamp::now(),
    }
}

#[tokio::test]
async fn offline_issue_yields_valid_verdict() {
    let image = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(image.path(), b"jpeg-bytes").unwrap();
    let bytes = std::fs::read(image.path()).unwrap();

    let output = issue_offline(&bytes, facts(), LocalKeyAgent::generate(Network::Testnet))
        .await
        .unwrap();

    assert_eq!(output.pass.facts.full_name, "Asha Rao");
    assert!(output.photo_url.as_deref().unwrap().starts_with("https://gateway.pinata.cloud/"));
    let qr: serde_json::Value = serde_json::from_str(&output.qr_payload).unwrap();
    assert_eq!(qr["tx"], output.pass.transaction_id.as_str());
    match output.verdict.unwrap() {
        VerificationVerdict::Valid { holder_name, .. } => assert_eq!(holder_name, "Asha Rao"),
        other => panic!("expected valid verdict, got {other:?}"),
    }
}

#[tokio::test]
async fn offline_issue_accepts_seeded_agent() {
    let seed = LocalKeyAgent::generate(Network::Testnet).seed_hex().to_string();
    let a = LocalKeyAgent::from_seed_hex(&seed, Network::Testnet).unwrap();
    let output = issue_offline(b"img", facts(), a).await.unwrap();
    let rendered = serde_json::to_value(&output).unwrap();
    assert_eq!(rendered["verdict"]["verdict"], "valid");
    assert!(rendered["pass"]["transaction_id"].is_string());
}

#[tokio::test]
async fn unknown_transaction_exits_nonzero() {
    let ledger = Arc::new(InMemoryLedger::new(Network::Testnet));
    let qr = br#"{"name":"Asha Rao","aadhaarDigest":"7812","tx":"MISSING"}"#;
    let verdict = verify_with(ledger, qr, &[]).await.unwrap();
    assert_eq!(verdict, VerificationVerdict::NotFound);
    assert_eq!(exit_code(&verdict), 2);
}

#[tokio::test]
async fn garbage_payload_is_invalid_not_an_error() {
    let ledger = Arc::new(InMemoryLedger::new(Network::Testnet));
    let verdict = verify_with(ledger, b"not json", &[]).await.unwrap();
    assert!(!verdict.is_valid());
    assert_eq!(exit_code(&verdict), 2);
}
