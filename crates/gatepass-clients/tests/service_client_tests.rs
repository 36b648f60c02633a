//! # Extraction and Pinning Client Tests
//!
//! Runs [`HttpExtractionClient`] and [`PinataClient`] against wiremock
//! servers to check request construction, sentinel handling, and error
//! mapping.

use gatepass_clients::{
    ContentPinner, ExtractionError, HttpExtractionClient, IdentityExtractor, PinError,
    PinataClient, ServiceConfig,
};
use gatepass_core::{AadhaarNumber, DigestKey, IdentityDigest, PhotoReference};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ServiceConfig {
    ServiceConfig::local_mock(&server.uri(), DigestKey::new(b"test-pepper".to_vec()))
        .expect("config")
}

// ── Extraction ───────────────────────────────────────────────────────────

#[tokio::test]
async fn extraction_digests_the_identity_number() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ocr/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Face and Aadhaar data extracted successfully",
            "photoUrl": "http://localhost:3001/faces/1.jpg",
            "name": "Asha Rao",
            "dob": "01/01/1990",
            "aadhaarNumber": "2345 6789 7812"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpExtractionClient::new(&config(&server)).expect("client");
    let facts = client.extract(b"card-image").await.expect("extract");

    let number = AadhaarNumber::parse("234567897812").expect("number");
    let expected = IdentityDigest::derive(&number, &DigestKey::new(b"test-pepper".to_vec()));
    assert_eq!(facts.full_name, "Asha Rao");
    assert_eq!(facts.identity_digest, expected);
    assert!(!facts.identity_digest.as_str().contains("234567897812"));
}

#[tokio::test]
async fn extraction_sentinel_is_field_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ocr/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Asha Rao",
            "dob": "Not found",
            "aadhaarNumber": "Not found",
            "photoUrl": ""
        })))
        .mount(&server)
        .await;

    let client = HttpExtractionClient::new(&config(&server)).expect("client");
    let err = client.extract(b"card-image").await.unwrap_err();
    assert_eq!(
        err,
        ExtractionError::FieldNotFound {
            field: "aadhaarNumber"
        }
    );
}

#[tokio::test]
async fn extraction_masked_number_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ocr/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Asha Rao",
            "aadhaarNumber": "XXXX XXXX 7812"
        })))
        .mount(&server)
        .await;

    let client = HttpExtractionClient::new(&config(&server)).expect("client");
    let err = client.extract(b"card-image").await.unwrap_err();
    assert!(matches!(
        err,
        ExtractionError::InvalidField {
            field: "aadhaarNumber",
            ..
        }
    ));
}

#[tokio::test]
async fn extraction_client_error_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ocr/upload"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"error": "No face detected"})),
        )
        .mount(&server)
        .await;

    let client = HttpExtractionClient::new(&config(&server)).expect("client");
    let err = client.extract(b"card-image").await.unwrap_err();
    assert_eq!(
        err,
        ExtractionError::Rejected {
            reason: "No face detected".into()
        }
    );
}

#[tokio::test]
async fn extraction_server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ocr/upload"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = HttpExtractionClient::new(&config(&server)).expect("client");
    assert!(matches!(
        client.extract(b"card-image").await,
        Err(ExtractionError::Unavailable { .. })
    ));
}

// ── Pinning ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn pinning_sends_credentials_and_returns_cid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pinning/pinFileToIPFS"))
        .and(header("pinata_api_key", "test-key"))
        .and(header("pinata_secret_api_key", "test-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "IpfsHash": "bafy123",
            "PinSize": 1024,
            "Timestamp": "2026-01-15T12:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = PinataClient::new(&config(&server)).expect("client");
    let photo = client.pin(b"photo-bytes").await.expect("pin");
    assert_eq!(photo, PhotoReference::new("bafy123"));

    let url = client.resolve(&photo).expect("resolve");
    assert_eq!(url.as_str(), format!("{}/ipfs/bafy123", server.uri()));
}

#[tokio::test]
async fn pinning_unauthorized_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pinning/pinFileToIPFS"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
        .mount(&server)
        .await;

    let client = PinataClient::new(&config(&server)).expect("client");
    let err = client.pin(b"photo-bytes").await.unwrap_err();
    assert!(matches!(err, PinError::Rejected { reason } if reason.contains("Invalid API key")));
}

#[tokio::test]
async fn pinning_missing_hash_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pinning/pinFileToIPFS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let client = PinataClient::new(&config(&server)).expect("client");
    assert!(matches!(
        client.pin(b"photo-bytes").await,
        Err(PinError::Malformed { .. })
    ));
}
