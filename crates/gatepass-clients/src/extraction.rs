//! # Identity Extraction
//!
//! Calls an external document-analysis service with an identity card image
//! and turns its answer into [`IdentityFacts`].
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | POST   | `/api/ocr/upload` | multipart `aadhaar` | `{name, dob, aadhaarNumber, photoUrl}` |
//!
//! The service reports an unreadable field as the literal string
//! `"Not found"`. Either required field being unreadable fails extraction
//! with [`ExtractionError::FieldNotFound`] so the caller can prompt for a
//! better image.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use gatepass_core::retry::retry_send;
use gatepass_core::{AadhaarNumber, DigestKey, IdentityDigest, IdentityFacts, Timestamp};

use crate::config::{ConfigError, ServiceConfig};

/// Sentinel the service uses for unreadable fields.
const NOT_FOUND_SENTINEL: &str = "Not found";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// A required field could not be read from the image.
    #[error("{field} could not be read from the document")]
    FieldNotFound { field: &'static str },

    /// A field was read but is not usable (e.g. a masked identity number).
    #[error("{field} is not usable: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// The service refused the image.
    #[error("extraction service rejected the image: {reason}")]
    Rejected { reason: String },

    #[error("extraction service unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Turns a document image into identity facts.
#[async_trait]
pub trait IdentityExtractor: Send + Sync {
    async fn extract(&self, image: &[u8]) -> Result<IdentityFacts, ExtractionError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractionResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    aadhaar_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractionErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the document-analysis service.
#[derive(Debug, Clone)]
pub struct HttpExtractionClient {
    http: reqwest::Client,
    base_url: Url,
    digest_key: DigestKey,
}

impl HttpExtractionClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self {
            http,
            base_url: config.extraction_url.clone(),
            digest_key: config.digest_key.clone(),
        })
    }

    fn form(image: &[u8]) -> Form {
        Form::new().part(
            "aadhaar",
            Part::bytes(image.to_vec()).file_name("aadhaar.jpg"),
        )
    }
}

fn present(field: Option<String>) -> Option<String> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != NOT_FOUND_SENTINEL)
}

#[async_trait]
impl IdentityExtractor for HttpExtractionClient {
    async fn extract(&self, image: &[u8]) -> Result<IdentityFacts, ExtractionError> {
        let url = format!(
            "{}/api/ocr/upload",
            self.base_url.as_str().trim_end_matches('/')
        );
        let resp = retry_send("identity extraction", |_: &reqwest::Error| true, || {
            self.http.post(&url).multipart(Self::form(image)).send()
        })
        .await
        .map_err(|e| ExtractionError::Unavailable {
            reason: e.to_string(),
        })?;

        let status = resp.status();
        if status.is_client_error() {
            let body: ExtractionErrorBody = resp.json().await.unwrap_or_default();
            return Err(ExtractionError::Rejected {
                reason: body.error.unwrap_or_else(|| format!("HTTP {status}")),
            });
        }
        if !status.is_success() {
            return Err(ExtractionError::Unavailable {
                reason: format!("HTTP {status}"),
            });
        }

        let body: ExtractionResponse =
            resp.json()
                .await
                .map_err(|e| ExtractionError::Unavailable {
                    reason: format!("unreadable extraction response: {e}"),
                })?;

        let full_name =
            present(body.name).ok_or(ExtractionError::FieldNotFound { field: "name" })?;
        let raw_number = present(body.aadhaar_number).ok_or(ExtractionError::FieldNotFound {
            field: "aadhaarNumber",
        })?;
        let number =
            AadhaarNumber::parse(&raw_number).map_err(|e| ExtractionError::InvalidField {
                field: "aadhaarNumber",
                reason: e.to_string(),
            })?;
        let identity_digest = IdentityDigest::derive(&number, &self.digest_key);
        drop(number);

        tracing::info!(digest = %identity_digest, "identity facts extracted");
        Ok(IdentityFacts {
            full_name,
            identity_digest,
            issued_at: Timestamp::now(),
        })
    }
}

/// Extractor returning fixed facts, for tests and offline runs.
#[derive(Debug)]
pub struct StaticExtractor {
    outcome: Result<IdentityFacts, ExtractionError>,
    calls: Mutex<usize>,
}

impl StaticExtractor {
    pub fn new(facts: IdentityFacts) -> Self {
        Self {
            outcome: Ok(facts),
            calls: Mutex::new(0),
        }
    }

    pub fn failing(error: ExtractionError) -> Self {
        Self {
            outcome: Err(error),
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl IdentityExtractor for StaticExtractor {
    async fn extract(&self, _image: &[u8]) -> Result<IdentityFacts, ExtractionError> {
        *self.calls.lock() += 1;
        self.outcome.clone()
    }
}
