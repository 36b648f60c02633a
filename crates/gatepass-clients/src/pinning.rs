//! # Content Pinning
//!
//! Uploads the holder's photo to a content-addressed store and resolves a
//! [`PhotoReference`] back to a fetchable URL.
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | POST   | `/pinning/pinFileToIPFS` | multipart `file` | `{IpfsHash}` |
//!
//! Credentials go in the `pinata_api_key` / `pinata_secret_api_key`
//! headers. Resolution is `{gateway}/ipfs/{cid}`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use gatepass_core::retry::retry_send;
use gatepass_core::{sha256, PhotoReference};

use crate::config::{ConfigError, ServiceConfig};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PinError {
    #[error("pinning service rejected the upload: {reason}")]
    Rejected { reason: String },
    #[error("pinning service unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("malformed pinning response: {reason}")]
    Malformed { reason: String },
    #[error("content id {0:?} cannot be resolved to a URL")]
    InvalidContentId(String),
}

/// Content-addressed storage for holder photos.
#[async_trait]
pub trait ContentPinner: Send + Sync {
    async fn pin(&self, image: &[u8]) -> Result<PhotoReference, PinError>;

    /// Gateway URL for a pinned photo.
    fn resolve(&self, photo: &PhotoReference) -> Result<Url, PinError>;
}

fn gateway_url(gateway: &Url, photo: &PhotoReference) -> Result<Url, PinError> {
    let cid = photo.content_id.as_str();
    if photo.content_id.is_empty() || !cid.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PinError::InvalidContentId(cid.to_string()));
    }
    gateway
        .join(&format!("ipfs/{cid}"))
        .map_err(|_| PinError::InvalidContentId(cid.to_string()))
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Client for a Pinata-style pinning API.
#[derive(Debug, Clone)]
pub struct PinataClient {
    http: reqwest::Client,
    api_url: Url,
    gateway_url: Url,
}

impl PinataClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "pinata_api_key",
            HeaderValue::from_str(&config.pinata_api_key)
                .map_err(|_| ConfigError::Missing("PINATA_API_KEY"))?,
        );
        headers.insert(
            "pinata_secret_api_key",
            HeaderValue::from_str(&config.pinata_secret_api_key)
                .map_err(|_| ConfigError::Missing("PINATA_SECRET_API_KEY"))?,
        );
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self {
            http,
            api_url: config.pinning_url.clone(),
            gateway_url: with_trailing_slash(config.gateway_url.clone()),
        })
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[async_trait]
impl ContentPinner for PinataClient {
    async fn pin(&self, image: &[u8]) -> Result<PhotoReference, PinError> {
        let url = format!(
            "{}/pinning/pinFileToIPFS",
            self.api_url.as_str().trim_end_matches('/')
        );
        let resp = retry_send("photo pinning", |_: &reqwest::Error| true, || {
            let form = Form::new().part("file", Part::bytes(image.to_vec()).file_name("photo.jpg"));
            self.http.post(&url).multipart(form).send()
        })
        .await
        .map_err(|e| PinError::Unavailable {
            reason: e.to_string(),
        })?;

        let status = resp.status();
        if status.is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PinError::Rejected {
                reason: format!("HTTP {status}: {body}"),
            });
        }
        if !status.is_success() {
            return Err(PinError::Unavailable {
                reason: format!("HTTP {status}"),
            });
        }
        let body: PinResponse = resp.json().await.map_err(|e| PinError::Malformed {
            reason: e.to_string(),
        })?;
        if body.ipfs_hash.trim().is_empty() {
            return Err(PinError::Malformed {
                reason: "empty IpfsHash".into(),
            });
        }
        tracing::info!(content_id = %body.ipfs_hash, "photo pinned");
        Ok(PhotoReference::new(body.ipfs_hash))
    }

    fn resolve(&self, photo: &PhotoReference) -> Result<Url, PinError> {
        gateway_url(&self.gateway_url, photo)
    }
}

/// Deterministic in-process store.
///
/// Content ids are `bafy` plus the first 40 hex chars of the SHA-256 of the
/// bytes, so pinning the same photo twice yields the same id.
#[derive(Debug)]
pub struct InMemoryPinner {
    gateway_url: Url,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail_with: Mutex<Option<PinError>>,
}

impl InMemoryPinner {
    pub fn new(gateway_url: Url) -> Self {
        Self {
            gateway_url: with_trailing_slash(gateway_url),
            blobs: Mutex::new(HashMap::new()),
            fail_with: Mutex::new(None),
        }
    }

    /// Make every subsequent pin fail with `error` (or succeed again with
    /// `None`).
    pub fn set_failure(&self, error: Option<PinError>) {
        *self.fail_with.lock() = error;
    }

    pub fn get(&self, photo: &PhotoReference) -> Option<Vec<u8>> {
        self.blobs.lock().get(photo.content_id.as_str()).cloned()
    }

    pub fn content_id_for(image: &[u8]) -> String {
        let hex = sha256(image).to_hex();
        format!("bafy{}", &hex[..40])
    }
}

#[async_trait]
impl ContentPinner for InMemoryPinner {
    async fn pin(&self, image: &[u8]) -> Result<PhotoReference, PinError> {
        if let Some(err) = self.fail_with.lock().clone() {
            return Err(err);
        }
        let cid = Self::content_id_for(image);
        self.blobs.lock().insert(cid.clone(), image.to_vec());
        Ok(PhotoReference::new(cid))
    }

    fn resolve(&self, photo: &PhotoReference) -> Result<Url, PinError> {
        gateway_url(&self.gateway_url, photo)
    }
}
