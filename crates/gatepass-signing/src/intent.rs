//! # Intent Protocol Agent
//!
//! Remote wallet reached over HTTP. The wallet shows the transaction to its
//! holder and returns the signed envelope once they approve.
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | POST   | `/tx` | `{xdr, network}` | `{signed_envelope_xdr, network}` |
//!
//! `xdr` is the base64 of an XDR `TransactionEnvelope` carrying the
//! unsigned transaction and no signatures; `signed_envelope_xdr` is the
//! same envelope with the holder's signature added. The wallet may name
//! the network it signed for; when it does not, the requested network is
//! assumed and the gateway's checks still apply. A 4xx answer with
//! `{error: {code, message}}` is the holder declining; anything else that
//! is not a 2xx is the agent being unavailable. The call is never retried.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use gatepass_ledger::{Network, SignedEnvelope};

use crate::agent::SigningAgent;
use crate::error::SigningError;

/// Connection settings for a remote intent wallet.
#[derive(Debug, Clone)]
pub struct IntentConfig {
    pub base_url: Url,
    /// Includes the time the holder takes to approve.
    pub timeout_secs: u64,
}

impl IntentConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Serialize)]
struct TxIntentRequest<'a> {
    xdr: String,
    network: &'a str,
}

#[derive(Debug, Deserialize)]
struct TxIntentResponse {
    signed_envelope_xdr: String,
    #[serde(default)]
    network: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct IntentErrorBody {
    #[serde(default)]
    error: Option<IntentErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct IntentErrorDetail {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// Signing agent speaking the HTTP intent protocol.
#[derive(Debug, Clone)]
pub struct IntentAgent {
    http: reqwest::Client,
    base_url: Url,
}

impl IntentAgent {
    pub fn new(config: IntentConfig) -> Result<Self, SigningError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SigningError::AgentUnavailable {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }
}

#[async_trait]
impl SigningAgent for IntentAgent {
    async fn sign(
        &self,
        unsigned: &[u8],
        network: &Network,
    ) -> Result<SignedEnvelope, SigningError> {
        let url = format!("{}/tx", self.base_url.as_str().trim_end_matches('/'));
        let xdr = SignedEnvelope::new(network.clone(), unsigned.to_vec(), Vec::new())
            .to_base64()
            .map_err(|e| SigningError::MalformedEnvelope {
                reason: format!("unsigned transaction: {e}"),
            })?;
        let request = TxIntentRequest {
            xdr,
            network: network.name(),
        };
        tracing::debug!(network = %network, "requesting signature from intent agent");

        let resp = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SigningError::AgentUnavailable {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status.is_client_error() {
            let body: IntentErrorBody = resp.json().await.unwrap_or_default();
            let reason = match body.error {
                Some(IntentErrorDetail {
                    code,
                    message: Some(message),
                }) => match code {
                    Some(code) => format!("{message} (code {code})"),
                    None => message,
                },
                _ => format!("HTTP {status}"),
            };
            return Err(SigningError::UserRejected { reason });
        }
        if !status.is_success() {
            return Err(SigningError::AgentUnavailable {
                reason: format!("HTTP {status}"),
            });
        }

        let body: TxIntentResponse =
            resp.json()
                .await
                .map_err(|e| SigningError::MalformedEnvelope {
                    reason: e.to_string(),
                })?;
        let signed_for = body
            .network
            .as_deref()
            .and_then(Network::from_name)
            .unwrap_or_else(|| network.clone());
        SignedEnvelope::from_base64(&body.signed_envelope_xdr, signed_for).map_err(|e| {
            SigningError::MalformedEnvelope {
                reason: e.to_string(),
            }
        })
    }

    fn agent_name(&self) -> &str {
        "IntentAgent"
    }
}
