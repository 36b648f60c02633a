//! # Application State
//!
//! Shared state handed to every handler. Issuance is optional: without a
//! configured signer and service clients, `POST /v1/passes` answers 503
//! while verification keeps working.

use std::sync::Arc;

use gatepass_protocol::{PassIssuer, VerificationEngine};
use gatepass_signing::SignerSession;

use crate::middleware::metrics::ApiMetrics;

/// Server configuration.
///
/// Custom `Debug` redacts the auth token.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token guarding issuance. `None` disables auth.
    pub auth_token: Option<String>,
}

impl AppConfig {
    /// Read `PORT` (default 8080) and `AUTH_TOKEN`.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let auth_token = std::env::var("AUTH_TOKEN").ok().filter(|t| !t.is_empty());
        Self { port, auth_token }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
        }
    }
}

/// Issuer plus the default signer session used for requests that do not
/// name a source account.
#[derive(Debug, Clone)]
pub struct Issuance {
    pub issuer: PassIssuer,
    pub signer: SignerSession,
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub verifier: Arc<VerificationEngine>,
    pub issuance: Option<Arc<Issuance>>,
    pub metrics: ApiMetrics,
}

impl AppState {
    /// Verification-only state.
    pub fn new(config: AppConfig, verifier: VerificationEngine) -> Self {
        Self {
            config,
            verifier: Arc::new(verifier),
            issuance: None,
            metrics: ApiMetrics::new(),
        }
    }

    pub fn with_issuance(mut self, issuer: PassIssuer, signer: SignerSession) -> Self {
        self.issuance = Some(Arc::new(Issuance { issuer, signer }));
        self
    }
}
