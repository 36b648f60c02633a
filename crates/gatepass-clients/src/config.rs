//! External service configuration.

use gatepass_core::DigestKey;
use url::Url;

/// Configuration for the extraction and pinning services.
///
/// Custom `Debug` implementation redacts the pinning credentials and the
/// digest key.
#[derive(Clone)]
pub struct ServiceConfig {
    /// Base URL of the document-analysis service.
    pub extraction_url: Url,
    /// Default: <https://api.pinata.cloud>
    pub pinning_url: Url,
    /// Default: <https://gateway.pinata.cloud>
    pub gateway_url: Url,
    pub pinata_api_key: String,
    pub pinata_secret_api_key: String,
    /// Key mixed into identity digests.
    pub digest_key: DigestKey,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("extraction_url", &self.extraction_url)
            .field("pinning_url", &self.pinning_url)
            .field("gateway_url", &self.gateway_url)
            .field("pinata_api_key", &"[REDACTED]")
            .field("pinata_secret_api_key", &"[REDACTED]")
            .field("digest_key", &self.digest_key)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `GATEPASS_EXTRACTION_URL` (default: `http://localhost:5000`)
    /// - `GATEPASS_PINNING_URL` (default: `https://api.pinata.cloud`)
    /// - `GATEPASS_IPFS_GATEWAY_URL` (default: `https://gateway.pinata.cloud`)
    /// - `PINATA_API_KEY` (required)
    /// - `PINATA_SECRET_API_KEY` (required)
    /// - `GATEPASS_DIGEST_KEY` (required)
    /// - `GATEPASS_SERVICE_TIMEOUT_SECS` (default: 60)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            extraction_url: env_url("GATEPASS_EXTRACTION_URL", "http://localhost:5000")?,
            pinning_url: env_url("GATEPASS_PINNING_URL", "https://api.pinata.cloud")?,
            gateway_url: env_url("GATEPASS_IPFS_GATEWAY_URL", "https://gateway.pinata.cloud")?,
            pinata_api_key: required("PINATA_API_KEY")?,
            pinata_secret_api_key: required("PINATA_SECRET_API_KEY")?,
            digest_key: digest_key_from_env()?,
            timeout_secs: std::env::var("GATEPASS_SERVICE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
        })
    }

    /// Point every service at one local mock server (for testing).
    pub fn local_mock(base_url: &str, digest_key: DigestKey) -> Result<Self, ConfigError> {
        let url = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(base_url.to_string(), e.to_string()))?;
        Ok(Self {
            extraction_url: url.clone(),
            pinning_url: url.clone(),
            gateway_url: url,
            pinata_api_key: "test-key".into(),
            pinata_secret_api_key: "test-secret".into(),
            digest_key,
            timeout_secs: 5,
        })
    }
}

/// Read `GATEPASS_DIGEST_KEY` on its own, for tools that only digest.
pub fn digest_key_from_env() -> Result<DigestKey, ConfigError> {
    let raw = required("GATEPASS_DIGEST_KEY")?;
    Ok(DigestKey::new(raw.into_bytes()))
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(var)),
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mock_points_everything_at_one_server() {
        let cfg = ServiceConfig::local_mock("http://127.0.0.1:7000", DigestKey::new(b"k".to_vec()))
            .unwrap();
        assert_eq!(cfg.extraction_url.as_str(), "http://127.0.0.1:7000/");
        assert_eq!(cfg.pinning_url, cfg.gateway_url);
    }

    #[test]
    fn debug_redacts_credentials() {
        let mut cfg =
            ServiceConfig::local_mock("http://127.0.0.1:7000", DigestKey::new(b"k".to_vec()))
                .unwrap();
        cfg.pinata_secret_api_key = "very-secret-value".into();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("very-secret-value"));
        assert!(!rendered.contains("test-key"));
    }

    #[test]
    fn required_rejects_missing() {
        assert!(matches!(
            required("GATEPASS_UNSET_VAR_9931"),
            Err(ConfigError::Missing("GATEPASS_UNSET_VAR_9931"))
        ));
    }
}
