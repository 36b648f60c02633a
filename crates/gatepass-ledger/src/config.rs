//! Ledger gateway configuration.

use url::Url;

use crate::network::Network;

/// Configuration for the Horizon-style gateway.
#[derive(Debug, Clone)]
pub struct HorizonConfig {
    /// Default: <https://horizon-testnet.stellar.org>
    pub horizon_url: Url,
    pub network: Network,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl HorizonConfig {
    pub const DEFAULT_URL: &'static str = "https://horizon-testnet.stellar.org";

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `GATEPASS_HORIZON_URL` (default: `https://horizon-testnet.stellar.org`)
    /// - `GATEPASS_NETWORK` (`testnet`, `public`, or a passphrase; default: `testnet`)
    /// - `GATEPASS_LEDGER_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let network_name =
            std::env::var("GATEPASS_NETWORK").unwrap_or_else(|_| "testnet".to_string());
        let network = Network::from_name(&network_name)
            .ok_or(ConfigError::UnknownNetwork(network_name))?;
        Ok(Self {
            horizon_url: env_url("GATEPASS_HORIZON_URL", Self::DEFAULT_URL)?,
            network,
            timeout_secs: std::env::var("GATEPASS_LEDGER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }

    /// Point at an arbitrary gateway (local mocks, standalone networks).
    pub fn for_url(url: &str, network: Network) -> Result<Self, ConfigError> {
        Ok(Self {
            horizon_url: Url::parse(url)
                .map_err(|e| ConfigError::InvalidUrl(url.to_string(), e.to_string()))?,
            network,
            timeout_secs: 5,
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("unknown ledger network {0:?}")]
    UnknownNetwork(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_url_builds_config() {
        let cfg = HorizonConfig::for_url("http://127.0.0.1:8000", Network::Testnet).unwrap();
        assert_eq!(cfg.horizon_url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(cfg.timeout_secs, 5);
    }

    #[test]
    fn for_url_rejects_garbage() {
        assert!(HorizonConfig::for_url("not a url", Network::Testnet).is_err());
    }

    #[test]
    fn env_url_uses_default_when_var_absent() {
        let url = env_url("GATEPASS_NONEXISTENT_VAR_4411", "https://example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }
}
