//! Ledger network identity.
//!
//! A transaction signed for one network is invalid on every other, because
//! the network passphrase is hashed into the signed payload.

use serde::{Deserialize, Serialize};

use gatepass_core::{sha256, Sha256Digest};

/// A ledger network, identified by its passphrase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Network {
    /// The public test network.
    Testnet,
    /// The production network.
    Public,
    /// Any other network (standalone or private deployments).
    Custom(String),
}

impl Network {
    pub const TESTNET_PASSPHRASE: &'static str = "Test SDF Network ; September 2015";
    pub const PUBLIC_PASSPHRASE: &'static str = "Public Global Stellar Network ; September 2015";

    /// Resolve a short name (`testnet`, `public`) or a full passphrase.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "" => None,
            "testnet" | "TESTNET" => Some(Self::Testnet),
            "public" | "PUBLIC" | "mainnet" => Some(Self::Public),
            other => Some(Self::from_passphrase(other)),
        }
    }

    /// Map a passphrase onto a well-known network where possible.
    pub fn from_passphrase(passphrase: &str) -> Self {
        match passphrase {
            Self::TESTNET_PASSPHRASE => Self::Testnet,
            Self::PUBLIC_PASSPHRASE => Self::Public,
            other => Self::Custom(other.to_string()),
        }
    }

    pub fn passphrase(&self) -> &str {
        match self {
            Self::Testnet => Self::TESTNET_PASSPHRASE,
            Self::Public => Self::PUBLIC_PASSPHRASE,
            Self::Custom(p) => p,
        }
    }

    /// Short name used by wallet protocols. Custom networks use their
    /// passphrase.
    pub fn name(&self) -> &str {
        match self {
            Self::Testnet => "testnet",
            Self::Public => "public",
            Self::Custom(p) => p,
        }
    }

    /// SHA-256 of the passphrase, prefixed to every signed payload.
    pub fn network_id(&self) -> Sha256Digest {
        sha256(self.passphrase().as_bytes())
    }
}

impl From<String> for Network {
    fn from(value: String) -> Self {
        Self::from_passphrase(&value)
    }
}

impl From<Network> for String {
    fn from(value: Network) -> String {
        value.passphrase().to_string()
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve() {
        assert_eq!(Network::from_name("testnet"), Some(Network::Testnet));
        assert_eq!(Network::from_name("public"), Some(Network::Public));
        assert_eq!(
            Network::from_name(Network::TESTNET_PASSPHRASE),
            Some(Network::Testnet)
        );
        assert_eq!(
            Network::from_name("Standalone Network ; February 2017"),
            Some(Network::Custom("Standalone Network ; February 2017".into()))
        );
        assert_eq!(Network::from_name("  "), None);
    }

    #[test]
    fn network_ids_differ() {
        assert_ne!(Network::Testnet.network_id(), Network::Public.network_id());
    }

    #[test]
    fn serializes_as_passphrase() {
        let json = serde_json::to_string(&Network::Testnet).unwrap();
        assert_eq!(json, "\"Test SDF Network ; September 2015\"");
        let back: Network = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Network::Testnet);
    }
}
