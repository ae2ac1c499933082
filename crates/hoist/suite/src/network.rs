//! Network selection and run-wide pricing.
//!
//! Networks are picked by symbolic name from a `networks.toml` file; the two
//! conventional local endpoints are built in so a fresh checkout can deploy
//! against a dev node with no configuration at all.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use alloy_primitives::{Address, U256};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_NETWORKS_FILE: &str = "networks.toml";

/// Wei per gwei.
pub const GWEI: u64 = 1_000_000_000;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error("unknown network `{0}`")]
    Unknown(String),
    #[error("endpoint of network `{0}` does not parse with its api key appended")]
    InvalidEndpoint(String),
}

/// Whether a network's deployments are worth remembering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    /// Throwaway dev chains, redeployed every run; no record is written.
    Local,
    Testnet,
    Mainnet,
}

impl NetworkKind {
    pub fn is_ephemeral(self) -> bool {
        matches!(self, NetworkKind::Local)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Network {
    pub url: Url,
    pub kind: NetworkKind,
    /// Appended to the url, for gateway providers that key access by path.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Overrides the first wallet account as the sending identity.
    #[serde(default)]
    pub from: Option<Address>,
}

impl Network {
    fn local(url: &str) -> Self {
        Self {
            url: Url::parse(url).expect("static url"),
            kind: NetworkKind::Local,
            api_key: None,
            from: None,
        }
    }

    /// The full connection target, api key included.
    pub fn endpoint(&self, name: &str) -> Result<Url, NetworkError> {
        match &self.api_key {
            Some(key) => Url::parse(&format!("{}{key}", self.url))
                .map_err(|_| NetworkError::InvalidEndpoint(name.to_string())),
            None => Ok(self.url.clone()),
        }
    }
}

/// The `networks.toml` contents plus built-in local fallbacks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Networks {
    #[serde(default)]
    networks: BTreeMap<String, Network>,
}

impl Networks {
    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self, NetworkError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads the file if it exists; just the built-ins otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, NetworkError> {
        if path.as_ref().is_file() { Self::from_toml(path) } else { Ok(Self::default()) }
    }

    pub fn get(&self, name: &str) -> Result<Network, NetworkError> {
        if let Some(network) = self.networks.get(name) {
            return Ok(network.clone());
        }
        match name {
            "localhost" => Ok(Network::local("http://localhost:9545/")),
            "ganache" => Ok(Network::local("http://localhost:8545/")),
            _ => Err(NetworkError::Unknown(name.to_string())),
        }
    }
}

/// The price per unit of work, fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPrice {
    wei: U256,
}

/// Below this a transaction may never be mined; above it, someone is about
/// to overpay by three orders of magnitude. Warnings, not errors.
const DANGEROUSLY_LOW_WEI: u64 = 100_000_000; // 0.1 gwei
const DANGEROUSLY_HIGH_WEI: u64 = 100_000_000_000; // 100 gwei

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasPriceWarning {
    DangerouslyLow,
    DangerouslyHigh,
}

impl GasPrice {
    pub fn from_gwei(gwei: u64) -> Self {
        Self { wei: U256::from(gwei) * U256::from(GWEI) }
    }

    pub fn wei(self) -> U256 {
        self.wei
    }

    pub fn warning(self) -> Option<GasPriceWarning> {
        if self.wei < U256::from(DANGEROUSLY_LOW_WEI) {
            Some(GasPriceWarning::DangerouslyLow)
        } else if self.wei > U256::from(DANGEROUSLY_HIGH_WEI) {
            Some(GasPriceWarning::DangerouslyHigh)
        } else {
            None
        }
    }
}
