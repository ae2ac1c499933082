//! The single source of truth for deployed addresses.

use std::collections::BTreeMap;

use alloy_primitives::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Write-once invariant: a contract deploys at most once per run.
    #[error("contract `{0}` already has a deployed address")]
    AlreadyDeployed(String),
}

/// Contract name to deployed address. Entries are write-once; symbolic
/// references in later tasks resolve against this map and nothing else.
#[derive(Debug, Clone, Default)]
pub struct DeployedRegistry {
    addresses: BTreeMap<String, Address>,
}

impl DeployedRegistry {
    pub fn insert(&mut self, name: impl Into<String>, address: Address) -> Result<(), RegistryError> {
        let name = name.into();
        if self.addresses.contains_key(&name) {
            return Err(RegistryError::AlreadyDeployed(name));
        }
        self.addresses.insert(name, address);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Address> {
        self.addresses.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.addresses.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Address)> {
        self.addresses.iter().map(|(name, address)| (name.as_str(), *address))
    }
}
