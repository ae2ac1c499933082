//! Durable output of a run: the per-network entry-point record, and the
//! checkpoint ledger consulted by `--resume`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RecordsError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// The one record later sessions use to find the deployed suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub address: Address,
}

pub fn record_path(dir: impl AsRef<Path>, network: &str) -> PathBuf {
    dir.as_ref().join(format!("{network}.json"))
}

/// Writes the entry-point record for `network`, replacing any prior one.
pub fn write_record(
    dir: impl AsRef<Path>,
    network: &str,
    address: Address,
) -> Result<PathBuf, RecordsError> {
    fs::create_dir_all(&dir)?;
    let path = record_path(&dir, network);
    fs::write(&path, serde_json::to_string(&AddressRecord { address })?)?;
    debug!(path = %path.display(), "Wrote entry point record.");
    Ok(path)
}

pub fn read_record(dir: impl AsRef<Path>, network: &str) -> Result<Option<AddressRecord>, RecordsError> {
    let path = record_path(dir, network);
    if !path.is_file() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&fs::read_to_string(path)?)?))
}

/// Addresses recorded as each deployment confirms. On `--resume`, entries
/// seed the pipeline so finished contracts are not deployed twice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub deployed: BTreeMap<String, Address>,
}

impl Ledger {
    pub fn path(dir: impl AsRef<Path>, network: &str) -> PathBuf {
        dir.as_ref().join(format!("{network}.ledger.json"))
    }

    /// A missing file is an empty ledger.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecordsError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RecordsError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn record(&mut self, name: impl Into<String>, address: Address) {
        self.deployed.insert(name.into(), address);
    }

    pub fn is_empty(&self) -> bool {
        self.deployed.is_empty()
    }
}
