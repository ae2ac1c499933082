//! Read-only access to the compiler's output: one `<Name>.bin` bytecode file
//! and one `<Name>.abi` interface file per contract.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::abi::{AbiError, Interface};

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("no artifact for contract `{0}`")]
    Missing(String),
    #[error("artifact `{0}` has bytecode but no interface description")]
    MissingInterface(String),
    #[error("interface of `{name}` does not parse")]
    Interface {
        name: String,
        #[source]
        source: AbiError,
    },
}

/// A compiled contract. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    /// Hex bytecode, no `0x` prefix, possibly containing link placeholders.
    pub bytecode: String,
    pub interface: Interface,
    /// The interface exactly as the compiler wrote it, for re-export.
    interface_json: String,
}

impl Artifact {
    pub fn new(
        name: impl Into<String>,
        bytecode: impl Into<String>,
        interface_json: impl Into<String>,
    ) -> Result<Self, ArtifactError> {
        let name = name.into();
        let interface_json = interface_json.into();
        let interface = Interface::from_json(&interface_json)
            .map_err(|source| ArtifactError::Interface { name: name.clone(), source })?;

        let mut bytecode = bytecode.into().trim().to_string();
        if let Some(stripped) = bytecode.strip_prefix("0x") {
            bytecode = stripped.to_string();
        }

        Ok(Self { name, bytecode, interface, interface_json })
    }

    pub fn interface_json(&self) -> &str {
        &self.interface_json
    }
}

/// Every artifact found in a build directory, keyed by contract name.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    artifacts: BTreeMap<String, Artifact>,
}

impl ArtifactStore {
    /// Scans `dir` for `.bin`/`.abi` pairs. Interface-only entries (abstract
    /// contracts, pure interfaces) are skipped; bytecode without an
    /// interface is an error.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let dir = dir.as_ref();
        let mut artifacts = BTreeMap::new();

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("bin") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };

            let interface_path = path.with_extension("abi");
            if !interface_path.is_file() {
                return Err(ArtifactError::MissingInterface(name));
            }

            let bytecode = fs::read_to_string(&path)?;
            let interface_json = fs::read_to_string(&interface_path)?;
            artifacts.insert(name.clone(), Artifact::new(name, bytecode, interface_json)?);
        }

        debug!(count = artifacts.len(), dir = %dir.display(), "Loaded artifacts.");
        Ok(Self { artifacts })
    }

    pub fn from_artifacts(artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        Self { artifacts: artifacts.into_iter().map(|a| (a.name.clone(), a)).collect() }
    }

    pub fn get(&self, name: &str) -> Result<&Artifact, ArtifactError> {
        self.artifacts.get(name).ok_or_else(|| ArtifactError::Missing(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    /// Copies the interface files the front-end consumes into an `abi/`
    /// subdirectory, as `<Name>ABI.json`.
    pub fn export_abi(&self, dest: impl AsRef<Path>, names: &[String]) -> Result<(), ArtifactError> {
        let dest = dest.as_ref();
        fs::create_dir_all(dest)?;

        for name in names {
            let artifact = self.get(name)?;
            fs::write(dest.join(format!("{name}ABI.json")), artifact.interface_json())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const EMPTY_ABI: &str = "[]";

    #[test]
    fn loads_pairs_and_skips_interface_only_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Registry.bin"), "6060604052").unwrap();
        fs::write(dir.path().join("Registry.abi"), EMPTY_ABI).unwrap();
        fs::write(dir.path().join("IRegistry.abi"), EMPTY_ABI).unwrap();
        fs::write(dir.path().join("notes.txt"), "irrelevant").unwrap();

        let store = ArtifactStore::load(dir.path()).unwrap();
        assert!(store.contains("Registry"));
        assert!(!store.contains("IRegistry"));
        assert_eq!(store.names().count(), 1);
    }

    #[test]
    fn bytecode_without_interface_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Orphan.bin"), "6060").unwrap();

        let err = ArtifactStore::load(dir.path()).unwrap_err();
        assert_matches!(err, ArtifactError::MissingInterface(name) if name == "Orphan");
    }

    #[test]
    fn hex_prefix_and_whitespace_are_normalized() {
        let artifact = Artifact::new("A", "0x6060604052\n", EMPTY_ABI).unwrap();
        assert_eq!(artifact.bytecode, "6060604052");
    }

    #[test]
    fn export_writes_curated_subset() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::from_artifacts([
            Artifact::new("Registry", "60", EMPTY_ABI).unwrap(),
            Artifact::new("Factory", "60", EMPTY_ABI).unwrap(),
        ]);

        let abi_dir = dir.path().join("abi");
        store.export_abi(&abi_dir, &["Registry".to_string()]).unwrap();

        assert!(abi_dir.join("RegistryABI.json").is_file());
        assert!(!abi_dir.join("FactoryABI.json").exists());

        let err = store.export_abi(&abi_dir, &["Ghost".to_string()]).unwrap_err();
        assert_matches!(err, ArtifactError::Missing(name) if name == "Ghost");
    }
}
