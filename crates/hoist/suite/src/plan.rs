//! The deployment plan: which contracts to deploy, in what order, with which
//! constructor arguments and library links, and which configuration calls to
//! issue against the registry contract afterwards.
//!
//! A plan is loaded from TOML and validated up front, before any transaction
//! is submitted. The authored order is authoritative: the resolver checks
//! that it is topologically consistent but never reorders it.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use alloy_primitives::{Address, U256};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use topological_sort::TopologicalSort;

use crate::abi::{self, AbiError, AbiValue};
use crate::artifact::{ArtifactError, ArtifactStore};

/// Prefix marking a constructor or call argument as a reference to another
/// contract's future address.
pub const CONTRACT_REF_PREFIX: &str = "$contract:";

/// Default plan file name, next to the build directory.
pub const DEFAULT_PLAN_FILE: &str = "suite.toml";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error("the plan declares no contracts")]
    Empty,
    #[error("contract `{0}` is declared twice")]
    Duplicate(String),
    #[error("`{task}` references `{reference}`, which is not a deployment target")]
    UnresolvedReference { task: String, reference: String },
    #[error("cyclic reference among contract declarations")]
    CyclicReference,
    #[error("`{task}` references `{reference}` before it is declared; plans must be ordered by dependency")]
    DeclaredAfterUse { task: String, reference: String },
    #[error("`{task}` links `{library}`, which is not declared as a library")]
    NotALibrary { task: String, library: String },
    #[error("registry contract `{0}` is not a deployment target")]
    UnknownRegistry(String),
    #[error("entry point contract `{0}` is not a deployment target")]
    UnknownEntrypoint(String),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("constructor of `{name}`: {source}")]
    Constructor {
        name: String,
        #[source]
        source: AbiError,
    },
    #[error("configuration call `{function}`: {source}")]
    Call {
        function: String,
        #[source]
        source: AbiError,
    },
}

/// One constructor or call argument: a literal, or a symbolic reference to a
/// contract declared in the same plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArg {
    Ref(String),
    Address(Address),
    Uint(U256),
    Bool(bool),
}

impl CallArg {
    pub fn reference(&self) -> Option<&str> {
        match self {
            CallArg::Ref(name) => Some(name),
            _ => None,
        }
    }

    /// A stand-in value of the right shape for type checking before any
    /// address is known. References always resolve to addresses.
    pub(crate) fn probe(&self) -> AbiValue {
        match self {
            CallArg::Ref(_) | CallArg::Address(_) => {
                AbiValue::Address(self.literal_address().unwrap_or(Address::ZERO))
            }
            CallArg::Uint(value) => AbiValue::Uint(*value),
            CallArg::Bool(value) => AbiValue::Bool(*value),
        }
    }

    fn literal_address(&self) -> Option<Address> {
        match self {
            CallArg::Address(address) => Some(*address),
            _ => None,
        }
    }
}

impl fmt::Display for CallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallArg::Ref(name) => write!(f, "{CONTRACT_REF_PREFIX}{name}"),
            CallArg::Address(address) => write!(f, "{address:#x}"),
            CallArg::Uint(value) => write!(f, "{value}"),
            CallArg::Bool(value) => write!(f, "{value}"),
        }
    }
}

fn parse_arg(raw: &str) -> Result<CallArg, String> {
    if let Some(name) = raw.strip_prefix(CONTRACT_REF_PREFIX) {
        if name.is_empty() {
            return Err("empty contract reference".to_string());
        }
        return Ok(CallArg::Ref(name.to_string()));
    }

    if let Some(hex_str) = raw.strip_prefix("0x") {
        if hex_str.len() == 40 {
            return Address::from_str(raw)
                .map(CallArg::Address)
                .map_err(|e| format!("malformed address `{raw}`: {e}"));
        }
        return U256::from_str_radix(hex_str, 16)
            .map(CallArg::Uint)
            .map_err(|e| format!("malformed hex value `{raw}`: {e}"));
    }

    if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
        return U256::from_str_radix(raw, 10)
            .map(CallArg::Uint)
            .map_err(|e| format!("malformed integer `{raw}`: {e}"));
    }

    Err(format!("unparsable argument `{raw}`"))
}

impl<'de> Deserialize<'de> for CallArg {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Int(u64),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bool(value) => Ok(CallArg::Bool(value)),
            Raw::Int(value) => Ok(CallArg::Uint(U256::from(value))),
            Raw::Str(raw) => parse_arg(&raw).map_err(D::Error::custom),
        }
    }
}

/// One contract to deploy.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractDecl {
    pub name: String,
    #[serde(default)]
    pub args: Vec<CallArg>,
    /// Libraries whose addresses must be linked into the bytecode.
    #[serde(default)]
    pub links: Vec<String>,
    /// Libraries feed the link map once deployed.
    #[serde(default)]
    pub library: bool,
    /// A pre-seeded address skips deployment and reuses a known instance.
    #[serde(default)]
    pub address: Option<Address>,
}

impl ContractDecl {
    /// Every name this declaration depends on: referenced constructor
    /// arguments and required libraries.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.args
            .iter()
            .filter_map(CallArg::reference)
            .chain(self.links.iter().map(String::as_str))
    }
}

/// One configuration call against the registry contract.
#[derive(Debug, Clone, Deserialize)]
pub struct CallDecl {
    pub function: String,
    #[serde(default)]
    pub args: Vec<CallArg>,
}

impl CallDecl {
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(CallArg::reference)
    }
}

/// A deployment plan, as authored. Run [`SuitePlan::validate`] to obtain the
/// [`ValidatedPlan`] the pipeline accepts.
#[derive(Debug, Clone, Deserialize)]
pub struct SuitePlan {
    /// The contract configuration calls are issued against.
    pub registry: String,
    /// The contract whose address is persisted as the suite's root.
    pub entrypoint: String,
    /// Interface files to copy into the `abi/` export directory.
    #[serde(default)]
    pub abi_exports: Vec<String>,
    #[serde(default)]
    pub contracts: Vec<ContractDecl>,
    #[serde(default)]
    pub calls: Vec<CallDecl>,
}

impl SuitePlan {
    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// The dependency resolver. Fails before anything is submitted on
    /// unresolvable references, cycles, out-of-order declarations, and
    /// arguments that do not match the artifact interfaces.
    pub fn validate(self, store: &ArtifactStore) -> Result<ValidatedPlan, PlanError> {
        if self.contracts.is_empty() {
            return Err(PlanError::Empty);
        }

        let mut declared: HashMap<&str, usize> = HashMap::new();
        for (index, contract) in self.contracts.iter().enumerate() {
            if declared.insert(&contract.name, index).is_some() {
                return Err(PlanError::Duplicate(contract.name.clone()));
            }
        }

        if !declared.contains_key(self.registry.as_str()) {
            return Err(PlanError::UnknownRegistry(self.registry.clone()));
        }
        if !declared.contains_key(self.entrypoint.as_str()) {
            return Err(PlanError::UnknownEntrypoint(self.entrypoint.clone()));
        }

        // Every reference must name a deployment target, and links must
        // point at declared libraries.
        for contract in &self.contracts {
            store.get(&contract.name)?;

            for reference in contract.references() {
                if !declared.contains_key(reference) {
                    return Err(PlanError::UnresolvedReference {
                        task: contract.name.clone(),
                        reference: reference.to_string(),
                    });
                }
            }

            for library in &contract.links {
                if let Some(&target) = declared.get(library.as_str()) {
                    if !self.contracts[target].library {
                        return Err(PlanError::NotALibrary {
                            task: contract.name.clone(),
                            library: library.clone(),
                        });
                    }
                }
            }
        }

        // Cycles fail deterministically, and before the order check so that
        // a cycle is never misreported as a mere ordering problem.
        let mut ts = TopologicalSort::<&str>::new();
        for contract in &self.contracts {
            ts.insert(contract.name.as_str());
            for reference in contract.references() {
                ts.add_dependency(reference, contract.name.as_str());
            }
        }
        while !ts.is_empty() {
            if ts.pop_all().is_empty() {
                return Err(PlanError::CyclicReference);
            }
        }

        // The authored order must already satisfy every dependency.
        for (index, contract) in self.contracts.iter().enumerate() {
            for reference in contract.references() {
                if declared[reference] >= index {
                    return Err(PlanError::DeclaredAfterUse {
                        task: contract.name.clone(),
                        reference: reference.to_string(),
                    });
                }
            }
        }

        // Arguments must fit the interfaces they will be encoded against.
        for contract in &self.contracts {
            let artifact = store.get(&contract.name)?;
            let probes: Vec<AbiValue> = contract.args.iter().map(CallArg::probe).collect();
            abi::check_args("constructor", artifact.interface.constructor_inputs(), &probes)
                .map_err(|source| PlanError::Constructor { name: contract.name.clone(), source })?;
        }

        let registry_interface = &store.get(&self.registry)?.interface;
        for call in &self.calls {
            for reference in call.references() {
                if !declared.contains_key(reference) {
                    return Err(PlanError::UnresolvedReference {
                        task: call.function.clone(),
                        reference: reference.to_string(),
                    });
                }
            }

            let item = registry_interface.function(&call.function).ok_or_else(|| PlanError::Call {
                function: call.function.clone(),
                source: AbiError::NoSuchFunction(call.function.clone()),
            })?;

            let probes: Vec<AbiValue> = call.args.iter().map(CallArg::probe).collect();
            abi::check_args(&call.function, &item.inputs, &probes)
                .map_err(|source| PlanError::Call { function: call.function.clone(), source })?;
        }

        for name in &self.abi_exports {
            store.get(name)?;
        }

        Ok(ValidatedPlan { plan: self })
    }
}

/// Proof that a plan passed validation; the only plan the pipeline accepts.
/// Content is the authored plan, unchanged.
#[derive(Debug, Clone)]
pub struct ValidatedPlan {
    plan: SuitePlan,
}

impl ValidatedPlan {
    pub fn contracts(&self) -> &[ContractDecl] {
        &self.plan.contracts
    }

    pub fn calls(&self) -> &[CallDecl] {
        &self.plan.calls
    }

    pub fn registry(&self) -> &str {
        &self.plan.registry
    }

    pub fn entrypoint(&self) -> &str {
        &self.plan.entrypoint
    }

    pub fn abi_exports(&self) -> &[String] {
        &self.plan.abi_exports
    }

    /// The execution order, which is the authored order.
    pub fn execution_order(&self) -> impl Iterator<Item = &str> {
        self.plan.contracts.iter().map(|c| c.name.as_str())
    }
}
