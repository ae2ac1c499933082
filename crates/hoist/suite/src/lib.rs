//! Deployment model for a suite of interdependent contracts.
//!
//! A suite is declared in a TOML plan: an ordered list of contracts (with
//! constructor arguments that may reference earlier contracts, and library
//! link requirements), followed by configuration calls wired into a central
//! registry contract. This crate owns everything between the compiler's
//! artifacts on disk and the transactions handed to `hoist-utils`.

pub mod abi;
pub mod artifact;
pub mod linker;
pub mod network;
pub mod pipeline;
pub mod plan;
pub mod records;
pub mod registry;

pub use abi::{AbiError, AbiValue, Interface};
pub use artifact::{Artifact, ArtifactError, ArtifactStore};
pub use linker::{LinkError, LinkMap};
pub use network::{GasPrice, Network, NetworkError, NetworkKind, Networks};
pub use pipeline::{Pipeline, PipelineError, PipelineOutput, TaskStatus};
pub use plan::{CallArg, CallDecl, ContractDecl, PlanError, SuitePlan, ValidatedPlan};
pub use records::{AddressRecord, Ledger, RecordsError};
pub use registry::{DeployedRegistry, RegistryError};
