//! The sequential deployment pipeline.
//!
//! One driver loop owns all mutable state and walks the validated plan in
//! authored order: deploy every contract, then issue every configuration
//! call against the registry contract. Transactions from a single signing
//! identity must be ordered, so nothing here is concurrent; the only
//! suspension points are the network round-trips.

use std::collections::BTreeMap;

use alloy_primitives::{Address, B256};
use hoist_utils::provider::Provider;
use hoist_utils::tx::deployer::{DeployOutput, Deployer};
use hoist_utils::tx::error::TransactionError;
use hoist_utils::tx::invoker::{InvokeOutput, Invoker};
use hoist_utils::tx::TxnConfig;
use thiserror::Error;
use tracing::{debug, info};

use crate::abi::{self, AbiError, AbiValue};
use crate::artifact::{ArtifactError, ArtifactStore};
use crate::linker::{self, LinkError, LinkMap};
use crate::plan::{CallArg, CallDecl, ContractDecl, ValidatedPlan};
use crate::registry::{DeployedRegistry, RegistryError};

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;

/// What went wrong inside a single task.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error("bytecode is not valid hex after linking")]
    InvalidBytecode,
    /// Only reachable if plan validation was bypassed.
    #[error("reference `{0}` is missing from the deployed registry")]
    MissingReference(String),
    #[error(transparent)]
    Abi(#[from] AbiError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("deployment of `{contract}` failed")]
    Deploy {
        contract: String,
        #[source]
        source: StepError,
    },
    #[error("configuration call `{function}` failed")]
    Configure {
        function: String,
        #[source]
        source: StepError,
    },
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    InFlight,
    Deployed,
    Failed,
}

/// Runtime state of one deployment task. Terminal states are kept for
/// diagnostics after a halted run.
#[derive(Debug)]
pub struct TaskRun {
    pub name: String,
    pub status: TaskStatus,
    pub address: Option<Address>,
    pub transaction_hash: Option<B256>,
}

/// Runtime state of one configuration call.
#[derive(Debug)]
pub struct CallRun {
    pub function: String,
    pub status: TaskStatus,
    pub transaction_hash: Option<B256>,
}

#[derive(Debug)]
pub struct PipelineOutput {
    /// The address later sessions locate the suite by.
    pub entrypoint: Address,
    pub addresses: BTreeMap<String, Address>,
}

pub struct Pipeline<'a, P>
where
    P: Provider + Send + Sync,
{
    store: &'a ArtifactStore,
    plan: &'a ValidatedPlan,
    provider: &'a P,
    sender: Address,
    txn_config: TxnConfig,
    registry: DeployedRegistry,
    links: LinkMap,
    tasks: Vec<TaskRun>,
    calls: Vec<CallRun>,
}

impl<'a, P> Pipeline<'a, P>
where
    P: Provider + Send + Sync,
{
    pub fn new(
        store: &'a ArtifactStore,
        plan: &'a ValidatedPlan,
        provider: &'a P,
        sender: Address,
        txn_config: TxnConfig,
    ) -> Self {
        let tasks = plan
            .contracts()
            .iter()
            .map(|decl| TaskRun {
                name: decl.name.clone(),
                status: TaskStatus::Pending,
                address: None,
                transaction_hash: None,
            })
            .collect();

        let calls = plan
            .calls()
            .iter()
            .map(|decl| CallRun {
                function: decl.function.clone(),
                status: TaskStatus::Pending,
                transaction_hash: None,
            })
            .collect();

        Self {
            store,
            plan,
            provider,
            sender,
            txn_config,
            registry: DeployedRegistry::default(),
            links: LinkMap::new(),
            tasks,
            calls,
        }
    }

    /// Pre-seeds a contract with a known address so its deployment is
    /// skipped: plan-pinned addresses and `--resume` ledger entries both
    /// land here. Returns `false` for names not in the plan.
    pub fn seed(&mut self, name: &str, address: Address) -> Result<bool, RegistryError> {
        let Some(index) = self.tasks.iter().position(|t| t.name == name) else {
            return Ok(false);
        };

        self.registry.insert(name, address)?;
        if self.plan.contracts()[index].library {
            self.links.insert(name.to_string(), address);
        }

        let task = &mut self.tasks[index];
        task.status = TaskStatus::Deployed;
        task.address = Some(address);
        debug!(contract = name, address = format!("{address:#x}"), "Seeded known address.");
        Ok(true)
    }

    /// Runs the whole pipeline: every deployment, then every configuration
    /// call. Halts on the first failure, leaving task states behind for
    /// inspection; already-submitted transactions are not undone.
    pub async fn run(&mut self) -> Result<PipelineOutput, PipelineError> {
        self.deploy_all().await?;
        self.configure_all().await?;

        let entrypoint = self.registry.get(self.plan.entrypoint()).ok_or_else(|| {
            PipelineError::Internal(format!(
                "entry point `{}` has no recorded address",
                self.plan.entrypoint()
            ))
        })?;

        Ok(PipelineOutput {
            entrypoint,
            addresses: self.registry.iter().map(|(n, a)| (n.to_string(), a)).collect(),
        })
    }

    pub fn tasks(&self) -> &[TaskRun] {
        &self.tasks
    }

    pub fn calls(&self) -> &[CallRun] {
        &self.calls
    }

    pub fn registry(&self) -> &DeployedRegistry {
        &self.registry
    }

    async fn deploy_all(&mut self) -> Result<(), PipelineError> {
        for index in 0..self.tasks.len() {
            if self.tasks[index].status == TaskStatus::Deployed {
                debug!(contract = %self.tasks[index].name, "Already deployed, skipping.");
                continue;
            }

            let decl = self.plan.contracts()[index].clone();
            self.tasks[index].status = TaskStatus::InFlight;
            info!(contract = %decl.name, "Deploying contract.");

            let outcome = self.deploy_task(&decl).await;
            let outcome = outcome.and_then(|output| {
                self.registry.insert(decl.name.clone(), output.contract_address)?;
                if decl.library {
                    self.links.insert(decl.name.clone(), output.contract_address);
                }
                Ok(output)
            });

            match outcome {
                Ok(output) => {
                    let task = &mut self.tasks[index];
                    task.status = TaskStatus::Deployed;
                    task.address = Some(output.contract_address);
                    task.transaction_hash = Some(output.transaction_hash);
                    info!(
                        contract = %decl.name,
                        address = format!("{:#x}", output.contract_address),
                        "Contract deployed."
                    );
                }
                Err(source) => {
                    self.tasks[index].status = TaskStatus::Failed;
                    return Err(PipelineError::Deploy { contract: decl.name, source });
                }
            }
        }

        Ok(())
    }

    async fn deploy_task(&self, decl: &ContractDecl) -> Result<DeployOutput, StepError> {
        let values = self.resolve_args(&decl.args)?;
        let artifact = self.store.get(&decl.name)?;

        let mut bytecode = artifact.bytecode.clone();
        if linker::has_placeholders(&bytecode) {
            bytecode = linker::link(&bytecode, &self.links)?;
        }
        hex::decode(&bytecode).map_err(|_| StepError::InvalidBytecode)?;

        let init_code = format!("0x{bytecode}{}", abi::encode_words(&values));
        let deployer = Deployer::new(self.provider, self.sender, self.txn_config);
        Ok(deployer.deploy(init_code).await?)
    }

    async fn configure_all(&mut self) -> Result<(), PipelineError> {
        if self.calls.is_empty() {
            return Ok(());
        }

        // Deployment completed in full before any configuration call.
        debug_assert!(self.tasks.iter().all(|t| t.status == TaskStatus::Deployed));

        let registry_name = self.plan.registry();
        let registry_address = self.registry.get(registry_name).ok_or_else(|| {
            PipelineError::Internal(format!("registry `{registry_name}` has no recorded address"))
        })?;

        for index in 0..self.calls.len() {
            let call = self.plan.calls()[index].clone();
            self.calls[index].status = TaskStatus::InFlight;
            info!(function = %call.function, "Issuing configuration call.");

            match self.configure_task(&call, registry_address).await {
                Ok(output) => {
                    let run = &mut self.calls[index];
                    run.status = TaskStatus::Deployed;
                    run.transaction_hash = Some(output.transaction_hash);
                }
                Err(source) => {
                    self.calls[index].status = TaskStatus::Failed;
                    return Err(PipelineError::Configure { function: call.function, source });
                }
            }
        }

        Ok(())
    }

    async fn configure_task(
        &self,
        call: &CallDecl,
        registry_address: Address,
    ) -> Result<InvokeOutput, StepError> {
        let values = self.resolve_args(&call.args)?;
        let interface = &self.store.get(self.plan.registry())?.interface;
        let item = interface
            .function(&call.function)
            .ok_or_else(|| AbiError::NoSuchFunction(call.function.clone()))?;

        let calldata = abi::encode_call(item, &values)?;
        let invoker = Invoker::new(self.provider, self.sender, self.txn_config);
        Ok(invoker.invoke(registry_address, calldata).await?)
    }

    fn resolve_args(&self, args: &[CallArg]) -> Result<Vec<AbiValue>, StepError> {
        args.iter()
            .map(|arg| match arg {
                CallArg::Ref(name) => self
                    .registry
                    .get(name)
                    .map(AbiValue::Address)
                    .ok_or_else(|| StepError::MissingReference(name.clone())),
                CallArg::Address(address) => Ok(AbiValue::Address(*address)),
                CallArg::Uint(value) => Ok(AbiValue::Uint(*value)),
                CallArg::Bool(value) => Ok(AbiValue::Bool(*value)),
            })
            .collect()
    }
}
