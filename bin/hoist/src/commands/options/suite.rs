use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hoist_suite::artifact::ArtifactStore;
use hoist_suite::network::{Networks, DEFAULT_NETWORKS_FILE};
use hoist_suite::plan::{SuitePlan, DEFAULT_PLAN_FILE};

#[derive(Debug, Args)]
#[command(next_help_heading = "Suite options")]
pub struct SuiteOptions {
    #[arg(long, value_name = "PATH", default_value = DEFAULT_PLAN_FILE)]
    #[arg(help = "Path to the deployment plan.")]
    pub plan: PathBuf,

    #[arg(long, value_name = "DIR", default_value = "build")]
    #[arg(help = "Directory holding the compiled artifacts (`<Name>.bin` + `<Name>.abi`).")]
    pub artifacts: PathBuf,

    #[arg(long, value_name = "PATH", default_value = DEFAULT_NETWORKS_FILE)]
    #[arg(help = "Network definitions file.")]
    pub networks: PathBuf,
}

impl SuiteOptions {
    pub fn load_store(&self) -> Result<ArtifactStore> {
        ArtifactStore::load(&self.artifacts).with_context(|| {
            format!("failed to load artifacts from `{}`", self.artifacts.display())
        })
    }

    pub fn load_plan(&self) -> Result<SuitePlan> {
        SuitePlan::from_toml(&self.plan)
            .with_context(|| format!("failed to load the plan at `{}`", self.plan.display()))
    }

    pub fn load_networks(&self) -> Result<Networks> {
        Networks::load_or_default(&self.networks).with_context(|| {
            format!("failed to load network definitions from `{}`", self.networks.display())
        })
    }
}
