use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::options::suite::SuiteOptions;
use crate::ops;

#[derive(Debug, Args)]
pub struct DeployArgs {
    #[arg(help = "The target network, by name.")]
    pub network: String,

    #[arg(help = "Gas price for every transaction of this run, in whole gwei.")]
    pub gas_price: u64,

    #[command(flatten)]
    pub suite: SuiteOptions,

    #[arg(long, value_name = "DIR", default_value = "deployments")]
    #[arg(help = "Where the per-network address record and ledger are written.")]
    pub records_dir: PathBuf,

    #[arg(long)]
    #[arg(help = "Skip contracts already recorded in this network's ledger from a previous run.")]
    pub resume: bool,
}

impl DeployArgs {
    pub async fn run(self: Box<Self>) -> Result<()> {
        ops::deploy::execute(*self).await
    }
}
