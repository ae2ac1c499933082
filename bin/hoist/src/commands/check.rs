use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::options::suite::SuiteOptions;

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub suite: SuiteOptions,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let store = self.suite.load_store()?;
        let plan = self.suite.load_plan()?.validate(&store).context("plan validation failed")?;

        println!(
            "Plan OK: {} contracts, {} configuration calls.",
            plan.contracts().len(),
            plan.calls().len()
        );
        println!("Execution order:");
        for (index, contract) in plan.contracts().iter().enumerate() {
            let mut line = format!("{:>3}. {}", index + 1, contract.name);
            if contract.library {
                line.push_str(" (library)");
            }
            if let Some(address) = contract.address {
                line.push_str(&format!(" (pinned to {address:#x})"));
            }
            println!("{}", line.dimmed());
        }

        Ok(())
    }
}
