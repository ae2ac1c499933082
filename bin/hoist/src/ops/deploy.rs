//! The deploy driver: network selection, validation, the pipeline run, and
//! everything durable that is left behind afterwards.

use std::path::{Path, PathBuf};

use alloy_primitives::Address;
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use hoist_suite::network::{GasPrice, GasPriceWarning, NetworkKind};
use hoist_suite::pipeline::{Pipeline, TaskRun, TaskStatus};
use hoist_suite::records::{self, Ledger, RecordsError};
use hoist_utils::provider::{HttpProvider, Provider};
use hoist_utils::tx::TxnConfig;
use tracing::info;

use crate::commands::deploy::DeployArgs;

pub async fn execute(args: DeployArgs) -> Result<()> {
    let gas_price = GasPrice::from_gwei(args.gas_price);
    match gas_price.warning() {
        Some(GasPriceWarning::DangerouslyLow) => {
            println!(
                "{}",
                "WARNING: gas price dangerously low, transactions may never go through".yellow()
            );
        }
        Some(GasPriceWarning::DangerouslyHigh) => {
            println!(
                "{}",
                "WARNING: gas price dangerously high, transactions will be expensive".yellow()
            );
        }
        None => {}
    }
    println!("Gas price: {} gwei", args.gas_price);

    let networks = args.suite.load_networks()?;
    let network = networks.get(&args.network)?;

    println!("Deploying to {}...", args.network);
    if network.kind == NetworkKind::Mainnet {
        println!("{}", "WARNING: this will spend real funds".yellow().bold());
    }

    let store = args.suite.load_store()?;
    let plan = args.suite.load_plan()?.validate(&store).context("plan validation failed")?;

    store
        .export_abi(args.suite.artifacts.join("abi"), plan.abi_exports())
        .context("failed to export interface files")?;

    let provider = HttpProvider::new(network.endpoint(&args.network)?);
    let sender = match network.from {
        Some(address) => address,
        None => provider
            .accounts()
            .await
            .context("failed to query wallet accounts")?
            .first()
            .copied()
            .ok_or_else(|| anyhow!("the wallet endpoint exposed no account to sign with"))?,
    };
    info!(sender = format!("{sender:#x}"), "Using sending identity.");

    let txn_config = TxnConfig::new(gas_price.wei());
    let mut pipeline = Pipeline::new(&store, &plan, &provider, sender, txn_config);

    // Plan-pinned addresses first, then the resume ledger.
    for decl in plan.contracts() {
        if let Some(address) = decl.address {
            pipeline.seed(&decl.name, address)?;
        }
    }

    let ledger_path = Ledger::path(&args.records_dir, &args.network);
    if args.resume {
        let ledger = Ledger::load(&ledger_path).context("failed to read the resume ledger")?;
        for (name, address) in &ledger.deployed {
            if !pipeline.registry().contains(name) {
                pipeline.seed(name, *address)?;
            }
        }
    }

    let outcome = pipeline.run().await;

    // Confirmed deployments are checkpointed even when the run halted, so a
    // `--resume` picks up from the failure point instead of redeploying.
    if !network.kind.is_ephemeral() {
        let ledger = progress_ledger(pipeline.tasks());
        if !ledger.is_empty() {
            ledger.save(&ledger_path).context("failed to write the deployment ledger")?;
        }
    }

    let output = outcome.with_context(|| format!("deployment to `{}` halted", args.network))?;

    for (name, address) in &output.addresses {
        println!("{name}: {address:#x}");
    }

    match persist_entry_point(network.kind, &args.records_dir, &args.network, output.entrypoint)? {
        Some(path) => println!("Entry point record written to {}", path.display()),
        None => info!("Ephemeral network, skipping the address record."),
    }

    println!("{}", format!("✨ Suite deployed, entry point at {:#x}", output.entrypoint).green());
    Ok(())
}

/// Every address that confirmed this run, keyed for `--resume` next time.
fn progress_ledger(tasks: &[TaskRun]) -> Ledger {
    let mut ledger = Ledger::default();
    for task in tasks {
        if let (TaskStatus::Deployed, Some(address)) = (task.status, task.address) {
            ledger.record(task.name.as_str(), address);
        }
    }
    ledger
}

/// Ephemeral networks are redeployed every run, so nothing is recorded for
/// them; everything else gets its entry-point record (re)written.
fn persist_entry_point(
    kind: NetworkKind,
    records_dir: &Path,
    network: &str,
    entrypoint: Address,
) -> Result<Option<PathBuf>, RecordsError> {
    if kind.is_ephemeral() {
        return Ok(None);
    }
    records::write_record(records_dir, network, entrypoint).map(Some)
}
