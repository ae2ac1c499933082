#![cfg_attr(not(test), warn(unused_crate_dependencies))]

use std::process::exit;

use anyhow::Result;
use args::HoistArgs;
use clap::Parser;
use colored::Colorize;

mod args;
mod commands;
mod ops;

#[tokio::main]
async fn main() {
    let args = HoistArgs::parse();
    if let Err(err) = args.init_logging() {
        eprintln!("failed to initialize logging: {err}");
    }

    if let Err(err) = cli_main(args).await {
        eprintln!("{} {err:?}", "error:".red().bold());
        exit(1);
    }
}

async fn cli_main(args: HoistArgs) -> Result<()> {
    commands::run(args.command).await
}
