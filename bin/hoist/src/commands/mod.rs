use anyhow::Result;

use crate::args::Commands;

pub mod check;
pub mod deploy;
pub mod options;

pub async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Deploy(args) => args.run().await,
        Commands::Check(args) => args.run(),
    }
}
