use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_log::{AsTrace, LogTracer};
use tracing_subscriber::FmtSubscriber;

use crate::commands::check::CheckArgs;
use crate::commands::deploy::DeployArgs;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct HoistArgs {
    #[clap(help = "Logging verbosity.")]
    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Deploy the contract suite to a network, in plan order, then wire the \
                       registry and persist the entry point address")]
    Deploy(Box<DeployArgs>),
    #[command(about = "Validate the plan against the compiled artifacts without submitting \
                       any transaction")]
    Check(CheckArgs),
}

impl HoistArgs {
    pub fn init_logging(&self) -> Result<(), Box<dyn std::error::Error>> {
        let verbose = self.verbose.log_level_filter().as_trace() >= LevelFilter::DEBUG;

        let default_log_filter: &str = if verbose {
            "none,hyper=off,hoist=trace,hoist_suite=trace,hoist_utils=trace"
        } else {
            "none,hyper=off,hoist=info,hoist_suite=info,hoist_utils=info"
        };

        LogTracer::init()?;

        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_log_filter)),
            )
            .finish();

        Ok(tracing::subscriber::set_global_default(subscriber)?)
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;
    use clap::Parser;

    use super::*;

    #[test]
    fn deploy_requires_network_and_gas_price() {
        let err = HoistArgs::try_parse_from(["hoist", "deploy", "sepolia"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let args = HoistArgs::try_parse_from(["hoist", "deploy", "sepolia", "2"]).unwrap();
        let Commands::Deploy(deploy) = args.command else { panic!("expected deploy") };
        assert_eq!(deploy.network, "sepolia");
        assert_eq!(deploy.gas_price, 2);
    }

    #[test]
    fn gas_price_must_be_integral_gwei() {
        let err = HoistArgs::try_parse_from(["hoist", "deploy", "sepolia", "1.5"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }
}
