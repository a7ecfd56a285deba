//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`], [`validate`], or [`health`]. Each handler
//! lives in its own submodule.

pub mod health;
pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::HydraError;

pub async fn dispatch(cli: Cli) -> Result<(), HydraError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Validate(ref args)) => validate::execute(args).await,
        Some(Commands::Health(args)) => health::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  hydra v{version}: programmable HTTP mock server\n\n  \
         No command provided. To get started:\n\n    \
         hydra run                      Start the server (auto-detects ./hydra.yaml)\n    \
         hydra run -c mocks.yaml        Start with a specific config file\n    \
         hydra validate mocks.yaml      Check a config file\n    \
         hydra --help                   See all commands and options\n"
    );
}
