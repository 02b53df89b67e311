//! Command implementations

mod assign;
mod config;
mod validate;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use anyhow::Result;

/// Execute a CLI command
pub fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Assign(args) => assign::execute(args, config_path, &output),
        Commands::Validate(args) => validate::execute(args, config_path, &output),
        Commands::Config(args) => config::execute(args, config_path, &output),
    }
}
