//! Config command implementation.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rebalance_optimizer::RebalanceConfig;

use crate::cli::OutputFormat;
use crate::output::print_json;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Validate and print this file instead of the defaults
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Executes the config command.
pub fn execute(args: ConfigArgs, format: OutputFormat) -> Result<()> {
    let config = match &args.config {
        Some(path) => RebalanceConfig::from_file(path)?,
        None => RebalanceConfig::default(),
    };

    match format {
        OutputFormat::Json => print_json(&config)?,
        _ => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}
