//! Rebalance CLI - risk-constrained portfolio rebalancing from CSV tables.
//!
//! # Usage
//!
//! ```bash
//! # Rebalance with the default lexicographic strategy
//! rebalance run --segments segments.csv --assets assets.csv --correlation corr.csv
//!
//! # Ignore downside risk and tighten the risk-weight ceiling
//! rebalance run --segments segments.csv --assets assets.csv --correlation corr.csv \
//!     --ignore-risk --risk-weight-limit 0.35 --output-dir out/
//!
//! # Check inputs without solving
//! rebalance inspect --segments segments.csv --assets assets.csv --correlation corr.csv
//!
//! # Print the default configuration
//! rebalance config
//! ```

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod commands;
mod error;
mod output;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = dispatch(cli) {
        output::notify(output::Notice::Error, &format!("{:#}", err));
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let format = cli.format;
    match cli.command {
        Commands::Run(args) => commands::run::execute(args, format, cli.quiet),
        Commands::Inspect(args) => commands::inspect::execute(args, format),
        Commands::Config(args) => commands::config::execute(args, format),
    }
}

/// `RUST_LOG` wins; otherwise `-v` selects info and `-vv` debug.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
