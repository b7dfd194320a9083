//! Inspect command implementation.
//!
//! Builds and validates the portfolio from the input tables without solving.

use anyhow::Result;
use clap::Args;
use rebalance_core::{Asset, Portfolio};
use serde::Serialize;
use tabled::Tabled;

use super::InputArgs;
use crate::cli::OutputFormat;
use crate::output::{format_amount, print_rows, print_section, KpiSheet};

/// Arguments for the inspect command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

/// Asset-level aggregates of the original portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct AssetSummary {
    #[tabled(rename = "Asset")]
    pub asset: String,
    #[tabled(rename = "Segments")]
    pub segments: usize,
    #[tabled(rename = "Exposure")]
    pub exposure: f64,
    #[tabled(rename = "Profit")]
    pub profit: f64,
    #[tabled(rename = "Avg RW")]
    pub average_risk_weight: f64,
    #[tabled(rename = "Min exposure")]
    pub min_exposure: f64,
    #[tabled(rename = "Max exposure")]
    pub max_exposure: f64,
    #[tabled(rename = "Profit stdev")]
    pub profit_stdev: f64,
}

impl From<&Asset> for AssetSummary {
    fn from(asset: &Asset) -> Self {
        Self {
            asset: asset.id().to_string(),
            segments: asset.segment_count(),
            exposure: asset.total_exposure(),
            profit: asset.total_profit(),
            average_risk_weight: asset.average_risk_weight(),
            min_exposure: asset.min_exposure(),
            max_exposure: asset.max_exposure(),
            profit_stdev: asset.profit_stdev(),
        }
    }
}

/// Per-asset summaries in portfolio order.
pub fn summarize(portfolio: &Portfolio) -> Vec<AssetSummary> {
    portfolio.assets().map(AssetSummary::from).collect()
}

/// Executes the inspect command.
pub fn execute(args: InspectArgs, format: OutputFormat) -> Result<()> {
    let portfolio = args.input.load_portfolio()?;
    let summaries = summarize(&portfolio);

    if format != OutputFormat::Table {
        return match format {
            OutputFormat::Minimal => {
                println!("{}", format_amount(portfolio.total_exposure()));
                Ok(())
            }
            _ => print_rows(&summaries, format),
        };
    }

    KpiSheet::new("Portfolio")
        .text("Assets", portfolio.asset_count())
        .text("Segments", portfolio.segment_count())
        .amount("Total exposure", portfolio.total_exposure())
        .amount("Expected profit", portfolio.total_profit())
        .ratio("Average risk weight", portfolio.average_risk_weight())
        .print();

    print_section("Assets");
    print_rows(&summaries, format)?;

    let exposure_floor: f64 = summaries.iter().map(|s| s.min_exposure).sum();
    let exposure_ceiling: f64 = summaries.iter().map(|s| s.max_exposure).sum();
    println!(
        "\nReachable total exposure: {} to {}",
        format_amount(exposure_floor),
        format_amount(exposure_ceiling)
    );
    Ok(())
}
