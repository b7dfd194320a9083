//! Run command implementation.
//!
//! Solves the rebalancing problem for the input tables and reports the
//! rebalanced portfolio.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use rebalance_math::optimization::{ClarabelSolver, SolveStatus};
use rebalance_optimizer::prelude::*;
use serde::Serialize;
use tabled::Tabled;
use tracing::info;

use super::{validate_confidence, validate_profit_weight, validate_risk_weight_limit, InputArgs};
use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::output::{
    format_amount, format_change, format_multiplier, format_ratio, notify, print_csv,
    print_json, print_rows, print_section, KpiSheet, Notice,
};

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Configuration file (TOML); flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ceiling on the exposure-weighted average risk weight
    #[arg(long)]
    pub risk_weight_limit: Option<f64>,

    /// Confidence level of the downside-risk measure
    #[arg(long)]
    pub confidence_interval: Option<f64>,

    /// Maximize net profit without the downside-risk constraint
    #[arg(long)]
    pub ignore_risk: bool,

    /// Weight of net profit in [0, 1] for a weighted solve; negative selects
    /// the lexicographic strategy
    #[arg(long, allow_negative_numbers = true)]
    pub profit_weight: Option<f64>,

    /// Directory for segments.csv, assets.csv and kpis.json
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl RunArgs {
    /// Loads the configuration file, if any, and applies flag overrides.
    pub fn effective_config(&self) -> Result<RebalanceConfig> {
        let mut config = match &self.config {
            Some(path) => RebalanceConfig::from_file(path)?,
            None => RebalanceConfig::default(),
        };
        if let Some(limit) = self.risk_weight_limit {
            config = config.with_risk_weight_limit(validate_risk_weight_limit(limit)?);
        }
        if let Some(confidence) = self.confidence_interval {
            config = config.with_confidence_interval(validate_confidence(confidence)?);
        }
        if self.ignore_risk {
            config = config.with_consider_risk(false);
        }
        if let Some(weight) = self.profit_weight {
            config = config.with_profit_weight(validate_profit_weight(weight)?);
        }
        config.validate()?;
        Ok(config)
    }
}

/// JSON document for a finished run.
#[derive(Debug, Serialize)]
struct RunDocument<'a> {
    phase: Phase,
    report: &'a RebalanceReport,
}

/// KPI file written next to the output tables.
#[derive(Debug, Serialize)]
struct KpiDocument<'a> {
    phase: Phase,
    solver: &'a SolveSummary,
    realized: &'a RealizedKpis,
}

#[derive(Tabled, Serialize)]
struct AssetDisplay {
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Original")]
    original: String,
    #[tabled(rename = "Rebalanced")]
    rebalanced: String,
    #[tabled(rename = "Change")]
    change: String,
    #[tabled(rename = "Avg RW")]
    average_risk_weight: String,
}

impl From<&AssetRow> for AssetDisplay {
    fn from(row: &AssetRow) -> Self {
        Self {
            asset: row.asset.clone(),
            original: format_amount(row.original_exposure),
            rebalanced: format_amount(row.rebalanced_exposure),
            change: format_change(row.exposure_change),
            average_risk_weight: format_ratio(row.average_risk_weight),
        }
    }
}

#[derive(Tabled, Serialize)]
struct SegmentDisplay {
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Segment")]
    segment_id: String,
    #[tabled(rename = "Original")]
    original: String,
    #[tabled(rename = "Multiplier")]
    multiplier: String,
    #[tabled(rename = "Rebalanced")]
    rebalanced: String,
}

impl From<&SegmentRow> for SegmentDisplay {
    fn from(row: &SegmentRow) -> Self {
        Self {
            asset: row.asset.clone(),
            segment_id: row.segment_id.clone(),
            original: format_amount(row.original_exposure),
            multiplier: format_multiplier(row.multiplier),
            rebalanced: format_amount(row.rebalanced_exposure),
        }
    }
}

/// Executes the run command.
pub fn execute(args: RunArgs, format: OutputFormat, quiet: bool) -> Result<()> {
    let config = args.effective_config()?;
    let portfolio = args.input.load_portfolio()?;
    info!(
        assets = portfolio.asset_count(),
        segments = portfolio.segment_count(),
        mode = ?config.mode(),
        "running rebalance"
    );

    let mut solver = ClarabelSolver::new(config.solver.clone());
    let outcome = rebalance(&portfolio, &config, &mut solver)?;
    let report = &outcome.report;
    if report.solver.status != SolveStatus::Optimal && !quiet {
        notify(
            Notice::Warning,
            &format!(
                "{} phase stopped at status {}; the allocation is feasible but may not be optimal",
                outcome.phase, report.solver.status
            ),
        );
    }

    match format {
        OutputFormat::Table => print_tables(outcome.phase, report)?,
        OutputFormat::Json => print_json(&RunDocument {
            phase: outcome.phase,
            report,
        })?,
        OutputFormat::Csv => print_csv(&report.segments)?,
        OutputFormat::Minimal => println!("{}", format_amount(report.realized.net_profit)),
    }

    if let Some(dir) = &args.output_dir {
        write_outputs(dir, outcome.phase, report)?;
        if !quiet {
            notify(
                Notice::Success,
                &format!("Wrote segments.csv, assets.csv and kpis.json to {}", dir.display()),
            );
        }
    }
    Ok(())
}

fn print_tables(phase: Phase, report: &RebalanceReport) -> Result<()> {
    let solver = &report.solver;
    KpiSheet::new("Solver KPIs")
        .text("Phase", phase)
        .text("Status", solver.status)
        .text("Iterations", solver.iterations)
        .amount("Net profit", solver.net_profit)
        .amount("Expected profit", solver.expected_profit)
        .amount("Transaction cost", solver.transaction_cost)
        .amount("Optimized exposure", solver.optimized_exposure)
        .optional_amount("Downside risk", solver.downside)
        .optional_percent("Profit stdev", solver.profit_stdev)
        .print();

    let realized = &report.realized;
    KpiSheet::new("Realized KPIs")
        .amount("Expected profit", realized.expected_profit)
        .amount("Transaction cost", realized.transaction_cost)
        .amount("Net profit", realized.net_profit)
        .percent("Average risk weight", realized.average_risk_weight)
        .amount("Initial exposure", realized.initial_exposure)
        .amount("Optimized exposure", realized.optimized_exposure)
        .optional_amount("Downside risk", realized.downside)
        .print();

    print_section("Assets");
    let assets: Vec<AssetDisplay> = report.assets.iter().map(AssetDisplay::from).collect();
    print_rows(&assets, OutputFormat::Table)?;

    print_section("Segments");
    let segments: Vec<SegmentDisplay> = report.segments.iter().map(SegmentDisplay::from).collect();
    print_rows(&segments, OutputFormat::Table)?;

    if realized.optimized_exposure < realized.initial_exposure {
        notify(Notice::Info, "Total exposure shrinks");
    }
    Ok(())
}

fn write_outputs(dir: &Path, phase: Phase, report: &RebalanceReport) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| CliError::Write {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    write_records(create(&dir.join("segments.csv"))?, &report.segments)?;
    write_records(create(&dir.join("assets.csv"))?, &report.assets)?;

    let kpis = KpiDocument {
        phase,
        solver: &report.solver,
        realized: &report.realized,
    };
    let path = dir.join("kpis.json");
    fs::write(&path, serde_json::to_string_pretty(&kpis)?).map_err(|e| CliError::Write {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    info!(dir = %dir.display(), "outputs written");
    Ok(())
}

fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| {
        CliError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
        .into()
    })
}
