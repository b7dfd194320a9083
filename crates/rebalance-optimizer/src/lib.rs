//! # Rebalance Optimizer
//!
//! Risk-constrained rebalancing of segmented loan portfolios.
//!
//! A run takes an original [`Portfolio`](rebalance_core::Portfolio), chooses
//! an exposure multiplier per segment and returns the rebalanced portfolio
//! together with a KPI report:
//!
//! - [`builder`]: input tables to portfolio, allocation to new portfolio
//! - [`formulation`]: variables, constraints and objective terms
//! - [`strategy`]: risk-ignored, weighted and lexicographic solving
//! - [`extraction`]: allocation and solver-side KPIs
//! - [`report`]: output tables and realized KPIs
//! - [`tables`]: CSV readers and writers
//!
//! ## Example
//!
//! ```rust,no_run
//! use rebalance_math::optimization::ClarabelSolver;
//! use rebalance_optimizer::prelude::*;
//!
//! # fn main() -> Result<(), RebalanceError> {
//! let segments = read_segments(std::fs::File::open("segments.csv")?)?;
//! let assets = read_assets(std::fs::File::open("assets.csv")?)?;
//! let correlation = read_correlation(std::fs::File::open("correlation.csv")?)?;
//! let portfolio = from_tables(&segments, &assets, Some(correlation))?;
//!
//! let config = RebalanceConfig::default().with_risk_weight_limit(0.35);
//! let mut solver = ClarabelSolver::new(config.solver.clone());
//! let outcome = rebalance(&portfolio, &config, &mut solver)?;
//! println!("net profit: {}", outcome.report.realized.net_profit);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::float_cmp)]
#![allow(clippy::uninlined_format_args)]

pub mod builder;
pub mod config;
pub mod error;
pub mod extraction;
pub mod formulation;
pub mod report;
pub mod strategy;
pub mod tables;

use rebalance_core::Portfolio;
use rebalance_math::optimization::Solver;
use tracing::info;

use crate::error::Phase;
use crate::extraction::Extraction;
use crate::report::RebalanceReport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::builder::{from_tables, new_portfolio};
    pub use crate::config::{RebalanceConfig, LEXICOGRAPHIC_REL_TOL};
    pub use crate::error::{Phase, RebalanceError, RebalanceResult};
    pub use crate::extraction::{extract, Allocation, Extraction, SegmentSplit, SolveSummary};
    pub use crate::formulation::Formulation;
    pub use crate::report::{AssetRow, RealizedKpis, RebalanceReport, SegmentRow};
    pub use crate::strategy::{Mode, ProfitPhase, RiskPhase, Solved};
    pub use crate::tables::{
        read_assets, read_correlation, read_segments, write_records, AssetRecord, SegmentRecord,
    };
    pub use crate::{rebalance, RebalanceOutcome};
}

pub use config::RebalanceConfig;
pub use error::{RebalanceError, RebalanceResult};

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RebalanceOutcome {
    /// Phase whose solution was applied.
    pub phase: Phase,
    /// The rebalanced portfolio.
    pub portfolio: Portfolio,
    /// Allocation, splits and solver-side KPIs.
    pub extraction: Extraction,
    /// Output tables and KPIs.
    pub report: RebalanceReport,
}

/// Runs the full pipeline on an original portfolio.
///
/// Formulates and solves according to `config`, extracts the allocation,
/// applies it to `portfolio` and reports. `portfolio` is never modified.
pub fn rebalance<S: Solver + ?Sized>(
    portfolio: &Portfolio,
    config: &RebalanceConfig,
    solver: &mut S,
) -> RebalanceResult<RebalanceOutcome> {
    let solved = strategy::solve(portfolio, config, solver)?;
    let extraction = extraction::extract(&solved.formulation, &solved.solution)?;
    let rebalanced = builder::new_portfolio(portfolio, &extraction.allocation)?;
    let report = RebalanceReport::new(
        portfolio,
        &rebalanced,
        &extraction.allocation,
        extraction.summary.clone(),
        solved.formulation.z_score(),
    )?;

    info!(
        phase = %solved.phase,
        net_profit = report.realized.net_profit,
        average_risk_weight = report.realized.average_risk_weight,
        optimized_exposure = report.realized.optimized_exposure,
        "rebalancing finished"
    );

    Ok(RebalanceOutcome {
        phase: solved.phase,
        portfolio: rebalanced,
        extraction,
        report,
    })
}
