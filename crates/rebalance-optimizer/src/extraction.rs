//! Reading an allocation and solver-side KPIs out of a solution.

use std::collections::BTreeMap;

use rebalance_core::CoreError;
use rebalance_math::optimization::{Solution, SolveStatus};
use rebalance_math::MathError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::RebalanceResult;
use crate::formulation::Formulation;

/// Multipliers this far below zero are solver noise and clamp to 0.
pub const NEGATIVE_MULTIPLIER_TOLERANCE: f64 = 1e-9;

/// Exposure multiplier per `(asset, segment)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allocation {
    multipliers: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Allocation {
    /// An empty allocation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the multiplier of a segment.
    pub fn insert(&mut self, asset: impl Into<String>, segment: impl Into<String>, multiplier: f64) {
        self.multipliers
            .entry(asset.into())
            .or_default()
            .insert(segment.into(), multiplier);
    }

    /// Multiplier of a segment.
    pub fn get(&self, asset: &str, segment: &str) -> Option<f64> {
        self.multipliers.get(asset)?.get(segment).copied()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.multipliers.values().map(BTreeMap::len).sum()
    }

    /// True if no segment has a multiplier.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(asset, segment, multiplier)` ordered by asset then segment.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.multipliers.iter().flat_map(|(asset, segments)| {
            segments
                .iter()
                .map(move |(segment, &m)| (asset.as_str(), segment.as_str(), m))
        })
    }
}

/// Growth and shrink parts of a segment multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSplit {
    /// Owning asset.
    pub asset: String,
    /// Segment identifier.
    pub segment_id: String,
    /// Multiplier after clamping.
    pub multiplier: f64,
    /// `max(multiplier - 1, 0)`.
    pub increase: f64,
    /// `max(1 - multiplier, 0)`.
    pub decrease: f64,
}

/// KPIs as the solver sees them, before rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveSummary {
    /// Status of the solve that produced the allocation.
    pub status: SolveStatus,
    /// Expected profit minus transaction cost.
    pub net_profit: f64,
    /// Expected profit.
    pub expected_profit: f64,
    /// Transaction cost of the split rebuilt from the multipliers.
    pub transaction_cost: f64,
    /// New total exposure.
    pub optimized_exposure: f64,
    /// Downside risk, when the downside-risk constraint took part.
    pub downside: Option<f64>,
    /// Profit standard deviation implied by the downside risk.
    pub profit_stdev: Option<f64>,
    /// Backend iterations.
    pub iterations: u32,
}

/// Everything read out of a solved formulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Multipliers to apply to the original portfolio.
    pub allocation: Allocation,
    /// Per-segment increase and decrease parts.
    pub splits: Vec<SegmentSplit>,
    /// Solver-side KPIs.
    pub summary: SolveSummary,
}

/// Reads the allocation and KPIs from a solution of `formulation`.
///
/// Fails if the solution has no primal point or a multiplier is negative
/// beyond [`NEGATIVE_MULTIPLIER_TOLERANCE`].
pub fn extract(formulation: &Formulation, solution: &Solution) -> RebalanceResult<Extraction> {
    if !solution.status.has_solution() || solution.values.len() < formulation.model().variable_count() {
        return Err(MathError::invalid_input(format!(
            "solution with status '{}' carries no usable point",
            solution.status
        ))
        .into());
    }
    let values = &solution.values;
    // KPIs use the split rebuilt from each multiplier.
    let mut split_values = values.clone();

    let mut allocation = Allocation::new();
    let mut splits = Vec::with_capacity(formulation.segments().len());
    for vars in formulation.segments() {
        let raw = values[vars.x.index()];
        if !raw.is_finite() || raw < -NEGATIVE_MULTIPLIER_TOLERANCE {
            return Err(CoreError::invalid_field(
                &vars.segment,
                "multiplier",
                raw,
                "solver returned a negative multiplier",
            )
            .into());
        }
        let multiplier = raw.max(0.0);
        let increase = (multiplier - 1.0).max(0.0);
        let decrease = (1.0 - multiplier).max(0.0);
        split_values[vars.x.index()] = multiplier;
        split_values[vars.inc.index()] = increase;
        split_values[vars.dec.index()] = decrease;

        allocation.insert(&vars.asset, &vars.segment, multiplier);
        splits.push(SegmentSplit {
            asset: vars.asset.clone(),
            segment_id: vars.segment.clone(),
            multiplier,
            increase,
            decrease,
        });
    }

    let expected_profit = formulation.profit().evaluate(&split_values);
    let transaction_cost = formulation.transaction_cost().evaluate(&split_values);
    let net_profit = formulation.net_profit().evaluate(&split_values);
    let solver_cost = formulation.transaction_cost().evaluate(values);
    if (solver_cost - transaction_cost).abs() > 1e-6 * transaction_cost.abs().max(1.0) {
        debug!(solver_cost, transaction_cost, "solver split carried offsetting growth and shrink");
    }
    let optimized_exposure = values[formulation.total().index()];

    let downside = formulation
        .model()
        .downside_risk()
        .map(|risk| risk.lhs_at(values));
    let z_score = formulation.z_score();
    let profit_stdev = downside
        .filter(|_| expected_profit > 0.0 && z_score > 0.0)
        .map(|d| d / (z_score * expected_profit));

    debug!(segments = splits.len(), "extracted allocation");
    info!(
        net_profit,
        expected_profit,
        transaction_cost,
        optimized_exposure,
        ?downside,
        "solution KPIs"
    );

    Ok(Extraction {
        allocation,
        splits,
        summary: SolveSummary {
            status: solution.status,
            net_profit,
            expected_profit,
            transaction_cost,
            optimized_exposure,
            downside,
            profit_stdev,
            iterations: solution.iterations,
        },
    })
}
