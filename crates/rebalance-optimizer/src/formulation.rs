//! Optimization formulation of the rebalancing problem.
//!
//! Decision variables per segment `(a, s)`:
//!
//! - `x[a,s]`: exposure multiplier
//! - `inc[a,s]`, `dec[a,s]`: growth and shrink parts, `x = 1 + inc - dec`
//!
//! Per asset `E[a]` is the new exposure, `T` the new total and `D` the bound
//! on downside risk. Constraints:
//!
//! ```text
//! x[a,s] - inc[a,s] + dec[a,s]           = 1
//! Σ_s exposure[a,s] x[a,s] - E[a]        = 0
//! Σ_a E[a] - T                           = 0
//! Σ riskWeight exposure x - limit T     <= 0
//! minRel[a] exposure[a] <= E[a] <= maxRel[a] exposure[a]
//! z profit sqrt(Eᵀ Σ E) / T             <= D     (risk modes only)
//! ```

use rebalance_core::Portfolio;
use rebalance_math::optimization::{
    ConstraintSense, DownsideRiskConstraint, LinearExpr, Model, ObjectiveSense, VarId,
};
use tracing::debug;

use crate::config::RebalanceConfig;
use crate::error::RebalanceResult;

/// Variables of one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentVars {
    /// Owning asset.
    pub asset: String,
    /// Segment identifier.
    pub segment: String,
    /// Original exposure of the segment.
    pub exposure: f64,
    /// Multiplier.
    pub x: VarId,
    /// Growth part of the multiplier.
    pub inc: VarId,
    /// Shrink part of the multiplier.
    pub dec: VarId,
}

/// A rebalancing model plus the handles needed to read its solution.
#[derive(Debug, Clone)]
pub struct Formulation {
    model: Model,
    segments: Vec<SegmentVars>,
    exposures: Vec<(String, VarId)>,
    total: VarId,
    downside: VarId,
    profit: LinearExpr,
    transaction_cost: LinearExpr,
    net_profit: LinearExpr,
    z_score: f64,
    has_downside: bool,
}

impl Formulation {
    /// Builds variables, linear constraints and objective terms.
    ///
    /// The configuration is validated before any variable is created. No
    /// objective is set; the strategy decides it.
    pub fn new(portfolio: &Portfolio, config: &RebalanceConfig) -> RebalanceResult<Self> {
        config.validate()?;
        let z_score = config.z_score()?;

        let mut model = Model::new(format!("rebalance-{}", portfolio.id()));
        let mut segments = Vec::with_capacity(portfolio.segment_count());
        let mut exposures = Vec::with_capacity(portfolio.asset_count());
        let mut profit = LinearExpr::new();
        let mut transaction_cost = LinearExpr::new();
        let mut risk_weighted = LinearExpr::new();
        let mut total_expr = LinearExpr::new();

        for asset in portfolio.assets() {
            let e = model.add_variable(format!("E[{}]", asset.id()), 0.0, asset.total_exposure());
            let mut asset_expr = LinearExpr::new();

            for segment in asset.segments() {
                let key = format!("{},{}", asset.id(), segment.id());
                let exposure = segment.exposure();
                let x = model.add_variable(format!("x[{}]", key), 0.0, 1.0);
                let inc = model.add_variable(format!("inc[{}]", key), 0.0, 0.0);
                let dec = model.add_variable(format!("dec[{}]", key), 0.0, 0.0);

                // The split is only meaningful up to the largest multiplier the
                // asset bound allows; empty segments keep multiplier 1.
                if exposure > 0.0 {
                    let max_multiplier = asset.max_exposure() / exposure;
                    model.set_upper_bound(inc, (max_multiplier - 1.0).max(0.0))?;
                    model.set_upper_bound(dec, 1.0)?;
                } else {
                    model.set_upper_bound(inc, 0.0)?;
                    model.set_upper_bound(dec, 0.0)?;
                }

                model.add_constraint(
                    format!("split[{}]", key),
                    LinearExpr::from(x) - LinearExpr::from(inc) + LinearExpr::from(dec),
                    ConstraintSense::Equal,
                    1.0,
                );

                asset_expr.add_term(x, exposure);
                profit.add_term(x, exposure * segment.profitability());
                transaction_cost.add_term(inc, exposure * segment.rel_origination_cost());
                transaction_cost.add_term(dec, exposure * segment.rel_sell_cost());
                risk_weighted.add_term(x, exposure * segment.risk_weight());

                segments.push(SegmentVars {
                    asset: asset.id().to_string(),
                    segment: segment.id().to_string(),
                    exposure,
                    x,
                    inc,
                    dec,
                });
            }

            model.add_constraint(
                format!("exposure[{}]", asset.id()),
                asset_expr - LinearExpr::from(e),
                ConstraintSense::Equal,
                0.0,
            );
            if asset.min_exposure() == asset.max_exposure() {
                model.add_constraint(
                    format!("fixed_exposure[{}]", asset.id()),
                    LinearExpr::from(e),
                    ConstraintSense::Equal,
                    asset.total_exposure(),
                );
            } else {
                model.add_constraint(
                    format!("min_exposure[{}]", asset.id()),
                    LinearExpr::from(e),
                    ConstraintSense::GreaterEqual,
                    asset.min_exposure(),
                );
                model.add_constraint(
                    format!("max_exposure[{}]", asset.id()),
                    LinearExpr::from(e),
                    ConstraintSense::LessEqual,
                    asset.max_exposure(),
                );
            }

            total_expr.add_term(e, 1.0);
            exposures.push((asset.id().to_string(), e));
        }

        let total = model.add_variable("T", 0.0, portfolio.total_exposure());
        model.add_constraint(
            "total_exposure",
            total_expr - LinearExpr::from(total),
            ConstraintSense::Equal,
            0.0,
        );
        model.add_constraint(
            "risk_weight_limit",
            risk_weighted - LinearExpr::term(total, config.risk_weight_limit),
            ConstraintSense::LessEqual,
            0.0,
        );

        // D stays pinned at zero until the downside-risk constraint is installed.
        let downside = model.add_variable("D", 0.0, 0.0);
        model.set_upper_bound(downside, 0.0)?;

        let net_profit = profit.clone() - transaction_cost.clone();
        debug!(
            variables = model.variable_count(),
            constraints = model.constraints().len(),
            "built rebalancing formulation"
        );

        Ok(Self {
            model,
            segments,
            exposures,
            total,
            downside,
            profit,
            transaction_cost,
            net_profit,
            z_score,
            has_downside: false,
        })
    }

    /// Installs `z * profit * sqrt(Eᵀ Σ E) / T <= D` and frees `D`.
    ///
    /// Requires a correlation matrix on the portfolio.
    pub fn add_downside_constraint(&mut self, portfolio: &Portfolio) -> RebalanceResult<()> {
        let covariance = portfolio.covariance_matrix()?;
        self.model.set_downside_risk(DownsideRiskConstraint {
            name: "downside_risk".to_string(),
            scale: self.z_score,
            profit: self.profit.clone(),
            total: LinearExpr::from(self.total),
            exposures: self.exposures.iter().map(|(_, var)| *var).collect(),
            covariance,
            bound: self.downside,
        })?;
        self.model.clear_upper_bound(self.downside)?;
        self.has_downside = true;
        Ok(())
    }

    /// Adds `netProfit >= floor`.
    pub fn add_profit_floor(&mut self, floor: f64) {
        self.model.add_constraint(
            "net_profit_floor",
            self.net_profit.clone(),
            ConstraintSense::GreaterEqual,
            floor,
        );
    }

    /// Sets the objective.
    pub fn set_objective(&mut self, sense: ObjectiveSense, expr: LinearExpr) {
        self.model.set_objective(sense, expr);
    }

    /// The underlying model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Per-segment variables in portfolio order.
    pub fn segments(&self) -> &[SegmentVars] {
        &self.segments
    }

    /// Asset exposure variables in portfolio order.
    pub fn exposures(&self) -> &[(String, VarId)] {
        &self.exposures
    }

    /// Total exposure variable.
    pub fn total(&self) -> VarId {
        self.total
    }

    /// Downside-risk bound variable.
    pub fn downside(&self) -> VarId {
        self.downside
    }

    /// Expected profit `Σ exposure profitability x`.
    pub fn profit(&self) -> &LinearExpr {
        &self.profit
    }

    /// Transaction cost `Σ exposure (originationCost inc + sellCost dec)`.
    pub fn transaction_cost(&self) -> &LinearExpr {
        &self.transaction_cost
    }

    /// `profit - transactionCost`.
    pub fn net_profit(&self) -> &LinearExpr {
        &self.net_profit
    }

    /// z-score of the configured confidence level.
    pub fn z_score(&self) -> f64 {
        self.z_score
    }

    /// Whether the downside-risk constraint is installed.
    pub fn has_downside_constraint(&self) -> bool {
        self.has_downside
    }
}
