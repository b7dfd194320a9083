//! Bi-objective solving strategies.
//!
//! Net profit and downside risk pull in opposite directions. Three modes
//! trade them off:
//!
//! - [`Mode::RiskIgnored`]: maximize net profit, no downside-risk constraint
//! - [`Mode::Weighted`]: maximize `w * netProfit - (1 - w) * D`
//! - [`Mode::Lexicographic`]: [`ProfitPhase`] maximizes net profit, then
//!   [`RiskPhase`] minimizes `D` while keeping net profit within
//!   [`LEXICOGRAPHIC_REL_TOL`] of that optimum
//!
//! A phase that ends without a usable point stops the run with
//! [`RebalanceError::SolverStatus`].

use rebalance_core::Portfolio;
use rebalance_math::optimization::{LinearExpr, ObjectiveSense, Solution, Solver};
use tracing::{info, warn};

use crate::config::{RebalanceConfig, LEXICOGRAPHIC_REL_TOL};
use crate::error::{Phase, RebalanceError, RebalanceResult};
use crate::formulation::Formulation;

/// How profit and downside risk are traded off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    /// Maximize net profit only.
    RiskIgnored,
    /// Maximize a weighted difference of net profit and downside risk.
    Weighted {
        /// Weight of net profit, in `[0, 1]`.
        profit_weight: f64,
    },
    /// Maximize net profit, then minimize downside risk.
    Lexicographic,
}

/// A formulation together with the solution that ended the run.
#[derive(Debug, Clone)]
pub struct Solved {
    /// Phase that produced the solution.
    pub phase: Phase,
    /// The formulation that was solved.
    pub formulation: Formulation,
    /// The solver's answer.
    pub solution: Solution,
}

/// Runs the mode selected by `config`.
pub fn solve<S: Solver + ?Sized>(
    portfolio: &Portfolio,
    config: &RebalanceConfig,
    solver: &mut S,
) -> RebalanceResult<Solved> {
    let mode = config.mode();
    info!(?mode, backend = solver.name(), "starting rebalancing solve");
    match mode {
        Mode::RiskIgnored => {
            let mut formulation = Formulation::new(portfolio, config)?;
            let objective = formulation.net_profit().clone();
            formulation.set_objective(ObjectiveSense::Maximize, objective);
            run_phase(solver, formulation, Phase::Single)
        }
        Mode::Weighted { profit_weight } => {
            let mut formulation = Formulation::new(portfolio, config)?;
            formulation.add_downside_constraint(portfolio)?;
            let objective = formulation.net_profit().scaled(profit_weight)
                - LinearExpr::term(formulation.downside(), 1.0 - profit_weight);
            formulation.set_objective(ObjectiveSense::Maximize, objective);
            run_phase(solver, formulation, Phase::Single)
        }
        Mode::Lexicographic => ProfitPhase::new(portfolio, config)
            .solve(solver)?
            .solve(solver),
    }
}

/// First lexicographic phase: maximize net profit without the
/// downside-risk constraint.
#[derive(Debug, Clone, Copy)]
pub struct ProfitPhase<'a> {
    portfolio: &'a Portfolio,
    config: &'a RebalanceConfig,
}

impl<'a> ProfitPhase<'a> {
    /// Prepares the profit phase.
    pub fn new(portfolio: &'a Portfolio, config: &'a RebalanceConfig) -> Self {
        Self { portfolio, config }
    }

    /// Solves the profit phase and hands its optimum to the risk phase.
    pub fn solve<S: Solver + ?Sized>(self, solver: &mut S) -> RebalanceResult<RiskPhase<'a>> {
        let mut formulation = Formulation::new(self.portfolio, self.config)?;
        let objective = formulation.net_profit().clone();
        formulation.set_objective(ObjectiveSense::Maximize, objective);
        let solved = run_phase(solver, formulation, Phase::Profit)?;
        let net_profit_optimum = solved.formulation.net_profit().evaluate(&solved.solution.values);

        Ok(RiskPhase {
            portfolio: self.portfolio,
            config: self.config,
            net_profit_optimum,
        })
    }
}

/// Second lexicographic phase: minimize downside risk subject to a net
/// profit floor.
#[derive(Debug, Clone, Copy)]
pub struct RiskPhase<'a> {
    portfolio: &'a Portfolio,
    config: &'a RebalanceConfig,
    net_profit_optimum: f64,
}

impl RiskPhase<'_> {
    /// Net profit optimum of the profit phase.
    pub fn net_profit_optimum(&self) -> f64 {
        self.net_profit_optimum
    }

    /// `netProfit* - relTol * |netProfit*|`.
    pub fn profit_floor(&self) -> f64 {
        self.net_profit_optimum - LEXICOGRAPHIC_REL_TOL * self.net_profit_optimum.abs()
    }

    /// Solves the risk phase.
    pub fn solve<S: Solver + ?Sized>(self, solver: &mut S) -> RebalanceResult<Solved> {
        let mut formulation = Formulation::new(self.portfolio, self.config)?;
        formulation.add_profit_floor(self.profit_floor());
        formulation.add_downside_constraint(self.portfolio)?;
        let objective = LinearExpr::from(formulation.downside());
        formulation.set_objective(ObjectiveSense::Minimize, objective);
        run_phase(solver, formulation, Phase::Risk)
    }
}

fn run_phase<S: Solver + ?Sized>(
    solver: &mut S,
    formulation: Formulation,
    phase: Phase,
) -> RebalanceResult<Solved> {
    let solution = solver.solve(formulation.model())?;
    if !solution.status.has_solution() {
        warn!(%phase, status = %solution.status, "solve produced no usable allocation");
        return Err(RebalanceError::solver_status(phase, solution.status));
    }
    info!(
        %phase,
        status = %solution.status,
        objective = ?solution.objective_value,
        iterations = solution.iterations,
        "phase solved"
    );
    Ok(Solved {
        phase,
        formulation,
        solution,
    })
}
