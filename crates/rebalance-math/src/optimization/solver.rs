//! The solver capability.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::expr::{LinearExpr, VarId};
use super::model::Model;
use crate::error::{MathError, MathResult};

/// Outcome of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Proven optimal within tolerances.
    Optimal,
    /// Feasible but not proven optimal.
    Feasible,
    /// No point satisfies the constraints.
    Infeasible,
    /// The objective is unbounded.
    Unbounded,
    /// The backend failed or stopped at a limit.
    Error,
}

impl SolveStatus {
    /// True if the status carries a usable primal point.
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Feasible => "feasible",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Result of a solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Solve status.
    pub status: SolveStatus,
    /// Primal values indexed by variable; empty without a usable point.
    pub values: Vec<f64>,
    /// Objective value in the model's own sense, if solved.
    pub objective_value: Option<f64>,
    /// Backend iterations, summed over successive approximations.
    pub iterations: u32,
    /// Wall time in seconds.
    pub solve_time: f64,
}

impl Solution {
    /// A solution carrying only a status.
    #[must_use]
    pub fn without_point(status: SolveStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value: None,
            iterations: 0,
            solve_time: 0.0,
        }
    }

    /// Primal value of a variable.
    pub fn value(&self, var: VarId) -> Option<f64> {
        self.values.get(var.index()).copied()
    }

    /// Evaluates an expression at the primal point.
    pub fn evaluate(&self, expr: &LinearExpr) -> Option<f64> {
        if self.status.has_solution() {
            Some(expr.evaluate(&self.values))
        } else {
            None
        }
    }
}

/// Narrow solver interface: take a model, return a status and primal values.
///
/// Implementations report infeasibility, unboundedness and limits through
/// [`Solution::status`]; `Err` is reserved for models the backend cannot
/// accept at all.
pub trait Solver {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Solves the model.
    fn solve(&mut self, model: &Model) -> MathResult<Solution>;
}

/// Backend settings passed straight through to the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Print backend output.
    pub verbose: bool,
    /// Maximum interior-point iterations per conic solve.
    pub max_iter: u32,
    /// Time limit in seconds per conic solve; unlimited when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<f64>,
    /// Absolute duality-gap tolerance.
    pub tol_gap_abs: f64,
    /// Relative duality-gap tolerance.
    pub tol_gap_rel: f64,
    /// Feasibility tolerance.
    pub tol_feas: f64,
    /// Maximum trust-region steps for the downside-risk constraint.
    pub max_outer_iterations: u32,
    /// Predicted relative objective improvement below which the
    /// downside-risk approximation counts as converged.
    pub outer_tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            verbose: false,
            max_iter: 200,
            time_limit: None,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
            tol_feas: 1e-8,
            max_outer_iterations: 50,
            outer_tolerance: 1e-6,
        }
    }
}

impl SolverSettings {
    /// Sets the iteration limit.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: u32) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the time limit in seconds.
    #[must_use]
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Enables backend output.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Checks that limits and tolerances are positive.
    pub fn validate(&self) -> MathResult<()> {
        if self.max_iter == 0 || self.max_outer_iterations == 0 {
            return Err(MathError::invalid_input("iteration limits must be positive"));
        }
        if let Some(limit) = self.time_limit {
            if !(limit > 0.0) {
                return Err(MathError::invalid_input(format!(
                    "time limit must be positive, got {}",
                    limit
                )));
            }
        }
        let tolerances = [
            ("tol_gap_abs", self.tol_gap_abs),
            ("tol_gap_rel", self.tol_gap_rel),
            ("tol_feas", self.tol_feas),
            ("outer_tolerance", self.outer_tolerance),
        ];
        for (name, value) in tolerances {
            if !(value.is_finite() && value > 0.0) {
                return Err(MathError::invalid_input(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
