//! Clarabel solver integration.
//!
//! Linear rows become zero and nonnegative cones. The downside-risk
//! constraint is handled by sequential convex programming. The covariance
//! is factored as `F Fᵀ`, and at the incumbent point `v` the left-hand side
//! `ratio(x) * ‖Fᵀ E‖` is replaced by
//!
//! ```text
//! ratio(v) * ‖Fᵀ E‖ + ‖Fᵀ E(v)‖ * slope_v(x)
//! ```
//!
//! where `slope_v` is the first-order change of the ratio. That is a
//! second-order cone in `(bound - ‖Fᵀ E(v)‖ slope_v(x), ratio(v) Fᵀ E)`.
//! Steps are kept inside a trust region and accepted by comparing the
//! predicted objective change against the change of the objective with
//! the bound set to the exact left-hand side.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use nalgebra::DMatrix;
use tracing::{debug, info, warn};

use super::expr::LinearExpr;
use super::model::{ConstraintSense, DownsideRiskConstraint, Model, Objective, ObjectiveSense};
use super::solver::{Solution, SolveStatus, Solver, SolverSettings};
use crate::error::{MathError, MathResult};
use crate::linear_algebra::psd_factor;

impl From<SolverStatus> for SolveStatus {
    fn from(status: SolverStatus) -> Self {
        match status {
            SolverStatus::Solved => SolveStatus::Optimal,
            SolverStatus::AlmostSolved => SolveStatus::Feasible,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                SolveStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                SolveStatus::Unbounded
            }
            _ => SolveStatus::Error,
        }
    }
}

/// Conic interior-point backend.
#[derive(Debug, Clone, Default)]
pub struct ClarabelSolver {
    settings: SolverSettings,
}

impl ClarabelSolver {
    /// Creates a backend with the given settings.
    #[must_use]
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    /// Backend settings.
    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    fn solve_successive(
        &self,
        model: &Model,
        risk: &DownsideRiskConstraint,
    ) -> MathResult<Solution> {
        let factor = psd_factor(&risk.covariance)?;
        let objective = model
            .objective()
            .ok_or_else(|| MathError::invalid_input("model has no objective"))?;
        let sign = match objective.sense {
            ObjectiveSense::Minimize => 1.0,
            ObjectiveSense::Maximize => -1.0,
        };
        let merit = |values: &[f64]| sign * objective.expr.evaluate(values);

        // The ratio frozen at the start point gives the first feasible point.
        let start = model.start_point();
        let first = self.solve_conic(model, Some(&Approximation::frozen(risk, &factor, &start)))?;
        let mut iterations = first.iterations;
        let mut solve_time = first.solve_time;
        if !first.status.has_solution() {
            debug!(status = %first.status, "initial downside-risk approximation failed");
            return Ok(first);
        }
        let mut incumbent = tightened(risk, first.values);
        let mut radius = INITIAL_TRUST_RADIUS;

        for outer in 1..=self.settings.max_outer_iterations {
            let current = merit(&incumbent);
            let step = {
                let approximation = Approximation::linearized(risk, &factor, &incumbent, radius);
                self.solve_conic(model, Some(&approximation))?
            };
            iterations += step.iterations;
            solve_time += step.solve_time;

            if !step.status.has_solution() {
                debug!(outer, status = %step.status, radius, "trust-region step failed");
                radius *= SHRINK;
                if radius < MIN_TRUST_RADIUS {
                    break;
                }
                continue;
            }

            let predicted = current - merit(&step.values);
            if predicted <= self.settings.outer_tolerance * current.abs().max(1.0) {
                info!(
                    outer,
                    iterations,
                    objective = sign * current,
                    "downside-risk approximation converged"
                );
                let status = if step.status == SolveStatus::Optimal {
                    SolveStatus::Optimal
                } else {
                    SolveStatus::Feasible
                };
                return Ok(finish(status, incumbent, objective, iterations, solve_time));
            }

            let candidate = tightened(risk, step.values);
            let actual = current - merit(&candidate);
            let agreement = actual / predicted;
            debug!(outer, radius, predicted, actual, agreement, "trust-region step");

            if agreement >= ACCEPT {
                incumbent = candidate;
                if agreement > EXPAND {
                    radius = (radius * 2.0).min(MAX_TRUST_RADIUS);
                }
            } else {
                radius *= SHRINK;
                if radius < MIN_TRUST_RADIUS {
                    break;
                }
            }
        }

        warn!(
            max_outer_iterations = self.settings.max_outer_iterations,
            radius,
            "downside-risk approximation did not converge; returning the best feasible point"
        );
        Ok(finish(SolveStatus::Feasible, incumbent, objective, iterations, solve_time))
    }

    fn solve_conic(
        &self,
        model: &Model,
        risk: Option<&Approximation<'_>>,
    ) -> MathResult<Solution> {
        let n = model.variable_count();
        let objective = model
            .objective()
            .ok_or_else(|| MathError::invalid_input("model has no objective"))?;

        let mut zero = RowBlock::default();
        let mut nonneg = RowBlock::default();
        for constraint in model.constraints() {
            let rhs = constraint.rhs - constraint.expr.constant_value();
            match constraint.sense {
                ConstraintSense::Equal => zero.push_expr(&constraint.expr, 1.0, rhs),
                ConstraintSense::LessEqual => nonneg.push_expr(&constraint.expr, 1.0, rhs),
                ConstraintSense::GreaterEqual => nonneg.push_expr(&constraint.expr, -1.0, -rhs),
            }
        }
        for (j, variable) in model.variables().iter().enumerate() {
            if variable.upper == Some(variable.lower) {
                zero.push(vec![(j, 1.0)], variable.lower);
                continue;
            }
            if variable.lower.is_finite() {
                nonneg.push(vec![(j, -1.0)], -variable.lower);
            }
            if let Some(upper) = variable.upper {
                nonneg.push(vec![(j, 1.0)], upper);
            }
        }

        // s = [bound - slope; ratio * Fᵀ E] in the second-order cone.
        let mut soc = RowBlock::default();
        if let Some(approx) = risk {
            let (risk, factor, ratio) = (approx.risk, approx.factor, approx.ratio);
            if ratio > 0.0 {
                let mut head = vec![(risk.bound.index(), -1.0)];
                head.extend(approx.slope.terms().iter().map(|(var, coef)| (var.index(), *coef)));
                soc.push(head, -approx.slope.constant_value());
                for k in 0..factor.ncols() {
                    let row = risk
                        .exposures
                        .iter()
                        .enumerate()
                        .map(|(i, var)| (var.index(), -ratio * factor[(i, k)]))
                        .collect();
                    soc.push(row, 0.0);
                }
            }
            if let Some((center, radius)) = approx.trust_region {
                for (j, variable) in model.variables().iter().enumerate() {
                    if j == risk.bound.index() || variable.upper == Some(variable.lower) {
                        continue;
                    }
                    let width = radius * center[j].abs().max(1.0);
                    nonneg.push(vec![(j, 1.0)], center[j] + width);
                    nonneg.push(vec![(j, -1.0)], width - center[j]);
                }
            }
        }

        let sign = match objective.sense {
            ObjectiveSense::Minimize => 1.0,
            ObjectiveSense::Maximize => -1.0,
        };
        let mut q = vec![0.0; n];
        for &(var, coef) in objective.expr.terms() {
            q[var.index()] += sign * coef;
        }

        let mut cones = Vec::new();
        if !zero.is_empty() {
            cones.push(SupportedConeT::ZeroConeT(zero.len()));
        }
        if !nonneg.is_empty() {
            cones.push(SupportedConeT::NonnegativeConeT(nonneg.len()));
        }
        if !soc.is_empty() {
            cones.push(SupportedConeT::SecondOrderConeT(soc.len()));
        }

        let mut rows = zero;
        rows.extend(nonneg);
        rows.extend(soc);
        let (a, b) = rows.into_csc(n);
        let p = CscMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());

        let settings = DefaultSettingsBuilder::default()
            .verbose(self.settings.verbose)
            .max_iter(self.settings.max_iter)
            .time_limit(self.settings.time_limit.unwrap_or(f64::INFINITY))
            .tol_gap_abs(self.settings.tol_gap_abs)
            .tol_gap_rel(self.settings.tol_gap_rel)
            .tol_feas(self.settings.tol_feas)
            .build()
            .map_err(|e| MathError::backend(format!("failed to build settings: {}", e)))?;

        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings)
            .map_err(|e| MathError::backend(format!("failed to create solver: {:?}", e)))?;
        solver.solve();

        let status: SolveStatus = solver.solution.status.into();
        let iterations = solver.info.iterations;
        let solve_time = solver.solution.solve_time;
        debug!(
            model = model.name(),
            backend_status = ?solver.solution.status,
            %status,
            iterations,
            "clarabel solve finished"
        );

        if !status.has_solution() {
            return Ok(Solution {
                iterations,
                solve_time,
                ..Solution::without_point(status)
            });
        }

        let values = solver.solution.x.clone();
        let objective_value = objective.expr.evaluate(&values);
        Ok(Solution {
            status,
            values,
            objective_value: Some(objective_value),
            iterations,
            solve_time,
        })
    }
}

const INITIAL_TRUST_RADIUS: f64 = 1.0;
const MAX_TRUST_RADIUS: f64 = 1e3;
const MIN_TRUST_RADIUS: f64 = 1e-9;
/// Accept a step when the realized change is at least this share of the prediction.
const ACCEPT: f64 = 0.1;
const EXPAND: f64 = 0.75;
const SHRINK: f64 = 0.25;

/// Convex stand-in for the downside-risk constraint around a point.
struct Approximation<'a> {
    risk: &'a DownsideRiskConstraint,
    factor: &'a DMatrix<f64>,
    ratio: f64,
    /// `‖Fᵀ E(v)‖ * slope_v`, empty when the ratio is held fixed.
    slope: LinearExpr,
    /// Incumbent point and relative half-width of the box around it.
    trust_region: Option<(&'a [f64], f64)>,
}

impl<'a> Approximation<'a> {
    /// Ratio held at its value at `point`, no trust region.
    fn frozen(risk: &'a DownsideRiskConstraint, factor: &'a DMatrix<f64>, point: &[f64]) -> Self {
        Self {
            risk,
            factor,
            ratio: risk.ratio_at(point),
            slope: LinearExpr::new(),
            trust_region: None,
        }
    }

    /// First-order model of the whole left-hand side at `point`.
    fn linearized(
        risk: &'a DownsideRiskConstraint,
        factor: &'a DMatrix<f64>,
        point: &'a [f64],
        radius: f64,
    ) -> Self {
        Self {
            risk,
            factor,
            ratio: risk.ratio_at(point),
            slope: risk.ratio_slope_at(point).scaled(risk.volatility_at(point)),
            trust_region: Some((point, radius)),
        }
    }
}

/// Sets the bound variable to the exact left-hand side.
fn tightened(risk: &DownsideRiskConstraint, mut values: Vec<f64>) -> Vec<f64> {
    let lhs = risk.lhs_at(&values);
    if let Some(bound) = values.get_mut(risk.bound.index()) {
        *bound = lhs;
    }
    values
}

fn finish(
    status: SolveStatus,
    values: Vec<f64>,
    objective: &Objective,
    iterations: u32,
    solve_time: f64,
) -> Solution {
    Solution {
        status,
        objective_value: Some(objective.expr.evaluate(&values)),
        values,
        iterations,
        solve_time,
    }
}

impl Solver for ClarabelSolver {
    fn name(&self) -> &str {
        "clarabel"
    }

    fn solve(&mut self, model: &Model) -> MathResult<Solution> {
        model.validate()?;
        self.settings.validate()?;
        match model.downside_risk() {
            None => self.solve_conic(model, None),
            Some(risk) => self.solve_successive(model, risk),
        }
    }
}

/// Rows of `A` and entries of `b` for one cone block.
#[derive(Debug, Default)]
struct RowBlock {
    rows: Vec<Vec<(usize, f64)>>,
    b: Vec<f64>,
}

impl RowBlock {
    fn push(&mut self, row: Vec<(usize, f64)>, b: f64) {
        self.rows.push(row);
        self.b.push(b);
    }

    fn push_expr(&mut self, expr: &LinearExpr, sign: f64, b: f64) {
        let row = expr
            .terms()
            .iter()
            .map(|(var, coef)| (var.index(), sign * coef))
            .collect();
        self.push(row, b);
    }

    fn extend(&mut self, other: RowBlock) {
        self.rows.extend(other.rows);
        self.b.extend(other.b);
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Converts to compressed sparse columns, merging repeated entries.
    fn into_csc(self, n: usize) -> (CscMatrix<f64>, Vec<f64>) {
        let m = self.rows.len();
        let mut columns: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for (i, row) in self.rows.into_iter().enumerate() {
            for (j, value) in row {
                columns[j].push((i, value));
            }
        }

        let mut colptr = Vec::with_capacity(n + 1);
        let mut rowval = Vec::new();
        let mut nzval = Vec::new();
        colptr.push(0);
        for mut column in columns {
            column.sort_by_key(|&(i, _)| i);
            let mut merged: Vec<(usize, f64)> = Vec::with_capacity(column.len());
            for (i, value) in column {
                match merged.last_mut() {
                    Some((last, acc)) if *last == i => *acc += value,
                    _ => merged.push((i, value)),
                }
            }
            for (i, value) in merged {
                if value != 0.0 {
                    rowval.push(i);
                    nzval.push(value);
                }
            }
            colptr.push(rowval.len());
        }

        (CscMatrix::new(m, n, colptr, rowval, nzval), self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::super::expr::VarId;
    use super::*;
    use approx::assert_relative_eq;

    fn solver() -> ClarabelSolver {
        ClarabelSolver::default()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(SolveStatus::from(SolverStatus::Solved), SolveStatus::Optimal);
        assert_eq!(SolveStatus::from(SolverStatus::AlmostSolved), SolveStatus::Feasible);
        assert_eq!(
            SolveStatus::from(SolverStatus::PrimalInfeasible),
            SolveStatus::Infeasible
        );
        assert_eq!(SolveStatus::from(SolverStatus::MaxIterations), SolveStatus::Error);
        assert_eq!(SolveStatus::from(SolverStatus::MaxTime), SolveStatus::Error);
    }

    #[test]
    fn test_csc_merges_duplicates() {
        let mut block = RowBlock::default();
        block.push(vec![(1, 2.0), (1, 3.0), (0, 1.0)], 4.0);
        block.push(vec![(0, -1.0)], 0.0);
        let (a, b) = block.into_csc(2);
        assert_eq!(a.colptr, vec![0, 2, 3]);
        assert_eq!(a.rowval, vec![0, 1, 0]);
        assert_eq!(a.nzval, vec![1.0, -1.0, 5.0]);
        assert_eq!(b, vec![4.0, 0.0]);
    }

    #[test]
    fn test_linear_program() {
        // maximize 3x + 2y  s.t.  x + y <= 4, x + 3y <= 6, x <= 3
        let mut model = Model::new("lp");
        let x = model.add_variable("x", 0.0, 0.0);
        let y = model.add_variable("y", 0.0, 0.0);
        model.set_upper_bound(x, 3.0).unwrap();
        model.add_constraint(
            "c1",
            LinearExpr::from(x) + LinearExpr::from(y),
            ConstraintSense::LessEqual,
            4.0,
        );
        model.add_constraint(
            "c2",
            LinearExpr::from(x) + LinearExpr::term(y, 3.0),
            ConstraintSense::LessEqual,
            6.0,
        );
        model.set_objective(
            ObjectiveSense::Maximize,
            LinearExpr::term(x, 3.0).with_term(y, 2.0),
        );

        let solution = solver().solve(&model).unwrap();
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_relative_eq!(solution.value(x).unwrap(), 3.0, epsilon = 1e-6);
        assert_relative_eq!(solution.value(y).unwrap(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(solution.objective_value.unwrap(), 11.0, epsilon = 1e-6);
    }

    #[test]
    fn test_equality_and_greater_equal() {
        // minimize x  s.t.  x - y = 1, y >= 2
        let mut model = Model::new("eq");
        let x = model.add_variable("x", f64::NEG_INFINITY, 0.0);
        let y = model.add_variable("y", f64::NEG_INFINITY, 0.0);
        model.add_constraint(
            "link",
            LinearExpr::from(x) - LinearExpr::from(y),
            ConstraintSense::Equal,
            1.0,
        );
        model.add_constraint("floor", LinearExpr::from(y), ConstraintSense::GreaterEqual, 2.0);
        model.set_objective(ObjectiveSense::Minimize, LinearExpr::from(x));

        let solution = solver().solve(&model).unwrap();
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_relative_eq!(solution.value(x).unwrap(), 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_infeasible() {
        let mut model = Model::new("infeasible");
        let x = model.add_variable("x", 0.0, 0.0);
        model.add_constraint("low", LinearExpr::from(x), ConstraintSense::GreaterEqual, 2.0);
        model.add_constraint("high", LinearExpr::from(x), ConstraintSense::LessEqual, 1.0);
        model.set_objective(ObjectiveSense::Maximize, LinearExpr::from(x));

        let solution = solver().solve(&model).unwrap();
        assert_eq!(solution.status, SolveStatus::Infeasible);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_unbounded() {
        let mut model = Model::new("unbounded");
        let x = model.add_variable("x", 0.0, 0.0);
        model.set_objective(ObjectiveSense::Maximize, LinearExpr::from(x));

        let solution = solver().solve(&model).unwrap();
        assert_eq!(solution.status, SolveStatus::Unbounded);
    }

    #[test]
    fn test_downside_risk_fixed_exposures() {
        // E1 = E2 = 1, T = 2, profit = 0.05 (E1 + E2), Σ = 0.01 I, scale 1
        // D* = 0.1 * sqrt(0.02) / 2
        let mut model = Model::new("risk");
        let e1 = model.add_variable("e1", 0.0, 1.0);
        let e2 = model.add_variable("e2", 0.0, 1.0);
        let t = model.add_variable("t", 0.0, 2.0);
        let d = model.add_variable("d", 0.0, 0.0);
        model.add_constraint("e1", LinearExpr::from(e1), ConstraintSense::Equal, 1.0);
        model.add_constraint("e2", LinearExpr::from(e2), ConstraintSense::Equal, 1.0);
        model.add_constraint(
            "total",
            LinearExpr::from(e1) + LinearExpr::from(e2) - LinearExpr::from(t),
            ConstraintSense::Equal,
            0.0,
        );
        model
            .set_downside_risk(DownsideRiskConstraint {
                name: "downside".into(),
                scale: 1.0,
                profit: LinearExpr::term(e1, 0.05).with_term(e2, 0.05),
                total: LinearExpr::from(t),
                exposures: vec![e1, e2],
                covariance: DMatrix::from_diagonal_element(2, 2, 0.01),
                bound: d,
            })
            .unwrap();
        model.set_objective(ObjectiveSense::Minimize, LinearExpr::from(d));

        let solution = solver().solve(&model).unwrap();
        assert_eq!(solution.status, SolveStatus::Optimal);
        let expected = 0.1 * 0.02_f64.sqrt() / 2.0;
        assert_relative_eq!(solution.value(d).unwrap(), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_downside_risk_shifts_allocation() {
        // Two exposures summing to 2, the second twice as volatile.
        // Minimizing D moves weight towards the first.
        let mut model = Model::new("risk-shift");
        let e1 = model.add_variable("e1", 0.0, 1.0);
        let e2 = model.add_variable("e2", 0.0, 1.0);
        let t = model.add_variable("t", 0.0, 2.0);
        let d = model.add_variable("d", 0.0, 0.0);
        model.set_upper_bound(e1, 1.5).unwrap();
        model.set_upper_bound(e2, 1.5).unwrap();
        model.add_constraint(
            "total",
            LinearExpr::from(e1) + LinearExpr::from(e2) - LinearExpr::from(t),
            ConstraintSense::Equal,
            0.0,
        );
        model.add_constraint("size", LinearExpr::from(t), ConstraintSense::Equal, 2.0);
        model
            .set_downside_risk(DownsideRiskConstraint {
                name: "downside".into(),
                scale: 1.645,
                profit: LinearExpr::term(e1, 0.05).with_term(e2, 0.05),
                total: LinearExpr::from(t),
                exposures: vec![e1, e2],
                covariance: DMatrix::from_row_slice(2, 2, &[0.01, 0.0, 0.0, 0.04]),
                bound: d,
            })
            .unwrap();
        model.set_objective(ObjectiveSense::Minimize, LinearExpr::from(d));

        let solution = solver().solve(&model).unwrap();
        assert!(solution.status.has_solution());
        let v1 = solution.value(e1).unwrap();
        let v2 = solution.value(e2).unwrap();
        // Unconstrained minimum of 0.01 e1² + 0.04 e2² with e1 + e2 = 2 is e1 = 1.6,
        // clipped by the upper bound.
        assert_relative_eq!(v1, 1.5, epsilon = 1e-5);
        assert_relative_eq!(v2, 0.5, epsilon = 1e-5);
        let risk = model.downside_risk().unwrap();
        assert_relative_eq!(
            solution.value(d).unwrap(),
            risk.lhs_at(&solution.values),
            epsilon = 1e-6
        );
        assert!(model.max_violation(&solution.values) < 1e-6);
    }

    /// E1 pinned at 1000 carries all the profit; E2 is nearly riskless and
    /// free in [800, 1200], so growing it only dilutes the ratio.
    fn dilution_model() -> (Model, VarId, VarId) {
        let mut model = Model::new("dilution");
        let e1 = model.add_variable("e1", 0.0, 1000.0);
        let e2 = model.add_variable("e2", 800.0, 1000.0);
        let t = model.add_variable("t", 0.0, 2000.0);
        let d = model.add_variable("d", 0.0, 0.0);
        model.set_upper_bound(e2, 1200.0).unwrap();
        model.add_constraint("e1", LinearExpr::from(e1), ConstraintSense::Equal, 1000.0);
        model.add_constraint(
            "total",
            LinearExpr::from(e1) + LinearExpr::from(e2) - LinearExpr::from(t),
            ConstraintSense::Equal,
            0.0,
        );
        model
            .set_downside_risk(DownsideRiskConstraint {
                name: "downside".into(),
                scale: 1.645,
                profit: LinearExpr::term(e1, 0.05),
                total: LinearExpr::from(t),
                exposures: vec![e1, e2],
                covariance: DMatrix::from_row_slice(2, 2, &[0.01, 0.0, 0.0, 1e-8]),
                bound: d,
            })
            .unwrap();
        model.set_objective(ObjectiveSense::Minimize, LinearExpr::from(d));
        (model, e2, d)
    }

    #[test]
    fn test_downside_risk_matches_grid_minimum() {
        let (model, e2, d) = dilution_model();
        let risk = model.downside_risk().unwrap();
        let grid_min = (800..=1200)
            .map(|x| {
                let x = f64::from(x);
                risk.lhs_at(&[1000.0, x, 1000.0 + x, 0.0])
            })
            .fold(f64::INFINITY, f64::min);

        let solution = solver().solve(&model).unwrap();
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_relative_eq!(solution.value(e2).unwrap(), 1200.0, epsilon = 1e-3);

        let downside = solution.value(d).unwrap();
        let expected = 1.645 * 50.0 * (1e4 + 1e-8 * 1200.0 * 1200.0_f64).sqrt() / 2200.0;
        assert_relative_eq!(downside, expected, epsilon = 1e-5);
        assert!(downside <= grid_min + 1e-5);
        assert_relative_eq!(downside, risk.lhs_at(&solution.values), epsilon = 1e-12);
    }

    #[test]
    fn test_downside_risk_step_limit_reports_feasible() {
        let (model, _, d) = dilution_model();
        let settings = SolverSettings {
            max_outer_iterations: 1,
            ..SolverSettings::default()
        };
        let solution = ClarabelSolver::new(settings).solve(&model).unwrap();

        assert_eq!(solution.status, SolveStatus::Feasible);
        let risk = model.downside_risk().unwrap();
        assert_relative_eq!(
            solution.value(d).unwrap(),
            risk.lhs_at(&solution.values),
            epsilon = 1e-12
        );
        assert!(model.max_violation(&solution.values) < 1e-6);
    }
}
