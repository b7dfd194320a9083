//! Optimization model container.

use nalgebra::DMatrix;

use super::expr::{LinearExpr, VarId};
use crate::error::{MathError, MathResult};

/// A continuous decision variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Display name.
    pub name: String,
    /// Lower bound (may be `f64::NEG_INFINITY`).
    pub lower: f64,
    /// Optional upper bound.
    pub upper: Option<f64>,
    /// Starting value, used as the first linearization point.
    pub start: f64,
}

/// Relation between a constraint expression and its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSense {
    /// `expr <= rhs`
    LessEqual,
    /// `expr == rhs`
    Equal,
    /// `expr >= rhs`
    GreaterEqual,
}

/// A linear constraint `expr (<=|==|>=) rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    /// Display name.
    pub name: String,
    /// Left-hand side.
    pub expr: LinearExpr,
    /// Relation.
    pub sense: ConstraintSense,
    /// Right-hand side.
    pub rhs: f64,
}

impl LinearConstraint {
    /// Amount by which `values` violates the constraint (0 when satisfied).
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.expr.evaluate(values);
        match self.sense {
            ConstraintSense::LessEqual => (lhs - self.rhs).max(0.0),
            ConstraintSense::GreaterEqual => (self.rhs - lhs).max(0.0),
            ConstraintSense::Equal => (lhs - self.rhs).abs(),
        }
    }
}

/// Direction of optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    /// Minimize the objective.
    Minimize,
    /// Maximize the objective.
    Maximize,
}

/// A linear objective.
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Direction.
    pub sense: ObjectiveSense,
    /// Objective expression.
    pub expr: LinearExpr,
}

/// Downside-risk constraint
///
/// ```text
/// scale * profit(x) * sqrt(Eᵀ Σ E) / total(x) <= bound
/// ```
///
/// `E` are the exposure variables in covariance order. This is the one
/// nonlinear constraint a model may carry.
#[derive(Debug, Clone, PartialEq)]
pub struct DownsideRiskConstraint {
    /// Display name.
    pub name: String,
    /// Multiplier on the left-hand side (a z-score).
    pub scale: f64,
    /// Profit expression multiplying the volatility.
    pub profit: LinearExpr,
    /// Total exposure expression normalizing the volatility.
    pub total: LinearExpr,
    /// Exposure variables, one per covariance row.
    pub exposures: Vec<VarId>,
    /// Covariance matrix over `exposures`.
    pub covariance: DMatrix<f64>,
    /// Variable bounding the left-hand side from above.
    pub bound: VarId,
}

impl DownsideRiskConstraint {
    /// `scale * max(profit, 0) / total` at a point, 0 when total is not positive.
    ///
    /// This is the factor in front of `sqrt(Eᵀ Σ E)`. Non-positive profit
    /// makes the left-hand side non-positive, so the constraint reduces to
    /// `bound >= 0`.
    pub fn ratio_at(&self, values: &[f64]) -> f64 {
        let total = self.total.evaluate(values);
        if total <= f64::EPSILON {
            return 0.0;
        }
        self.scale * self.profit.evaluate(values).max(0.0) / total
    }

    /// First-order change of [`ratio_at`](Self::ratio_at) around `point`.
    ///
    /// The expression is zero at `point`. It is empty where the ratio is
    /// locally constant: non-positive profit or non-positive total.
    pub fn ratio_slope_at(&self, point: &[f64]) -> LinearExpr {
        let total = self.total.evaluate(point);
        let profit = self.profit.evaluate(point);
        if total <= f64::EPSILON || profit <= 0.0 {
            return LinearExpr::new();
        }
        let d_profit = self.scale / total;
        let d_total = -self.scale * profit / (total * total);
        self.profit.scaled(d_profit) + self.total.scaled(d_total)
    }

    /// `sqrt(Eᵀ Σ E)` at a point.
    pub fn volatility_at(&self, values: &[f64]) -> f64 {
        let e: Vec<f64> = self
            .exposures
            .iter()
            .map(|v| values.get(v.index()).copied().unwrap_or(0.0))
            .collect();
        let e = nalgebra::DVector::from_vec(e);
        e.dot(&(&self.covariance * &e)).max(0.0).sqrt()
    }

    /// Left-hand side evaluated exactly at a point.
    pub fn lhs_at(&self, values: &[f64]) -> f64 {
        self.ratio_at(values) * self.volatility_at(values)
    }
}

/// An optimization model: variables, linear constraints, at most one
/// downside-risk constraint and a linear objective.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    name: String,
    variables: Vec<Variable>,
    constraints: Vec<LinearConstraint>,
    downside_risk: Option<DownsideRiskConstraint>,
    objective: Option<Objective>,
}

impl Model {
    /// Creates an empty model.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            constraints: Vec::new(),
            downside_risk: None,
            objective: None,
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a variable with a lower bound and a starting value.
    pub fn add_variable(&mut self, name: impl Into<String>, lower: f64, start: f64) -> VarId {
        self.variables.push(Variable {
            name: name.into(),
            lower,
            upper: None,
            start,
        });
        VarId(self.variables.len() - 1)
    }

    /// Sets an upper bound on an existing variable.
    pub fn set_upper_bound(&mut self, var: VarId, upper: f64) -> MathResult<()> {
        let count = self.variables.len();
        let variable = self
            .variables
            .get_mut(var.0)
            .ok_or(MathError::UnknownVariable {
                index: var.0,
                count,
            })?;
        variable.upper = Some(upper);
        Ok(())
    }

    /// Removes the upper bound of an existing variable.
    pub fn clear_upper_bound(&mut self, var: VarId) -> MathResult<()> {
        let count = self.variables.len();
        let variable = self
            .variables
            .get_mut(var.0)
            .ok_or(MathError::UnknownVariable {
                index: var.0,
                count,
            })?;
        variable.upper = None;
        Ok(())
    }

    /// Adds a linear constraint and returns its index.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        sense: ConstraintSense,
        rhs: f64,
    ) -> usize {
        self.constraints.push(LinearConstraint {
            name: name.into(),
            expr,
            sense,
            rhs,
        });
        self.constraints.len() - 1
    }

    /// Installs the downside-risk constraint, replacing any existing one.
    pub fn set_downside_risk(&mut self, constraint: DownsideRiskConstraint) -> MathResult<()> {
        let n = constraint.exposures.len();
        if constraint.covariance.nrows() != n || constraint.covariance.ncols() != n {
            return Err(MathError::DimensionMismatch {
                rows1: constraint.covariance.nrows(),
                cols1: constraint.covariance.ncols(),
                rows2: n,
                cols2: 1,
            });
        }
        if !constraint.scale.is_finite() || constraint.scale < 0.0 {
            return Err(MathError::invalid_input(format!(
                "downside-risk scale must be finite and non-negative, got {}",
                constraint.scale
            )));
        }
        self.downside_risk = Some(constraint);
        Ok(())
    }

    /// Sets the objective.
    pub fn set_objective(&mut self, sense: ObjectiveSense, expr: LinearExpr) {
        self.objective = Some(Objective { sense, expr });
    }

    /// Variables in column order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Number of variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Linear constraints in insertion order.
    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    /// The downside-risk constraint, if installed.
    pub fn downside_risk(&self) -> Option<&DownsideRiskConstraint> {
        self.downside_risk.as_ref()
    }

    /// The objective, if set.
    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    /// Starting values of every variable.
    pub fn start_point(&self) -> Vec<f64> {
        self.variables.iter().map(|v| v.start).collect()
    }

    /// Largest constraint violation at a point, including variable bounds.
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        let bounds = self.variables.iter().zip(values).map(|(var, &x)| {
            let below = (var.lower - x).max(0.0);
            let above = var.upper.map_or(0.0, |u| (x - u).max(0.0));
            below.max(above)
        });
        let rows = self.constraints.iter().map(|c| c.violation(values));
        bounds.chain(rows).fold(0.0, f64::max)
    }

    /// Checks that every referenced variable exists, coefficients are finite
    /// and an objective is set.
    pub fn validate(&self) -> MathResult<()> {
        let count = self.variables.len();
        let check_var = |var: VarId| {
            if var.0 < count {
                Ok(())
            } else {
                Err(MathError::UnknownVariable {
                    index: var.0,
                    count,
                })
            }
        };
        let check_expr = |expr: &LinearExpr, what: &str| -> MathResult<()> {
            for &(var, coef) in expr.terms() {
                check_var(var)?;
                if !coef.is_finite() {
                    return Err(MathError::invalid_input(format!(
                        "non-finite coefficient in {}",
                        what
                    )));
                }
            }
            if expr.constant_value().is_finite() {
                Ok(())
            } else {
                Err(MathError::invalid_input(format!(
                    "non-finite constant in {}",
                    what
                )))
            }
        };

        for variable in &self.variables {
            if variable.lower.is_nan() || variable.upper.is_some_and(|u| u.is_nan() || u < variable.lower) {
                return Err(MathError::invalid_input(format!(
                    "invalid bounds on variable '{}'",
                    variable.name
                )));
            }
        }
        for constraint in &self.constraints {
            check_expr(&constraint.expr, &constraint.name)?;
            if !constraint.rhs.is_finite() {
                return Err(MathError::invalid_input(format!(
                    "non-finite right-hand side in {}",
                    constraint.name
                )));
            }
        }
        if let Some(risk) = &self.downside_risk {
            check_expr(&risk.profit, &risk.name)?;
            check_expr(&risk.total, &risk.name)?;
            check_var(risk.bound)?;
            for &var in &risk.exposures {
                check_var(var)?;
            }
        }
        let objective = self
            .objective
            .as_ref()
            .ok_or_else(|| MathError::invalid_input("model has no objective"))?;
        check_expr(&objective.expr, "objective")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_model() {
        let mut model = Model::new("test");
        let x = model.add_variable("x", 0.0, 1.0);
        let y = model.add_variable("y", 0.0, 0.0);
        model.set_upper_bound(y, 5.0).unwrap();
        model.set_upper_bound(x, 0.5).unwrap();
        model.clear_upper_bound(x).unwrap();
        model.add_constraint(
            "sum",
            LinearExpr::from(x) + LinearExpr::from(y),
            ConstraintSense::LessEqual,
            3.0,
        );
        model.set_objective(ObjectiveSense::Maximize, LinearExpr::from(x));

        assert_eq!(model.variable_count(), 2);
        assert_eq!(model.start_point(), vec![1.0, 0.0]);
        assert!(model.validate().is_ok());
        assert_eq!(model.max_violation(&[1.0, 1.0]), 0.0);
        assert_eq!(model.max_violation(&[2.0, 2.0]), 1.0);
        assert_eq!(model.max_violation(&[0.0, 6.0]), 3.0);
    }

    #[test]
    fn test_validate_requires_objective() {
        let mut model = Model::new("test");
        model.add_variable("x", 0.0, 0.0);
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_variable() {
        let mut model = Model::new("test");
        model.add_variable("x", 0.0, 0.0);
        model.set_objective(ObjectiveSense::Minimize, LinearExpr::term(VarId(3), 1.0));
        assert_eq!(
            model.validate().unwrap_err(),
            MathError::UnknownVariable { index: 3, count: 1 }
        );
    }

    #[test]
    fn test_downside_dimension_check() {
        let mut model = Model::new("test");
        let e = model.add_variable("e", 0.0, 1.0);
        let d = model.add_variable("d", 0.0, 0.0);
        let err = model
            .set_downside_risk(DownsideRiskConstraint {
                name: "risk".into(),
                scale: 1.0,
                profit: LinearExpr::from(e),
                total: LinearExpr::from(e),
                exposures: vec![e],
                covariance: DMatrix::identity(2, 2),
                bound: d,
            })
            .unwrap_err();
        assert!(matches!(err, MathError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_downside_lhs() {
        let risk = DownsideRiskConstraint {
            name: "risk".into(),
            scale: 2.0,
            profit: LinearExpr::term(VarId(0), 0.1) + LinearExpr::term(VarId(1), 0.1),
            total: LinearExpr::from(VarId(0)) + LinearExpr::from(VarId(1)),
            exposures: vec![VarId(0), VarId(1)],
            covariance: DMatrix::from_diagonal_element(2, 2, 0.04),
            bound: VarId(2),
        };
        let values = [3.0, 4.0, 0.0];
        // ratio = 2 * 0.7 / 7 = 0.2; sqrt(0.04 * 25) = 1
        assert!((risk.ratio_at(&values) - 0.2).abs() < 1e-12);
        assert!((risk.lhs_at(&values) - 0.2).abs() < 1e-12);
        assert!((risk.volatility_at(&values) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ratio_slope_matches_finite_difference() {
        // profit on the first exposure only, so the ratio moves with the mix
        let risk = DownsideRiskConstraint {
            name: "risk".into(),
            scale: 1.5,
            profit: LinearExpr::term(VarId(0), 0.05) + LinearExpr::constant(2.0),
            total: LinearExpr::from(VarId(0)) + LinearExpr::from(VarId(1)),
            exposures: vec![VarId(0), VarId(1)],
            covariance: DMatrix::identity(2, 2),
            bound: VarId(2),
        };
        let point = [600.0, 900.0, 0.0];
        let slope = risk.ratio_slope_at(&point);
        assert!(slope.evaluate(&point).abs() < 1e-15);

        let h = 1e-3;
        for j in 0..2 {
            let mut moved = point;
            moved[j] += h;
            let numeric = (risk.ratio_at(&moved) - risk.ratio_at(&point)) / h;
            assert!((slope.evaluate(&moved) / h - numeric).abs() < 1e-8);
        }
    }

    #[test]
    fn test_ratio_slope_empty_without_profit() {
        let risk = DownsideRiskConstraint {
            name: "risk".into(),
            scale: 1.0,
            profit: LinearExpr::term(VarId(0), -0.05),
            total: LinearExpr::from(VarId(0)),
            exposures: vec![VarId(0)],
            covariance: DMatrix::identity(1, 1),
            bound: VarId(1),
        };
        assert!(risk.ratio_slope_at(&[100.0, 0.0]).terms().is_empty());
    }
}
