//! Linear and conic optimization models.
//!
//! A [`Model`] holds continuous variables, linear constraints, an optional
//! downside-risk constraint and a linear objective. Backends implement
//! [`Solver`]; [`ClarabelSolver`] is the bundled one.

mod clarabel;
mod expr;
mod model;
mod solver;

pub use clarabel::ClarabelSolver;
pub use expr::{LinearExpr, VarId};
pub use model::{
    ConstraintSense, DownsideRiskConstraint, LinearConstraint, Model, Objective, ObjectiveSense,
    Variable,
};
pub use solver::{Solution, SolveStatus, Solver, SolverSettings};
