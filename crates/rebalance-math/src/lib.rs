//! # Rebalance Math
//!
//! Mathematical utilities for the Rebalance portfolio optimizer.
//!
//! This crate provides:
//!
//! - **Optimization**: A small modelling layer (variables, linear
//!   expressions, linear constraints, a downside-risk constraint, objectives)
//!   and the [`Solver`](optimization::Solver) capability behind which any
//!   backend can sit
//! - **Clarabel Backend**: Conic interior-point solving, with the
//!   downside-risk constraint handled by successive second-order-cone
//!   approximation
//! - **Linear Algebra**: Factorization of covariance matrices
//! - **Distributions**: Normal quantiles for confidence levels
//!
//! ## Design Philosophy
//!
//! - **Solver Agnostic**: Formulations build a [`Model`](optimization::Model)
//!   and never touch backend types
//! - **Numerical Stability**: Indefinite covariances are clipped to the
//!   nearest positive semi-definite factor

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::float_cmp)]
#![allow(clippy::uninlined_format_args)]

pub mod distributions;
pub mod error;
pub mod linear_algebra;
pub mod optimization;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::distributions::normal_quantile;
    pub use crate::error::{MathError, MathResult};
    pub use crate::linear_algebra::psd_factor;
    pub use crate::optimization::{
        ClarabelSolver, ConstraintSense, DownsideRiskConstraint, LinearConstraint, LinearExpr,
        Model, Objective, ObjectiveSense, Solution, SolveStatus, Solver, SolverSettings, VarId,
    };
}

pub use error::{MathError, MathResult};
