//! Error types for the rebalancing pipeline.

use std::fmt;

use rebalance_core::CoreError;
use rebalance_math::optimization::SolveStatus;
use rebalance_math::MathError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A specialized Result type for rebalancing operations.
pub type RebalanceResult<T> = Result<T, RebalanceError>;

/// Solve phase in which a status was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// The only solve of a risk-ignored or weighted run.
    Single,
    /// First lexicographic phase: maximize net profit.
    Profit,
    /// Second lexicographic phase: minimize downside risk.
    Risk,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Single => "single",
            Phase::Profit => "profit",
            Phase::Risk => "risk",
        };
        f.write_str(s)
    }
}

/// Errors that end a rebalancing run.
///
/// Every variant is terminal: no partial allocation is produced.
#[derive(Error, Debug)]
pub enum RebalanceError {
    /// Input or allocation failed domain validation.
    #[error("Validation error: {0}")]
    Validation(#[from] CoreError),

    /// The solver finished without a usable allocation.
    #[error("Solver finished with status '{status}' in the {phase} phase")]
    SolverStatus {
        /// Phase that failed.
        phase: Phase,
        /// Status reported by the solver.
        status: SolveStatus,
    },

    /// A configuration value is out of range.
    #[error("Invalid configuration for '{field}': {reason}")]
    Configuration {
        /// Offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The solver rejected the model.
    #[error("Solver error: {0}")]
    Solver(#[from] MathError),

    /// Reading or writing a table failed.
    #[error("Table error: {0}")]
    Table(String),
}

impl RebalanceError {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a table error.
    #[must_use]
    pub fn table(message: impl Into<String>) -> Self {
        Self::Table(message.into())
    }

    /// Creates a solver status error.
    #[must_use]
    pub fn solver_status(phase: Phase, status: SolveStatus) -> Self {
        Self::SolverStatus { phase, status }
    }
}

impl From<csv::Error> for RebalanceError {
    fn from(err: csv::Error) -> Self {
        Self::Table(err.to_string())
    }
}

impl From<std::io::Error> for RebalanceError {
    fn from(err: std::io::Error) -> Self {
        Self::Table(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = RebalanceError::solver_status(Phase::Profit, SolveStatus::Infeasible);
        assert_eq!(
            err.to_string(),
            "Solver finished with status 'infeasible' in the profit phase"
        );
    }

    #[test]
    fn test_validation_from_core() {
        let err: RebalanceError = CoreError::unknown_asset("S1", "A9").into();
        assert!(matches!(err, RebalanceError::Validation(_)));
        assert!(err.to_string().contains("A9"));
    }

    #[test]
    fn test_configuration_display() {
        let err = RebalanceError::configuration("profit_weight", "must be <= 1");
        assert!(err.to_string().contains("profit_weight"));
    }
}
