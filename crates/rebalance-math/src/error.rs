//! Error types for mathematical operations.

use thiserror::Error;

/// A specialized Result type for mathematical operations.
pub type MathResult<T> = Result<T, MathError>;

/// Errors that can occur while building or solving a model.
///
/// A solve that runs to completion but ends infeasible, unbounded or at a
/// limit is not an error here; it is reported through
/// [`SolveStatus`](crate::optimization::SolveStatus).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    /// Matrix dimensions are incompatible.
    #[error("Incompatible matrix dimensions: ({rows1}x{cols1}) and ({rows2}x{cols2})")]
    DimensionMismatch {
        /// Rows in first matrix.
        rows1: usize,
        /// Columns in first matrix.
        cols1: usize,
        /// Rows in second matrix.
        rows2: usize,
        /// Columns in second matrix.
        cols2: usize,
    },

    /// A constraint or objective references a variable the model does not own.
    #[error("Unknown variable index {index} (model has {count} variables)")]
    UnknownVariable {
        /// The offending index.
        index: usize,
        /// Number of variables in the model.
        count: usize,
    },

    /// Invalid input parameter.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Description of the invalid input.
        reason: String,
    },

    /// The solver backend could not be set up.
    #[error("Solver backend error: {reason}")]
    Backend {
        /// Message from the backend.
        reason: String,
    },
}

impl MathError {
    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Creates a backend error.
    #[must_use]
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MathError::UnknownVariable { index: 7, count: 3 };
        assert!(err.to_string().contains("index 7"));

        let err = MathError::backend("settings rejected");
        assert!(err.to_string().contains("settings rejected"));
    }
}
