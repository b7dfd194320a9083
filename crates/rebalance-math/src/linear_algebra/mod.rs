//! Linear algebra utilities.
//!
//! This module provides the matrix decompositions the conic backend needs.

use nalgebra::{DMatrix, SymmetricEigen};
use tracing::warn;

use crate::error::{MathError, MathResult};

/// Relative size below which a negative eigenvalue is treated as round-off.
const EIGEN_TOLERANCE: f64 = 1e-10;

/// Factors a symmetric positive semi-definite matrix as `F Fᵀ`.
///
/// Uses a symmetric eigen-decomposition `Σ = V Λ Vᵀ` and returns
/// `F = V Λ^½`, so that `xᵀ Σ x = ‖Fᵀ x‖²`. Negative eigenvalues are
/// clipped to zero; a warning is logged when one is larger than round-off.
pub fn psd_factor(matrix: &DMatrix<f64>) -> MathResult<DMatrix<f64>> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(MathError::invalid_input(
            "Matrix must be square for PSD factorization",
        ));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(MathError::invalid_input("Matrix has non-finite entries"));
    }
    if n == 0 {
        return Ok(DMatrix::zeros(0, 0));
    }

    let scale = matrix.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(1.0);
    let eigen = SymmetricEigen::new(matrix.clone());
    let mut factor = eigen.eigenvectors;

    for (k, &lambda) in eigen.eigenvalues.iter().enumerate() {
        if lambda < -EIGEN_TOLERANCE * scale {
            warn!(
                eigenvalue = lambda,
                "covariance is not positive semi-definite; clipping eigenvalue to zero"
            );
        }
        let root = lambda.max(0.0).sqrt();
        factor.column_mut(k).scale_mut(root);
    }

    Ok(factor)
}
