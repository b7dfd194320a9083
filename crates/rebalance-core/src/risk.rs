//! Closed-form portfolio variance.
//!
//! The variance used by the downside-risk constraint is a quadratic form over
//! per-asset exposures normalized by total exposure squared:
//!
//! ```text
//! variance = Σ_i Σ_j stdev_i * stdev_j * corr_ij * E_i * E_j / T²
//! ```

use nalgebra::{DMatrix, DVector};

use crate::error::{CoreError, CoreResult};

/// Builds the covariance matrix `stdev_i * stdev_j * corr_ij`.
pub fn covariance_from_correlation(
    stdevs: &[f64],
    correlation: &DMatrix<f64>,
) -> CoreResult<DMatrix<f64>> {
    let n = stdevs.len();
    if correlation.nrows() != n || correlation.ncols() != n {
        return Err(CoreError::DimensionMismatch {
            expected: n,
            actual: correlation.nrows(),
        });
    }
    Ok(DMatrix::from_fn(n, n, |i, j| {
        stdevs[i] * stdevs[j] * correlation[(i, j)]
    }))
}

/// Relative-exposure variance `Eᵀ Σ E / T²`.
///
/// Returns 0 when `total` is not positive.
pub fn relative_variance(
    covariance: &DMatrix<f64>,
    exposures: &[f64],
    total: f64,
) -> CoreResult<f64> {
    let n = exposures.len();
    if covariance.nrows() != n || covariance.ncols() != n {
        return Err(CoreError::DimensionMismatch {
            expected: n,
            actual: covariance.nrows(),
        });
    }
    if total <= 0.0 {
        return Ok(0.0);
    }
    let e = DVector::from_column_slice(exposures);
    let quadratic = e.dot(&(covariance * &e));
    Ok(quadratic / (total * total))
}
