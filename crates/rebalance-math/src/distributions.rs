//! Probability distribution helpers.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{MathError, MathResult};

/// One-sided standard normal quantile.
///
/// `normal_quantile(0.95)` is the z-score of a 95% one-sided confidence
/// level (≈ 1.645).
pub fn normal_quantile(probability: f64) -> MathResult<f64> {
    if !(probability > 0.0 && probability < 1.0) {
        return Err(MathError::invalid_input(format!(
            "probability must lie in (0, 1), got {}",
            probability
        )));
    }
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| MathError::invalid_input(format!("standard normal: {}", e)))?;
    Ok(normal.inverse_cdf(probability))
}
