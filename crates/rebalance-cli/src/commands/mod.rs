//! CLI command implementations.

pub mod config;
pub mod inspect;
pub mod run;

pub use config::ConfigArgs;
pub use inspect::InspectArgs;
pub use run::RunArgs;

use std::fs::File;
use std::path::{Path, PathBuf};

use clap::Args;
use rebalance_core::Portfolio;
use rebalance_optimizer::prelude::*;
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Input tables shared by every command that builds a portfolio.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Segment table (CSV)
    #[arg(long, value_name = "FILE")]
    pub segments: PathBuf,

    /// Asset table (CSV)
    #[arg(long, value_name = "FILE")]
    pub assets: PathBuf,

    /// Asset correlation matrix (CSV)
    #[arg(long, value_name = "FILE")]
    pub correlation: PathBuf,
}

impl InputArgs {
    /// Reads the three tables and builds the original portfolio.
    pub fn load_portfolio(&self) -> anyhow::Result<Portfolio> {
        let segments = read_segments(open(&self.segments)?)?;
        let assets = read_assets(open(&self.assets)?)?;
        let correlation = read_correlation(open(&self.correlation)?)?;
        debug!(
            segments = segments.len(),
            assets = assets.len(),
            correlated = correlation.len(),
            "input tables read"
        );
        Ok(from_tables(&segments, &assets, Some(correlation))?)
    }
}

/// Opens an input file.
pub fn open(path: &Path) -> CliResult<File> {
    File::open(path).map_err(|source| CliError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Validates a confidence level.
pub fn validate_confidence(confidence: f64) -> CliResult<f64> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(CliError::InvalidArgument {
            name: "--confidence-interval",
            reason: format!("{} is not in (0, 1)", confidence),
        });
    }
    Ok(confidence)
}

/// Validates a profit weight.
pub fn validate_profit_weight(weight: f64) -> CliResult<f64> {
    if !weight.is_finite() || weight > 1.0 {
        return Err(CliError::InvalidArgument {
            name: "--profit-weight",
            reason: format!("{} is not finite and at most 1", weight),
        });
    }
    Ok(weight)
}

/// Validates a risk-weight ceiling.
pub fn validate_risk_weight_limit(limit: f64) -> CliResult<f64> {
    if !limit.is_finite() || limit < 0.0 {
        return Err(CliError::InvalidArgument {
            name: "--risk-weight-limit",
            reason: format!("{} is not finite and non-negative", limit),
        });
    }
    Ok(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_confidence() {
        assert!(validate_confidence(0.95).is_ok());
        assert!(validate_confidence(0.0).is_err());
        assert!(validate_confidence(1.0).is_err());
        assert!(validate_confidence(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_profit_weight() {
        assert!(validate_profit_weight(-1.0).is_ok());
        assert!(validate_profit_weight(1.0).is_ok());
        assert!(validate_profit_weight(1.5).is_err());
        assert!(validate_profit_weight(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_risk_weight_limit() {
        assert!(validate_risk_weight_limit(0.0).is_ok());
        assert!(validate_risk_weight_limit(-0.1).is_err());
    }

    #[test]
    fn test_open_missing_file() {
        let err = open(Path::new("/nonexistent/segments.csv")).unwrap_err();
        assert!(err.to_string().contains("segments.csv"));
    }
}
