//! Run configuration.

use std::fs;
use std::path::Path;

use rebalance_math::distributions::normal_quantile;
use rebalance_math::optimization::SolverSettings;
use serde::{Deserialize, Serialize};

use crate::error::{RebalanceError, RebalanceResult};
use crate::strategy::Mode;

/// Relative tolerance on the net profit optimum kept in the risk phase of a
/// lexicographic run.
pub const LEXICOGRAPHIC_REL_TOL: f64 = 0.1;

/// Parameters of a rebalancing run.
///
/// Every field has a default, so a TOML file only needs the values it
/// overrides:
///
/// ```toml
/// risk_weight_limit = 0.35
/// profit_weight = 0.8
///
/// [solver]
/// max_iter = 500
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceConfig {
    /// Ceiling on the portfolio's exposure-weighted average risk weight.
    pub risk_weight_limit: f64,
    /// One-sided confidence level of the downside-risk z-score.
    pub confidence_interval: f64,
    /// Whether the downside-risk constraint and objective take part.
    pub consider_risk: bool,
    /// Weight of net profit against downside risk; negative selects the
    /// lexicographic strategy.
    pub profit_weight: f64,
    /// Settings passed to the solver backend.
    pub solver: SolverSettings,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            risk_weight_limit: 0.5,
            confidence_interval: 0.95,
            consider_risk: true,
            profit_weight: -1.0,
            solver: SolverSettings::default(),
        }
    }
}

impl RebalanceConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> RebalanceResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| RebalanceError::configuration("toml", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> RebalanceResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RebalanceError::configuration("file", format!("{}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml_string(&self) -> RebalanceResult<String> {
        toml::to_string_pretty(self).map_err(|e| RebalanceError::configuration("toml", e.to_string()))
    }

    /// Sets the risk-weight ceiling.
    #[must_use]
    pub fn with_risk_weight_limit(mut self, limit: f64) -> Self {
        self.risk_weight_limit = limit;
        self
    }

    /// Sets the confidence level.
    #[must_use]
    pub fn with_confidence_interval(mut self, confidence: f64) -> Self {
        self.confidence_interval = confidence;
        self
    }

    /// Enables or disables the downside-risk terms.
    #[must_use]
    pub fn with_consider_risk(mut self, consider_risk: bool) -> Self {
        self.consider_risk = consider_risk;
        self
    }

    /// Sets the profit weight.
    #[must_use]
    pub fn with_profit_weight(mut self, weight: f64) -> Self {
        self.profit_weight = weight;
        self
    }

    /// Replaces the solver settings.
    #[must_use]
    pub fn with_solver(mut self, solver: SolverSettings) -> Self {
        self.solver = solver;
        self
    }

    /// Checks every field's range.
    pub fn validate(&self) -> RebalanceResult<()> {
        if !(self.risk_weight_limit.is_finite() && self.risk_weight_limit >= 0.0) {
            return Err(RebalanceError::configuration(
                "risk_weight_limit",
                format!("must be finite and >= 0, got {}", self.risk_weight_limit),
            ));
        }
        if !(self.confidence_interval > 0.0 && self.confidence_interval < 1.0) {
            return Err(RebalanceError::configuration(
                "confidence_interval",
                format!("must lie in (0, 1), got {}", self.confidence_interval),
            ));
        }
        if !self.profit_weight.is_finite() || self.profit_weight > 1.0 {
            return Err(RebalanceError::configuration(
                "profit_weight",
                format!("must be finite and <= 1, got {}", self.profit_weight),
            ));
        }
        self.solver
            .validate()
            .map_err(|e| RebalanceError::configuration("solver", e.to_string()))
    }

    /// One-sided z-score of the confidence level.
    pub fn z_score(&self) -> RebalanceResult<f64> {
        normal_quantile(self.confidence_interval)
            .map_err(|e| RebalanceError::configuration("confidence_interval", e.to_string()))
    }

    /// Strategy selected by `consider_risk` and `profit_weight`.
    pub fn mode(&self) -> Mode {
        if !self.consider_risk {
            Mode::RiskIgnored
        } else if self.profit_weight >= 0.0 {
            Mode::Weighted {
                profit_weight: self.profit_weight,
            }
        } else {
            Mode::Lexicographic
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = RebalanceConfig::default();
        assert_eq!(config.risk_weight_limit, 0.5);
        assert_eq!(config.confidence_interval, 0.95);
        assert!(config.consider_risk);
        assert_eq!(config.mode(), Mode::Lexicographic);
        assert!(config.validate().is_ok());
        assert_relative_eq!(config.z_score().unwrap(), 1.644_853_6, epsilon = 1e-6);
    }

    #[test]
    fn test_mode_selection() {
        let config = RebalanceConfig::default().with_consider_risk(false);
        assert_eq!(config.mode(), Mode::RiskIgnored);

        let config = RebalanceConfig::default().with_profit_weight(0.0);
        assert_eq!(config.mode(), Mode::Weighted { profit_weight: 0.0 });

        let config = RebalanceConfig::default().with_profit_weight(0.7);
        assert_eq!(config.mode(), Mode::Weighted { profit_weight: 0.7 });
    }

    #[test]
    fn test_validation() {
        let bad = [
            RebalanceConfig::default().with_risk_weight_limit(-0.1),
            RebalanceConfig::default().with_risk_weight_limit(f64::NAN),
            RebalanceConfig::default().with_confidence_interval(1.0),
            RebalanceConfig::default().with_confidence_interval(0.0),
            RebalanceConfig::default().with_profit_weight(1.5),
            RebalanceConfig::default().with_solver(SolverSettings::default().with_max_iter(0)),
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(RebalanceError::Configuration { .. })),
                "{:?} should be rejected",
                config
            );
        }
    }

    #[test]
    fn test_from_toml() {
        let config = RebalanceConfig::from_toml_str(
            r#"
            risk_weight_limit = 0.35
            consider_risk = false

            [solver]
            max_iter = 500
            time_limit = 30.0
            "#,
        )
        .unwrap();
        assert_eq!(config.risk_weight_limit, 0.35);
        assert!(!config.consider_risk);
        assert_eq!(config.confidence_interval, 0.95);
        assert_eq!(config.solver.max_iter, 500);
        assert_eq!(config.solver.time_limit, Some(30.0));
        assert_eq!(config.solver.tol_feas, 1e-8);
    }

    #[test]
    fn test_from_toml_rejects_out_of_range() {
        let err = RebalanceConfig::from_toml_str("profit_weight = 2.0").unwrap_err();
        assert!(matches!(err, RebalanceError::Configuration { ref field, .. } if field == "profit_weight"));
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let text = RebalanceConfig::default().to_toml_string().unwrap();
        assert!(text.contains("risk_weight_limit"));
        assert!(!text.contains("time_limit"));
        assert_eq!(
            RebalanceConfig::from_toml_str(&text).unwrap(),
            RebalanceConfig::default()
        );
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rebalance.toml");
        fs::write(&path, "confidence_interval = 0.99\n").unwrap();
        let config = RebalanceConfig::from_file(&path).unwrap();
        assert_eq!(config.confidence_interval, 0.99);

        assert!(RebalanceConfig::from_file(dir.path().join("missing.toml")).is_err());
    }
}
