//! Portfolio struct and aggregates.

use std::collections::BTreeMap;

use nalgebra::DMatrix;

use super::asset::average;
use crate::error::{CoreError, CoreResult};
use crate::risk::covariance_from_correlation;
use crate::types::{Asset, CorrelationMatrix, Segment};

/// A set of assets plus the correlation matrix between them.
///
/// Aggregates are computed once in [`Portfolio::new`]; a portfolio is a
/// read-only snapshot afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    id: String,
    assets: BTreeMap<String, Asset>,
    correlation: Option<CorrelationMatrix>,
    total_exposure: f64,
    total_profit: f64,
    total_risk_weighted: f64,
    average_risk_weight: f64,
}

impl Portfolio {
    /// Creates a portfolio from fully populated assets.
    pub fn new(id: impl Into<String>, assets: impl IntoIterator<Item = Asset>) -> CoreResult<Self> {
        let mut by_id = BTreeMap::new();
        for asset in assets {
            let asset_id = asset.id().to_string();
            if by_id.insert(asset_id.clone(), asset).is_some() {
                return Err(CoreError::DuplicateAsset { asset: asset_id });
            }
        }

        let total_exposure: f64 = by_id.values().map(Asset::total_exposure).sum();
        let total_profit: f64 = by_id.values().map(Asset::total_profit).sum();
        let total_risk_weighted: f64 = by_id.values().map(Asset::total_risk_weighted).sum();

        Ok(Self {
            id: id.into(),
            assets: by_id,
            correlation: None,
            total_exposure,
            total_profit,
            total_risk_weighted,
            average_risk_weight: average(total_risk_weighted, total_exposure),
        })
    }

    /// Attaches a correlation matrix.
    ///
    /// Every portfolio asset must have a row and column; extra rows for
    /// assets outside the portfolio are allowed.
    pub fn with_correlation(mut self, correlation: CorrelationMatrix) -> CoreResult<Self> {
        if let Some(missing) = self.assets.keys().find(|id| !correlation.contains(id)) {
            return Err(CoreError::MissingCorrelation {
                asset: missing.clone(),
            });
        }
        self.correlation = Some(correlation);
        Ok(self)
    }

    /// Portfolio identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Assets ordered by identifier.
    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    /// Looks up an asset.
    pub fn asset(&self, asset_id: &str) -> Option<&Asset> {
        self.assets.get(asset_id)
    }

    /// Asset identifiers in iteration order.
    pub fn asset_ids(&self) -> Vec<&str> {
        self.assets.keys().map(String::as_str).collect()
    }

    /// Number of assets.
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Every (asset, segment) pair in iteration order.
    pub fn segments(&self) -> impl Iterator<Item = (&Asset, &Segment)> {
        self.assets
            .values()
            .flat_map(|asset| asset.segments().map(move |segment| (asset, segment)))
    }

    /// Total number of segments.
    pub fn segment_count(&self) -> usize {
        self.assets.values().map(Asset::segment_count).sum()
    }

    /// Attached correlation matrix, if any.
    pub fn correlation(&self) -> Option<&CorrelationMatrix> {
        self.correlation.as_ref()
    }

    /// Total exposure across assets.
    pub fn total_exposure(&self) -> f64 {
        self.total_exposure
    }

    /// Total expected profit.
    pub fn total_profit(&self) -> f64 {
        self.total_profit
    }

    /// Total risk-weighted exposure.
    pub fn total_risk_weighted(&self) -> f64 {
        self.total_risk_weighted
    }

    /// Exposure-weighted average risk weight (0 for an empty portfolio).
    pub fn average_risk_weight(&self) -> f64 {
        self.average_risk_weight
    }

    /// Each asset's share of total exposure, in asset order.
    pub fn exposure_shares(&self) -> Vec<f64> {
        self.assets
            .values()
            .map(|asset| average(asset.total_exposure(), self.total_exposure))
            .collect()
    }

    /// Profit standard deviations in asset order.
    pub fn profit_stdevs(&self) -> Vec<f64> {
        self.assets.values().map(Asset::profit_stdev).collect()
    }

    /// Covariance of profitability in asset order:
    /// `stdev[i] * stdev[j] * corr[i, j]`.
    pub fn covariance_matrix(&self) -> CoreResult<DMatrix<f64>> {
        let correlation = self.correlation.as_ref().ok_or_else(|| {
            CoreError::invalid_correlation(format!(
                "portfolio '{}' has no correlation matrix",
                self.id
            ))
        })?;
        let ids = self.asset_ids();
        let restricted = correlation.restricted_to(&ids)?;
        covariance_from_correlation(&self.profit_stdevs(), &restricted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn asset(id: &str, exposure: f64, risk_weight: f64, stdev: f64) -> Asset {
        let mut asset = Asset::new(id).with_profit_stdev(stdev).unwrap();
        asset
            .add_segment(Segment::new(format!("{id}-S1"), id, exposure, 0.05, risk_weight).unwrap())
            .unwrap();
        asset
    }

    #[test]
    fn test_aggregates() {
        let portfolio =
            Portfolio::new("P", [asset("A1", 1000.0, 0.3, 0.1), asset("A2", 3000.0, 0.5, 0.2)])
                .unwrap();
        assert_relative_eq!(portfolio.total_exposure(), 4000.0);
        assert_relative_eq!(portfolio.total_profit(), 200.0);
        assert_relative_eq!(portfolio.average_risk_weight(), 1800.0 / 4000.0);
        assert_eq!(portfolio.segment_count(), 2);
        assert_eq!(portfolio.asset_ids(), vec!["A1", "A2"]);
        assert_eq!(portfolio.exposure_shares(), vec![0.25, 0.75]);
    }

    #[test]
    fn test_empty_portfolio() {
        let portfolio = Portfolio::new("P", Vec::new()).unwrap();
        assert_eq!(portfolio.average_risk_weight(), 0.0);
        assert!(portfolio.exposure_shares().is_empty());
    }

    #[test]
    fn test_duplicate_asset() {
        let err = Portfolio::new("P", [asset("A1", 1.0, 0.3, 0.1), asset("A1", 2.0, 0.3, 0.1)])
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateAsset { .. }));
    }

    #[test]
    fn test_correlation_coverage() {
        let portfolio =
            Portfolio::new("P", [asset("A1", 1.0, 0.3, 0.1), asset("A2", 2.0, 0.3, 0.1)]).unwrap();
        let partial = CorrelationMatrix::identity(vec!["A1".to_string()]);
        let err = portfolio.clone().with_correlation(partial).unwrap_err();
        assert_eq!(
            err,
            CoreError::MissingCorrelation {
                asset: "A2".to_string()
            }
        );

        let wider = CorrelationMatrix::identity(vec!["A2".into(), "A1".into(), "A3".into()]);
        assert!(portfolio.with_correlation(wider).is_ok());
    }

    #[test]
    fn test_covariance_matrix() {
        let corr = CorrelationMatrix::from_rows(
            vec!["A2".into(), "A1".into()],
            &[vec![1.0, 0.5], vec![0.5, 1.0]],
        )
        .unwrap();
        let portfolio =
            Portfolio::new("P", [asset("A1", 1.0, 0.3, 0.1), asset("A2", 2.0, 0.3, 0.2)])
                .unwrap()
                .with_correlation(corr)
                .unwrap();
        let cov = portfolio.covariance_matrix().unwrap();
        assert_relative_eq!(cov[(0, 0)], 0.01);
        assert_relative_eq!(cov[(1, 1)], 0.04);
        assert_relative_eq!(cov[(0, 1)], 0.5 * 0.1 * 0.2);
        assert_relative_eq!(cov[(1, 0)], cov[(0, 1)]);
    }

    #[test]
    fn test_covariance_requires_correlation() {
        let portfolio = Portfolio::new("P", [asset("A1", 1.0, 0.3, 0.1)]).unwrap();
        assert!(portfolio.covariance_matrix().is_err());
    }
}
