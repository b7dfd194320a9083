//! Output tables and KPIs of a rebalancing run.

use rebalance_core::risk::relative_variance;
use rebalance_core::Portfolio;
use serde::{Deserialize, Serialize};

use crate::error::{RebalanceError, RebalanceResult};
use crate::extraction::{Allocation, SolveSummary};

/// One row of the rebalanced segment table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRow {
    /// Owning asset.
    pub asset: String,
    /// Segment identifier.
    pub segment_id: String,
    /// Exposure before rebalancing.
    pub original_exposure: f64,
    /// Multiplier chosen by the solver.
    pub multiplier: f64,
    /// Rounded exposure after rebalancing.
    pub rebalanced_exposure: f64,
}

/// One row of the rebalanced asset table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRow {
    /// Asset identifier.
    pub asset: String,
    /// Exposure before rebalancing.
    pub original_exposure: f64,
    /// Exposure after rebalancing.
    pub rebalanced_exposure: f64,
    /// `rebalanced_exposure - original_exposure`.
    pub exposure_change: f64,
    /// Average risk weight after rebalancing.
    pub average_risk_weight: f64,
}

/// KPIs recomputed from the rounded, rebalanced portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedKpis {
    /// Σ rebalanced exposure × profitability.
    pub expected_profit: f64,
    /// Origination cost on increases plus sell cost on decreases.
    pub transaction_cost: f64,
    /// `expected_profit - transaction_cost`.
    pub net_profit: f64,
    /// Exposure-weighted average risk weight.
    pub average_risk_weight: f64,
    /// Total exposure before rebalancing.
    pub initial_exposure: f64,
    /// Total exposure after rebalancing.
    pub optimized_exposure: f64,
    /// `z × expected_profit × sqrt(rᵀ Σ r)` over exposure shares `r`;
    /// absent without a correlation matrix.
    pub downside: Option<f64>,
}

/// Everything a run reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceReport {
    /// KPIs at the solver's unrounded point.
    pub solver: SolveSummary,
    /// KPIs of the rounded portfolio.
    pub realized: RealizedKpis,
    /// Rebalanced segment table.
    pub segments: Vec<SegmentRow>,
    /// Rebalanced asset table.
    pub assets: Vec<AssetRow>,
}

impl RebalanceReport {
    /// Builds the report for a rebalanced portfolio.
    pub fn new(
        original: &Portfolio,
        rebalanced: &Portfolio,
        allocation: &Allocation,
        solver: SolveSummary,
        z_score: f64,
    ) -> RebalanceResult<Self> {
        Ok(Self {
            solver,
            realized: realized_kpis(original, rebalanced, z_score)?,
            segments: segment_rows(original, rebalanced, allocation),
            assets: asset_rows(original, rebalanced),
        })
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> RebalanceResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| RebalanceError::table(e.to_string()))
    }
}

/// Segment rows in portfolio order.
pub fn segment_rows(original: &Portfolio, rebalanced: &Portfolio, allocation: &Allocation) -> Vec<SegmentRow> {
    original
        .segments()
        .map(|(asset, segment)| {
            let rebalanced_exposure = rebalanced
                .asset(asset.id())
                .and_then(|a| a.segment(segment.id()))
                .map_or(0.0, |s| s.exposure());
            SegmentRow {
                asset: asset.id().to_string(),
                segment_id: segment.id().to_string(),
                original_exposure: segment.exposure(),
                multiplier: allocation.get(asset.id(), segment.id()).unwrap_or(0.0),
                rebalanced_exposure,
            }
        })
        .collect()
}

/// Asset rows in portfolio order.
pub fn asset_rows(original: &Portfolio, rebalanced: &Portfolio) -> Vec<AssetRow> {
    original
        .assets()
        .map(|asset| {
            let after = rebalanced.asset(asset.id());
            let rebalanced_exposure = after.map_or(0.0, |a| a.total_exposure());
            AssetRow {
                asset: asset.id().to_string(),
                original_exposure: asset.total_exposure(),
                rebalanced_exposure,
                exposure_change: rebalanced_exposure - asset.total_exposure(),
                average_risk_weight: after.map_or(0.0, |a| a.average_risk_weight()),
            }
        })
        .collect()
}

/// Recomputes KPIs from the rounded portfolio.
///
/// The downside uses the original portfolio's correlation matrix and the
/// rebalanced exposure shares.
pub fn realized_kpis(
    original: &Portfolio,
    rebalanced: &Portfolio,
    z_score: f64,
) -> RebalanceResult<RealizedKpis> {
    let mut transaction_cost = 0.0;
    for (asset, segment) in original.segments() {
        let after = rebalanced
            .asset(asset.id())
            .and_then(|a| a.segment(segment.id()))
            .map_or(0.0, |s| s.exposure());
        let change = after - segment.exposure();
        transaction_cost += if change > 0.0 {
            change * segment.rel_origination_cost()
        } else {
            -change * segment.rel_sell_cost()
        };
    }

    let expected_profit = rebalanced.total_profit();
    let downside = if original.correlation().is_some() {
        let covariance = original.covariance_matrix()?;
        let exposures: Vec<f64> = original
            .assets()
            .map(|asset| rebalanced.asset(asset.id()).map_or(0.0, |a| a.total_exposure()))
            .collect();
        let variance = relative_variance(&covariance, &exposures, rebalanced.total_exposure())?;
        Some(z_score * expected_profit * variance.max(0.0).sqrt())
    } else {
        None
    };

    Ok(RealizedKpis {
        expected_profit,
        transaction_cost,
        net_profit: expected_profit - transaction_cost,
        average_risk_weight: rebalanced.average_risk_weight(),
        initial_exposure: original.total_exposure(),
        optimized_exposure: rebalanced.total_exposure(),
        downside,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::new_portfolio;
    use approx::assert_relative_eq;
    use rebalance_core::{Asset, CorrelationMatrix, Segment};

    fn original() -> Portfolio {
        let mut a1 = Asset::new("A1").with_profit_stdev(0.1).unwrap();
        a1.add_segment(
            Segment::new("S1", "A1", 1000.0, 0.05, 0.3)
                .unwrap()
                .with_costs(0.02, 0.01)
                .unwrap(),
        )
        .unwrap();
        let mut a2 = Asset::new("A2").with_profit_stdev(0.2).unwrap();
        a2.add_segment(
            Segment::new("S2", "A2", 1000.0, 0.04, 0.5)
                .unwrap()
                .with_costs(0.03, 0.01)
                .unwrap(),
        )
        .unwrap();
        Portfolio::new("original", [a1, a2])
            .unwrap()
            .with_correlation(
                CorrelationMatrix::from_rows(
                    vec!["A1".into(), "A2".into()],
                    &[vec![1.0, 0.5], vec![0.5, 1.0]],
                )
                .unwrap(),
            )
            .unwrap()
    }

    fn allocation() -> Allocation {
        let mut allocation = Allocation::new();
        allocation.insert("A1", "S1", 1.2);
        allocation.insert("A2", "S2", 0.8);
        allocation
    }

    #[test]
    fn test_realized_kpis() {
        let original = original();
        let rebalanced = new_portfolio(&original, &allocation()).unwrap();
        let kpis = realized_kpis(&original, &rebalanced, 2.0).unwrap();

        assert_relative_eq!(kpis.expected_profit, 1200.0 * 0.05 + 800.0 * 0.04);
        // 200 grown at 1%, 200 sold at 3%
        assert_relative_eq!(kpis.transaction_cost, 2.0 + 6.0, epsilon = 1e-9);
        assert_relative_eq!(kpis.net_profit, 92.0 - 8.0, epsilon = 1e-9);
        assert_relative_eq!(kpis.average_risk_weight, (360.0 + 400.0) / 2000.0);
        assert_eq!(kpis.initial_exposure, 2000.0);
        assert_eq!(kpis.optimized_exposure, 2000.0);

        // r = (0.6, 0.4): 0.01*0.36 + 0.04*0.16 + 2*0.5*0.1*0.2*0.24
        let variance: f64 = 0.0036 + 0.0064 + 0.0048;
        assert_relative_eq!(kpis.downside.unwrap(), 2.0 * 92.0 * variance.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_realized_without_correlation() {
        let original = Portfolio::new("bare", original().assets().cloned()).unwrap();
        let rebalanced = new_portfolio(&original, &allocation()).unwrap();
        let kpis = realized_kpis(&original, &rebalanced, 2.0).unwrap();
        assert_eq!(kpis.downside, None);
    }

    #[test]
    fn test_rows() {
        let original = original();
        let allocation = allocation();
        let rebalanced = new_portfolio(&original, &allocation).unwrap();

        let segments = segment_rows(&original, &rebalanced, &allocation);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].segment_id, "S1");
        assert_eq!(segments[0].multiplier, 1.2);
        assert_eq!(segments[0].rebalanced_exposure, 1200.0);

        let assets = asset_rows(&original, &rebalanced);
        assert_eq!(assets[1].asset, "A2");
        assert_eq!(assets[1].exposure_change, -200.0);
        assert_relative_eq!(assets[1].average_risk_weight, 0.5);
    }
}
