//! Portfolio construction from input tables and from solved allocations.

use std::collections::{BTreeMap, HashSet};

use rebalance_core::{Asset, CoreError, CorrelationMatrix, Portfolio, Segment};
use tracing::{debug, info};

use crate::error::RebalanceResult;
use crate::extraction::Allocation;
use crate::tables::{AssetRecord, SegmentRecord};

/// Identifier given to portfolios built from input tables.
pub const ORIGINAL_PORTFOLIO_ID: &str = "original";

/// Builds a validated portfolio from table rows.
///
/// Segment rows are grouped by asset, bounds and profit standard deviations
/// come from the asset table. Asset rows that own no segment are skipped.
pub fn from_tables(
    segments: &[SegmentRecord],
    assets: &[AssetRecord],
    correlation: Option<CorrelationMatrix>,
) -> RebalanceResult<Portfolio> {
    let mut by_id: BTreeMap<&str, Asset> = BTreeMap::new();
    for row in assets {
        if by_id.contains_key(row.asset.as_str()) {
            return Err(CoreError::DuplicateAsset {
                asset: row.asset.clone(),
            }
            .into());
        }
        let asset = Asset::new(&row.asset)
            .with_bounds(row.max_exposure_decrease, row.max_exposure_increase)?
            .with_profit_stdev(row.stdev_profitability.unwrap_or(0.0))?;
        by_id.insert(row.asset.as_str(), asset);
    }

    let mut seen = HashSet::new();
    for row in segments {
        if !seen.insert(row.segment_id.as_str()) {
            return Err(CoreError::DuplicateSegment {
                segment_id: row.segment_id.clone(),
            }
            .into());
        }
        let asset = by_id
            .get_mut(row.asset.as_str())
            .ok_or_else(|| CoreError::unknown_asset(&row.segment_id, &row.asset))?;
        let segment = Segment::new(
            &row.segment_id,
            &row.asset,
            row.exposure,
            row.average_profitability,
            row.risk_weight,
        )?
        .with_costs(
            row.rel_sell_cost.unwrap_or(0.0),
            row.rel_origination_cost.unwrap_or(0.0),
        )?;
        asset.add_segment(segment)?;
    }

    let populated = by_id.into_values().filter(|asset| {
        let keep = asset.segment_count() > 0;
        if !keep {
            debug!(asset = asset.id(), "skipping asset without segments");
        }
        keep
    });
    let mut portfolio = Portfolio::new(ORIGINAL_PORTFOLIO_ID, populated)?;
    if let Some(correlation) = correlation {
        portfolio = portfolio.with_correlation(correlation)?;
    }

    info!(
        assets = portfolio.asset_count(),
        segments = portfolio.segment_count(),
        total_exposure = portfolio.total_exposure(),
        average_risk_weight = portfolio.average_risk_weight(),
        "built portfolio"
    );
    Ok(portfolio)
}

/// Applies an allocation to the original portfolio.
///
/// Each segment's exposure becomes `round(multiplier * exposure)`, rounding
/// halves to the nearest even integer. Bounds and profit standard deviations carry over;
/// the result has no correlation matrix.
pub fn new_portfolio(original: &Portfolio, allocation: &Allocation) -> RebalanceResult<Portfolio> {
    let mut assets = Vec::with_capacity(original.asset_count());
    for asset in original.assets() {
        let mut rebuilt = Asset::new(asset.id())
            .with_bounds(asset.max_exposure_decrease(), asset.max_exposure_increase())?
            .with_profit_stdev(asset.profit_stdev())?;
        for segment in asset.segments() {
            let multiplier = allocation
                .get(asset.id(), segment.id())
                .ok_or_else(|| CoreError::missing_allocation(asset.id(), segment.id()))?;
            if !multiplier.is_finite() || multiplier < 0.0 {
                return Err(CoreError::invalid_field(
                    segment.id(),
                    "multiplier",
                    multiplier,
                    "must be finite and non-negative",
                )
                .into());
            }
            let exposure = (multiplier * segment.exposure()).round_ties_even();
            rebuilt.add_segment(segment.with_exposure(exposure)?)?;
        }
        assets.push(rebuilt);
    }

    let portfolio = Portfolio::new(format!("{}-rebalanced", original.id()), assets)?;
    debug!(
        total_exposure = portfolio.total_exposure(),
        average_risk_weight = portfolio.average_risk_weight(),
        "applied allocation"
    );
    Ok(portfolio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RebalanceError;
    use approx::assert_relative_eq;

    fn segment(id: &str, asset: &str, exposure: f64) -> SegmentRecord {
        SegmentRecord {
            segment_id: id.into(),
            asset: asset.into(),
            exposure,
            average_profitability: 0.05,
            risk_weight: 0.3,
            rel_sell_cost: None,
            rel_origination_cost: Some(0.01),
        }
    }

    fn asset(id: &str) -> AssetRecord {
        AssetRecord {
            asset: id.into(),
            max_exposure_decrease: 0.2,
            max_exposure_increase: 0.3,
            stdev_profitability: Some(0.02),
        }
    }

    #[test]
    fn test_from_tables_groups_segments() {
        let segments = [
            segment("S1", "A1", 600.0),
            segment("S2", "A1", 400.0),
            segment("S3", "A2", 500.0),
        ];
        let portfolio = from_tables(&segments, &[asset("A1"), asset("A2")], None).unwrap();

        assert_eq!(portfolio.asset_count(), 2);
        assert_eq!(portfolio.segment_count(), 3);
        let a1 = portfolio.asset("A1").unwrap();
        assert_eq!(a1.total_exposure(), 1000.0);
        assert_relative_eq!(a1.min_rel_exposure(), 0.8);
        assert_relative_eq!(a1.max_rel_exposure(), 1.3);
        assert_eq!(a1.profit_stdev(), 0.02);
        let s1 = a1.segment("S1").unwrap();
        assert_eq!(s1.rel_sell_cost(), 0.0);
        assert_eq!(s1.rel_origination_cost(), 0.01);
    }

    #[test]
    fn test_assets_without_segments_are_ignored() {
        let portfolio =
            from_tables(&[segment("S1", "A1", 10.0)], &[asset("A1"), asset("A2")], None).unwrap();
        assert_eq!(portfolio.asset_ids(), vec!["A1"]);
    }

    #[test]
    fn test_unknown_asset() {
        let err = from_tables(&[segment("S1", "A9", 10.0)], &[asset("A1")], None).unwrap_err();
        assert!(matches!(
            err,
            RebalanceError::Validation(CoreError::UnknownAsset { .. })
        ));
    }

    #[test]
    fn test_duplicate_segment_across_assets() {
        let err = from_tables(
            &[segment("S1", "A1", 10.0), segment("S1", "A2", 10.0)],
            &[asset("A1"), asset("A2")],
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RebalanceError::Validation(CoreError::DuplicateSegment { .. })
        ));
    }

    #[test]
    fn test_out_of_range_fields() {
        let mut negative = segment("S1", "A1", -1.0);
        assert!(from_tables(&[negative.clone()], &[asset("A1")], None).is_err());
        negative.exposure = 1.0;
        negative.rel_sell_cost = Some(-0.1);
        assert!(from_tables(&[negative], &[asset("A1")], None).is_err());

        let mut bad_bounds = asset("A1");
        bad_bounds.max_exposure_decrease = 1.2;
        assert!(from_tables(&[segment("S1", "A1", 1.0)], &[bad_bounds], None).is_err());

        let mut nan = segment("S1", "A1", 1.0);
        nan.average_profitability = f64::NAN;
        assert!(from_tables(&[nan], &[asset("A1")], None).is_err());
    }

    #[test]
    fn test_correlation_must_cover_assets() {
        let corr = CorrelationMatrix::identity(vec!["A1".into()]);
        let err = from_tables(
            &[segment("S1", "A1", 10.0), segment("S2", "A2", 10.0)],
            &[asset("A1"), asset("A2")],
            Some(corr),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RebalanceError::Validation(CoreError::MissingCorrelation { .. })
        ));
    }

    #[test]
    fn test_new_portfolio_rounds_and_reaggregates() {
        let segments = [segment("S1", "A1", 1000.0), segment("S2", "A1", 333.0)];
        let original = from_tables(&segments, &[asset("A1")], None).unwrap();

        let mut allocation = Allocation::new();
        allocation.insert("A1", "S1", 1.2);
        allocation.insert("A1", "S2", 1.5);
        let rebalanced = new_portfolio(&original, &allocation).unwrap();

        let a1 = rebalanced.asset("A1").unwrap();
        assert_eq!(a1.segment("S1").unwrap().exposure(), 1200.0);
        // 499.5 rounds to the even neighbour
        assert_eq!(a1.segment("S2").unwrap().exposure(), 500.0);
        assert_eq!(rebalanced.total_exposure(), 1700.0);
        assert_eq!(a1.max_exposure_increase(), 0.3);
        assert!(rebalanced.correlation().is_none());
        assert_eq!(original.total_exposure(), 1333.0);
    }

    #[test]
    fn test_new_portfolio_rounds_half_to_even() {
        let segments = [segment("S1", "A1", 1001.0), segment("S2", "A1", 3.0)];
        let original = from_tables(&segments, &[asset("A1")], None).unwrap();

        let mut allocation = Allocation::new();
        allocation.insert("A1", "S1", 0.5);
        allocation.insert("A1", "S2", 0.5);
        let rebalanced = new_portfolio(&original, &allocation).unwrap();

        let a1 = rebalanced.asset("A1").unwrap();
        assert_eq!(a1.segment("S1").unwrap().exposure(), 500.0);
        assert_eq!(a1.segment("S2").unwrap().exposure(), 2.0);
    }

    #[test]
    fn test_new_portfolio_missing_or_negative_multiplier() {
        let original = from_tables(&[segment("S1", "A1", 10.0)], &[asset("A1")], None).unwrap();

        let err = new_portfolio(&original, &Allocation::new()).unwrap_err();
        assert!(matches!(
            err,
            RebalanceError::Validation(CoreError::MissingAllocation { .. })
        ));

        let mut allocation = Allocation::new();
        allocation.insert("A1", "S1", -0.5);
        assert!(new_portfolio(&original, &allocation).is_err());
    }
}
