//! Assets: risk buckets that own segments.

use std::collections::BTreeMap;

use crate::error::{ensure_non_negative, CoreError, CoreResult};
use crate::types::Segment;

/// Default maximum fractional decrease when no bound is configured.
pub const DEFAULT_MAX_EXPOSURE_DECREASE: f64 = 0.5;

/// Default maximum fractional increase when no bound is configured.
pub const DEFAULT_MAX_EXPOSURE_INCREASE: f64 = 0.5;

/// A risk bucket grouping segments that share exposure bounds and volatility.
///
/// Aggregates (total exposure, profit, risk-weighted exposure and average
/// risk weight) are maintained by [`Asset::add_segment`].
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    id: String,
    segments: BTreeMap<String, Segment>,
    total_exposure: f64,
    total_profit: f64,
    total_risk_weighted: f64,
    average_risk_weight: f64,
    max_exposure_decrease: f64,
    max_exposure_increase: f64,
    profit_stdev: f64,
}

impl Asset {
    /// Creates an empty asset with default bounds and zero volatility.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            segments: BTreeMap::new(),
            total_exposure: 0.0,
            total_profit: 0.0,
            total_risk_weighted: 0.0,
            average_risk_weight: 0.0,
            max_exposure_decrease: DEFAULT_MAX_EXPOSURE_DECREASE,
            max_exposure_increase: DEFAULT_MAX_EXPOSURE_INCREASE,
            profit_stdev: 0.0,
        }
    }

    /// Sets the permitted fractional decrease and increase of total exposure.
    ///
    /// The decrease must lie in `[0, 1]`; the increase must be non-negative.
    pub fn with_bounds(mut self, max_decrease: f64, max_increase: f64) -> CoreResult<Self> {
        self.set_bounds(max_decrease, max_increase)?;
        Ok(self)
    }

    /// In-place variant of [`Asset::with_bounds`].
    pub fn set_bounds(&mut self, max_decrease: f64, max_increase: f64) -> CoreResult<()> {
        ensure_non_negative(&self.id, "max_exposure_decrease", max_decrease)?;
        if max_decrease > 1.0 {
            return Err(CoreError::invalid_field(
                &self.id,
                "max_exposure_decrease",
                max_decrease,
                "must be <= 1",
            ));
        }
        ensure_non_negative(&self.id, "max_exposure_increase", max_increase)?;
        self.max_exposure_decrease = max_decrease;
        self.max_exposure_increase = max_increase;
        Ok(())
    }

    /// Sets the standard deviation of profitability.
    pub fn with_profit_stdev(mut self, stdev: f64) -> CoreResult<Self> {
        self.set_profit_stdev(stdev)?;
        Ok(self)
    }

    /// In-place variant of [`Asset::with_profit_stdev`].
    pub fn set_profit_stdev(&mut self, stdev: f64) -> CoreResult<()> {
        ensure_non_negative(&self.id, "stdev_profitability", stdev)?;
        self.profit_stdev = stdev;
        Ok(())
    }

    /// Adds a segment and updates every aggregate in one step.
    ///
    /// Fails if the segment belongs to another asset or if its identifier is
    /// already present.
    pub fn add_segment(&mut self, segment: Segment) -> CoreResult<()> {
        if segment.asset_id() != self.id {
            return Err(CoreError::AssetMismatch {
                segment_id: segment.id().to_string(),
                expected: self.id.clone(),
                actual: segment.asset_id().to_string(),
            });
        }
        if self.segments.contains_key(segment.id()) {
            return Err(CoreError::DuplicateSegment {
                segment_id: segment.id().to_string(),
            });
        }

        self.total_exposure += segment.exposure();
        self.total_profit += segment.profit();
        self.total_risk_weighted += segment.risk_weighted_exposure();
        self.average_risk_weight = average(self.total_risk_weighted, self.total_exposure);
        self.segments.insert(segment.id().to_string(), segment);
        Ok(())
    }

    /// Asset identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Segments ordered by identifier.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    /// Looks up a segment by identifier.
    pub fn segment(&self, segment_id: &str) -> Option<&Segment> {
        self.segments.get(segment_id)
    }

    /// Number of segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Sum of segment exposures.
    pub fn total_exposure(&self) -> f64 {
        self.total_exposure
    }

    /// Sum of exposure × profitability.
    pub fn total_profit(&self) -> f64 {
        self.total_profit
    }

    /// Sum of exposure × risk weight.
    pub fn total_risk_weighted(&self) -> f64 {
        self.total_risk_weighted
    }

    /// Exposure-weighted average risk weight (0 for an empty asset).
    pub fn average_risk_weight(&self) -> f64 {
        self.average_risk_weight
    }

    /// Maximum fractional decrease of total exposure.
    pub fn max_exposure_decrease(&self) -> f64 {
        self.max_exposure_decrease
    }

    /// Maximum fractional increase of total exposure.
    pub fn max_exposure_increase(&self) -> f64 {
        self.max_exposure_increase
    }

    /// Lower exposure multiplier, `1 - max decrease`.
    pub fn min_rel_exposure(&self) -> f64 {
        1.0 - self.max_exposure_decrease
    }

    /// Upper exposure multiplier, `1 + max increase`.
    pub fn max_rel_exposure(&self) -> f64 {
        1.0 + self.max_exposure_increase
    }

    /// Smallest total exposure a rebalance may leave.
    pub fn min_exposure(&self) -> f64 {
        self.min_rel_exposure() * self.total_exposure
    }

    /// Largest total exposure a rebalance may reach.
    pub fn max_exposure(&self) -> f64 {
        self.max_rel_exposure() * self.total_exposure
    }

    /// Standard deviation of profitability.
    pub fn profit_stdev(&self) -> f64 {
        self.profit_stdev
    }
}

pub(crate) fn average(weighted: f64, total: f64) -> f64 {
    if total > 0.0 {
        weighted / total
    } else {
        0.0
    }
}
