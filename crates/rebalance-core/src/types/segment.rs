//! Exposure segments.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, CoreError, CoreResult};

/// The smallest rebalancing unit.
///
/// A segment is immutable once built. Rebalancing produces a new segment via
/// [`Segment::with_exposure`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    id: String,
    asset_id: String,
    exposure: f64,
    profitability: f64,
    risk_weight: f64,
    rel_sell_cost: f64,
    rel_origination_cost: f64,
}

impl Segment {
    /// Creates a segment without transaction costs.
    ///
    /// Exposure and risk weight must be finite and non-negative; profitability
    /// may be negative but must be finite.
    pub fn new(
        id: impl Into<String>,
        asset_id: impl Into<String>,
        exposure: f64,
        profitability: f64,
        risk_weight: f64,
    ) -> CoreResult<Self> {
        let id = id.into();
        ensure_non_negative(&id, "exposure", exposure)?;
        ensure_non_negative(&id, "risk_weight", risk_weight)?;
        if !profitability.is_finite() {
            return Err(CoreError::invalid_field(
                &id,
                "average_profitability",
                profitability,
                "must be finite",
            ));
        }

        Ok(Self {
            id,
            asset_id: asset_id.into(),
            exposure,
            profitability,
            risk_weight,
            rel_sell_cost: 0.0,
            rel_origination_cost: 0.0,
        })
    }

    /// Sets the relative costs of shrinking and growing this segment.
    pub fn with_costs(mut self, rel_sell_cost: f64, rel_origination_cost: f64) -> CoreResult<Self> {
        ensure_non_negative(&self.id, "rel_sell_cost", rel_sell_cost)?;
        ensure_non_negative(&self.id, "rel_origination_cost", rel_origination_cost)?;
        self.rel_sell_cost = rel_sell_cost;
        self.rel_origination_cost = rel_origination_cost;
        Ok(self)
    }

    /// Returns a copy of this segment carrying a different exposure.
    pub fn with_exposure(&self, exposure: f64) -> CoreResult<Self> {
        ensure_non_negative(&self.id, "exposure", exposure)?;
        Ok(Self {
            exposure,
            ..self.clone()
        })
    }

    /// Segment identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Identifier of the owning asset.
    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    /// Current exposure in currency units.
    pub fn exposure(&self) -> f64 {
        self.exposure
    }

    /// Expected profitability rate.
    pub fn profitability(&self) -> f64 {
        self.profitability
    }

    /// Risk weight applied to exposure.
    pub fn risk_weight(&self) -> f64 {
        self.risk_weight
    }

    /// Cost per unit of exposure sold.
    pub fn rel_sell_cost(&self) -> f64 {
        self.rel_sell_cost
    }

    /// Cost per unit of exposure originated.
    pub fn rel_origination_cost(&self) -> f64 {
        self.rel_origination_cost
    }

    /// Expected profit: exposure × profitability.
    pub fn profit(&self) -> f64 {
        self.exposure * self.profitability
    }

    /// Risk-weighted exposure: exposure × risk weight.
    pub fn risk_weighted_exposure(&self) -> f64 {
        self.exposure * self.risk_weight
    }
}
