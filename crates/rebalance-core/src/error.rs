//! Error types for the domain model.
//!
//! Every variant here is a validation failure: the input or an allocation is
//! inconsistent with the portfolio it is applied to.

use thiserror::Error;

/// A specialized Result type for domain model operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Validation errors raised while building or rebuilding a portfolio.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A segment references an asset that is not in the asset table.
    #[error("Segment '{segment_id}' references unknown asset '{asset}'")]
    UnknownAsset {
        /// The offending segment.
        segment_id: String,
        /// The asset it references.
        asset: String,
    },

    /// A segment was added to an asset it does not belong to.
    #[error("Segment '{segment_id}' belongs to asset '{actual}', not '{expected}'")]
    AssetMismatch {
        /// The offending segment.
        segment_id: String,
        /// The asset the segment was added to.
        expected: String,
        /// The asset recorded on the segment.
        actual: String,
    },

    /// Segment identifiers must be unique.
    #[error("Duplicate segment: {segment_id}")]
    DuplicateSegment {
        /// The repeated identifier.
        segment_id: String,
    },

    /// Asset identifiers must be unique.
    #[error("Duplicate asset: {asset}")]
    DuplicateAsset {
        /// The repeated identifier.
        asset: String,
    },

    /// A numeric field is outside its permitted range.
    #[error("Invalid {field} for '{id}': {value} ({reason})")]
    InvalidField {
        /// Segment or asset identifier.
        id: String,
        /// Field name as it appears in the input tables.
        field: String,
        /// The rejected value.
        value: f64,
        /// Why the value was rejected.
        reason: String,
    },

    /// The correlation matrix is malformed.
    #[error("Invalid correlation matrix: {reason}")]
    InvalidCorrelation {
        /// Description of the problem.
        reason: String,
    },

    /// The correlation matrix has no row/column for a portfolio asset.
    #[error("Correlation matrix is missing asset '{asset}'")]
    MissingCorrelation {
        /// The asset without a correlation entry.
        asset: String,
    },

    /// An allocation has no multiplier for a known segment.
    #[error("Allocation is missing an entry for ({asset}, {segment_id})")]
    MissingAllocation {
        /// Owning asset.
        asset: String,
        /// Segment without a multiplier.
        segment_id: String,
    },

    /// Dimensions of two inputs disagree.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
}

impl CoreError {
    /// Creates an unknown asset error.
    #[must_use]
    pub fn unknown_asset(segment_id: impl Into<String>, asset: impl Into<String>) -> Self {
        Self::UnknownAsset {
            segment_id: segment_id.into(),
            asset: asset.into(),
        }
    }

    /// Creates an invalid field error.
    #[must_use]
    pub fn invalid_field(
        id: impl Into<String>,
        field: impl Into<String>,
        value: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            id: id.into(),
            field: field.into(),
            value,
            reason: reason.into(),
        }
    }

    /// Creates an invalid correlation error.
    #[must_use]
    pub fn invalid_correlation(reason: impl Into<String>) -> Self {
        Self::InvalidCorrelation {
            reason: reason.into(),
        }
    }

    /// Creates a missing allocation error.
    #[must_use]
    pub fn missing_allocation(asset: impl Into<String>, segment_id: impl Into<String>) -> Self {
        Self::MissingAllocation {
            asset: asset.into(),
            segment_id: segment_id.into(),
        }
    }
}

/// Rejects NaN, infinities and negative values.
pub(crate) fn ensure_non_negative(id: &str, field: &str, value: f64) -> CoreResult<()> {
    if !value.is_finite() {
        return Err(CoreError::invalid_field(id, field, value, "must be finite"));
    }
    if value < 0.0 {
        return Err(CoreError::invalid_field(id, field, value, "must be >= 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::unknown_asset("S1", "Retail_Other");
        assert!(err.to_string().contains("S1"));
        assert!(err.to_string().contains("Retail_Other"));

        let err = CoreError::missing_allocation("A1", "S9");
        assert!(err.to_string().contains("(A1, S9)"));
    }

    #[test]
    fn test_ensure_non_negative() {
        assert!(ensure_non_negative("S1", "exposure", 0.0).is_ok());
        assert!(ensure_non_negative("S1", "exposure", -1.0).is_err());
        assert!(ensure_non_negative("S1", "exposure", f64::NAN).is_err());
    }
}
