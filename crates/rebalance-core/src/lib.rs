//! # Rebalance Core
//!
//! Domain model for the Rebalance portfolio optimizer.
//!
//! This crate provides the entities the optimizer works on:
//!
//! - **Segments**: The smallest unit of exposure, carrying profitability,
//!   risk weight and transaction cost rates
//! - **Assets**: Risk buckets that own segments and aggregate them
//! - **Portfolios**: Sets of assets plus the correlation matrix between them
//! - **Risk**: Covariance construction and the closed-form relative variance
//!
//! ## Design Philosophy
//!
//! - **Consistent Aggregates**: Totals are updated in the same call that
//!   changes the segment set, so readers never see a stale average
//! - **Immutable Snapshots**: A rebalanced portfolio is a new value, the
//!   original is never mutated
//! - **Dense Correlations**: Pairwise lookups go through a fixed
//!   identifier-to-index map into a dense matrix
//!
//! ## Example
//!
//! ```rust
//! use rebalance_core::prelude::*;
//!
//! let mut asset = Asset::new("Retail_Mortgage");
//! asset
//!     .add_segment(Segment::new("S1", "Retail_Mortgage", 1000.0, 0.05, 0.3).unwrap())
//!     .unwrap();
//!
//! let portfolio = Portfolio::new("input", [asset]).unwrap();
//! assert_eq!(portfolio.total_exposure(), 1000.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::float_cmp)]
#![allow(clippy::uninlined_format_args)]

pub mod error;
pub mod risk;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::risk::{covariance_from_correlation, relative_variance};
    pub use crate::types::{Asset, CorrelationMatrix, Portfolio, Segment};
}

pub use error::{CoreError, CoreResult};
pub use types::{Asset, CorrelationMatrix, Portfolio, Segment};
