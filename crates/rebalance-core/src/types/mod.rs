//! Domain entities.

mod asset;
mod correlation;
mod portfolio;
mod segment;

pub use asset::{Asset, DEFAULT_MAX_EXPOSURE_DECREASE, DEFAULT_MAX_EXPOSURE_INCREASE};
pub use correlation::CorrelationMatrix;
pub use portfolio::Portfolio;
pub use segment::Segment;
