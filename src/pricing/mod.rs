//! Dynamic price index
//!
//! Turns the shape of a demand forecast into an hourly multiplier on the
//! flat base price: hours near the local forecast peak are priced up to
//! `scale_max`, hours near the local trough down to `scale_min`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod price_index;

pub use price_index::*;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("invalid price band: min={min}, max={max} (need 0 < min <= max)")]
    InvalidBand { min: f64, max: f64 },
    #[error("rolling window must be at least one hour, got {0}h")]
    InvalidWindow(i64),
    #[error("base price must be positive, got {0}")]
    InvalidBasePrice(f64),
}

/// Bounds of the price index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    pub scale_min: f64,
    pub scale_max: f64,
}

impl PriceBand {
    pub fn new(scale_min: f64, scale_max: f64) -> Result<Self, PricingError> {
        if !(scale_min.is_finite() && scale_max.is_finite())
            || scale_min <= 0.0
            || scale_min > scale_max
        {
            return Err(PricingError::InvalidBand {
                min: scale_min,
                max: scale_max,
            });
        }
        Ok(Self {
            scale_min,
            scale_max,
        })
    }

    pub fn midpoint(&self) -> f64 {
        (self.scale_min + self.scale_max) / 2.0
    }

    pub fn contains(&self, index: f64) -> bool {
        index >= self.scale_min && index <= self.scale_max
    }
}

impl Default for PriceBand {
    fn default() -> Self {
        Self {
            scale_min: 0.6,
            scale_max: 1.4,
        }
    }
}
