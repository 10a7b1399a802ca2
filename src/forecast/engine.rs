use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::series::HourlySeries;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("insufficient history: need at least {needed} hours, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    #[error("invalid forecast horizon: {0}")]
    InvalidHorizon(String),

    #[error("dimension mismatch: actual={actual}, predicted={predicted}")]
    DimensionMismatch { actual: usize, predicted: usize },

    #[error("empty data provided")]
    EmptyData,
}

/// One forecast hour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub ts: NaiveDateTime,
    pub yhat: f64,
}

/// Fits a model on `history` and predicts hourly demand for
/// `[start, start + hours)`.
///
/// Implementations are refit on every call; the walk-forward simulation
/// relies on that to train on exactly the data available before each day.
/// Predictions are never negative.
#[cfg_attr(test, mockall::automock)]
pub trait DemandForecaster: Send + Sync {
    fn name(&self) -> &'static str;

    fn fit_and_predict(
        &self,
        history: &HourlySeries,
        start: NaiveDateTime,
        hours: usize,
    ) -> Result<Vec<ForecastPoint>, ForecastError>;
}

pub(crate) fn check_horizon(start: NaiveDateTime, hours: usize) -> Result<(), ForecastError> {
    if hours == 0 {
        return Err(ForecastError::InvalidHorizon("hours must be > 0".to_string()));
    }
    if !crate::series::is_hour_aligned(start) {
        return Err(ForecastError::InvalidHorizon(format!(
            "start {start} is not aligned to a full hour"
        )));
    }
    Ok(())
}
