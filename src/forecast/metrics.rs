//! Forecast Metrics and Evaluation
//!
//! Accuracy metrics used to judge the demand forecaster: MAE, RMSE, MAPE and R².

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ForecastError;

/// Forecast accuracy metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Square Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error (%), over points with non-zero actual
    pub mape: f64,
    /// R² (coefficient of determination)
    pub r2: f64,
    /// Number of samples evaluated
    pub sample_count: usize,
    /// Number of samples that contributed to MAPE
    pub mape_sample_count: usize,
    /// Maximum absolute error observed
    pub max_error: f64,
    /// Mean signed error (actual - predicted)
    pub bias: f64,
}

impl ForecastMetrics {
    /// Calculate metrics from actual and predicted values
    pub fn calculate(actual: &[f64], predicted: &[f64]) -> Result<Self, ForecastError> {
        if actual.len() != predicted.len() {
            return Err(ForecastError::DimensionMismatch {
                actual: actual.len(),
                predicted: predicted.len(),
            });
        }

        if actual.is_empty() {
            return Err(ForecastError::EmptyData);
        }

        let n = actual.len();
        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        let mut signed_sum = 0.0;
        let mut max_error = 0.0f64;
        let mut pct_sum = 0.0;
        let mut pct_count = 0usize;

        for (a, p) in actual.iter().zip(predicted.iter()) {
            let error = a - p;
            abs_sum += error.abs();
            sq_sum += error * error;
            signed_sum += error;
            max_error = max_error.max(error.abs());

            // Hours without demand are common for a single site; they carry
            // no percentage error
            if a.abs() > 1e-9 {
                pct_sum += (error / a).abs() * 100.0;
                pct_count += 1;
            }
        }

        let mae = abs_sum / n as f64;
        let rmse = (sq_sum / n as f64).sqrt();
        let mape = if pct_count == 0 {
            0.0
        } else {
            pct_sum / pct_count as f64
        };

        let mean_actual = actual.iter().sum::<f64>() / n as f64;
        let total_variance: f64 = actual.iter().map(|a| (a - mean_actual).powi(2)).sum();
        let r2 = if total_variance > 1e-10 {
            1.0 - (sq_sum / total_variance)
        } else {
            0.0
        };

        Ok(ForecastMetrics {
            mae,
            rmse,
            mape,
            r2,
            sample_count: n,
            mape_sample_count: pct_count,
            max_error,
            bias: signed_sum / n as f64,
        })
    }

    /// Assess forecast quality based on MAPE
    pub fn quality(&self) -> ForecastQuality {
        if self.mape < 5.0 {
            ForecastQuality::Excellent
        } else if self.mape < 10.0 {
            ForecastQuality::Good
        } else if self.mape < 20.0 {
            ForecastQuality::Fair
        } else if self.mape < 50.0 {
            ForecastQuality::Poor
        } else {
            ForecastQuality::VeryPoor
        }
    }

    /// At least one day of samples, MAPE under 20% and R² above 0.5
    pub fn is_reliable(&self) -> bool {
        self.mape < 20.0 && self.r2 > 0.5 && self.sample_count >= 24
    }
}

impl fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Metrics: MAE={:.3}, RMSE={:.3}, MAPE={:.2}%, R²={:.3}, Quality={:?}",
            self.mae,
            self.rmse,
            self.mape,
            self.r2,
            self.quality()
        )
    }
}

/// Forecast quality classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastQuality {
    Excellent,  // MAPE < 5%
    Good,       // MAPE 5-10%
    Fair,       // MAPE 10-20%
    Poor,       // MAPE 20-50%
    VeryPoor,   // MAPE > 50%
}
