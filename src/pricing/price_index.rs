use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{PriceBand, PricingError};
use crate::forecast::ForecastPoint;

/// One forecast hour with its price multiplier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricedHour {
    pub ts: NaiveDateTime,
    pub yhat: f64,
    /// Rolling min of `yhat` over the centered window
    pub ymin: f64,
    /// Rolling max of `yhat` over the centered window
    pub ymax: f64,
    pub price_index: f64,
}

/// Map `y` from `[ymin, ymax]` onto `[scale_min, scale_max]`.
///
/// A flat range (`ymax == ymin`) has no shape to price, so the band midpoint
/// is returned.
pub fn linear_scale_value(y: f64, ymin: f64, ymax: f64, scale_min: f64, scale_max: f64) -> f64 {
    if ymax == ymin {
        return (scale_min + scale_max) / 2.0;
    }
    (y - ymin) / (ymax - ymin) * (scale_max - scale_min) + scale_min
}

/// Price index for each hour of a forecast.
///
/// For the hour at `t` the forecast is normalised against the min and max
/// of all forecast hours in the centered window `(t - window/2, t + window/2]`.
/// Only the hours passed in take part, so the window is truncated at the
/// edges of the forecast day.
pub fn hourly_price_index(
    forecast: &[ForecastPoint],
    window: Duration,
    band: PriceBand,
) -> Result<Vec<PricedHour>, PricingError> {
    if window < Duration::hours(1) {
        return Err(PricingError::InvalidWindow(window.num_hours()));
    }
    let half = window / 2;

    let priced = forecast
        .iter()
        .map(|point| {
            let lower = point.ts - half;
            let upper = point.ts + half;
            let (ymin, ymax) = forecast
                .iter()
                .filter(|p| p.ts > lower && p.ts <= upper)
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                    (lo.min(p.yhat), hi.max(p.yhat))
                });
            let index =
                linear_scale_value(point.yhat, ymin, ymax, band.scale_min, band.scale_max);

            PricedHour {
                ts: point.ts,
                yhat: point.yhat,
                ymin,
                ymax,
                price_index: index.clamp(band.scale_min, band.scale_max),
            }
        })
        .collect();

    Ok(priced)
}
