//! In-house demand forecasters
//!
//! Both models are deliberately simple; anything implementing
//! [`DemandForecaster`] can replace them in the pricing simulation.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_horizon, DemandForecaster, ForecastError, ForecastPoint, TimeFeatures};
use crate::series::HourlySeries;

const HOURS_PER_DAY: usize = 24;
const HOURS_PER_WEEK: usize = 168;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalProfileConfig {
    /// Days of history the profile is estimated from
    pub lookback_days: usize,
    /// Refuse to forecast with less history than this
    pub min_history_days: usize,
    /// Days used for the current demand level
    pub recent_days: usize,
    /// Share of the hour-of-week profile vs the hour-of-day profile (0.0-1.0)
    pub weekly_weight: f64,
}

impl Default for SeasonalProfileConfig {
    fn default() -> Self {
        Self {
            lookback_days: 28,
            min_history_days: 7,
            recent_days: 7,
            weekly_weight: 0.5,
        }
    }
}

/// Multiplicative seasonal model: a recent demand level scaled by blended
/// hour-of-day and hour-of-week factors.
#[derive(Debug, Clone, Default)]
pub struct SeasonalProfileForecaster {
    config: SeasonalProfileConfig,
}

/// Fitted profile, valid for any future timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalProfile {
    pub level: f64,
    pub daily_factors: [f64; HOURS_PER_DAY],
    pub weekly_factors: Vec<f64>,
    pub weekly_weight: f64,
}

impl SeasonalProfile {
    pub fn predict(&self, ts: NaiveDateTime) -> f64 {
        let f = TimeFeatures::from_timestamp(ts);
        let daily = self.daily_factors[f.hour as usize];
        let weekly = self.weekly_factors[f.hour_of_week()];
        let factor = (1.0 - self.weekly_weight) * daily + self.weekly_weight * weekly;
        (self.level * factor).max(0.0)
    }
}

impl SeasonalProfileForecaster {
    pub fn new(config: SeasonalProfileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SeasonalProfileConfig {
        &self.config
    }

    pub fn fit(&self, history: &HourlySeries) -> Result<SeasonalProfile, ForecastError> {
        let needed = self.config.min_history_days.max(1) * HOURS_PER_DAY;
        if history.len() < needed {
            return Err(ForecastError::InsufficientHistory {
                needed,
                got: history.len(),
            });
        }

        let points = history.points();
        let lookback = (self.config.lookback_days.max(1) * HOURS_PER_DAY).min(points.len());
        let window = &points[points.len() - lookback..];

        let mut daily_sum = [0.0; HOURS_PER_DAY];
        let mut daily_count = [0usize; HOURS_PER_DAY];
        let mut weekly_sum = vec![0.0; HOURS_PER_WEEK];
        let mut weekly_count = vec![0usize; HOURS_PER_WEEK];
        let mut total = 0.0;

        for p in window {
            let f = TimeFeatures::from_timestamp(p.ts);
            daily_sum[f.hour as usize] += p.value;
            daily_count[f.hour as usize] += 1;
            weekly_sum[f.hour_of_week()] += p.value;
            weekly_count[f.hour_of_week()] += 1;
            total += p.value;
        }

        let window_mean = total / window.len() as f64;
        let recent = (self.config.recent_days.max(1) * HOURS_PER_DAY).min(window.len());
        let level = window[window.len() - recent..]
            .iter()
            .map(|p| p.value)
            .sum::<f64>()
            / recent as f64;

        let factor = |sum: f64, count: usize| -> Option<f64> {
            (count > 0 && window_mean > 0.0).then(|| sum / count as f64 / window_mean)
        };

        let mut daily_factors = [0.0; HOURS_PER_DAY];
        for h in 0..HOURS_PER_DAY {
            daily_factors[h] = factor(daily_sum[h], daily_count[h]).unwrap_or(0.0);
        }
        let weekly_factors = (0..HOURS_PER_WEEK)
            .map(|s| {
                factor(weekly_sum[s], weekly_count[s])
                    .unwrap_or(daily_factors[s % HOURS_PER_DAY])
            })
            .collect();

        debug!(level, window_mean, lookback, "fitted seasonal profile");

        Ok(SeasonalProfile {
            level,
            daily_factors,
            weekly_factors,
            weekly_weight: self.config.weekly_weight.clamp(0.0, 1.0),
        })
    }
}

impl DemandForecaster for SeasonalProfileForecaster {
    fn name(&self) -> &'static str {
        "seasonal-profile"
    }

    fn fit_and_predict(
        &self,
        history: &HourlySeries,
        start: NaiveDateTime,
        hours: usize,
    ) -> Result<Vec<ForecastPoint>, ForecastError> {
        check_horizon(start, hours)?;
        let profile = self.fit(history)?;
        Ok(hourly_range(start, hours)
            .map(|ts| ForecastPoint {
                ts,
                yhat: profile.predict(ts),
            })
            .collect())
    }
}

/// Repeats the value observed one season earlier
#[derive(Debug, Clone)]
pub struct SeasonalNaiveForecaster {
    period_hours: usize,
}

impl Default for SeasonalNaiveForecaster {
    fn default() -> Self {
        Self {
            period_hours: HOURS_PER_WEEK,
        }
    }
}

impl SeasonalNaiveForecaster {
    pub fn new(period_hours: usize) -> Self {
        Self {
            period_hours: period_hours.max(1),
        }
    }
}

impl DemandForecaster for SeasonalNaiveForecaster {
    fn name(&self) -> &'static str {
        "seasonal-naive"
    }

    fn fit_and_predict(
        &self,
        history: &HourlySeries,
        start: NaiveDateTime,
        hours: usize,
    ) -> Result<Vec<ForecastPoint>, ForecastError> {
        check_horizon(start, hours)?;
        if history.len() < self.period_hours {
            return Err(ForecastError::InsufficientHistory {
                needed: self.period_hours,
                got: history.len(),
            });
        }
        let (Some(first), Some(last)) = (history.first_ts(), history.last_ts()) else {
            return Err(ForecastError::EmptyData);
        };

        let period = Duration::hours(self.period_hours as i64);
        hourly_range(start, hours)
            .map(|ts| {
                let mut candidate = ts - period;
                while candidate > last {
                    candidate -= period;
                }
                if candidate < first {
                    return Err(ForecastError::InsufficientHistory {
                        needed: self.period_hours,
                        got: history.len(),
                    });
                }
                let yhat = history.get(candidate).unwrap_or(0.0).max(0.0);
                Ok(ForecastPoint { ts, yhat })
            })
            .collect()
    }
}

pub(crate) fn hourly_range(start: NaiveDateTime, hours: usize) -> impl Iterator<Item = NaiveDateTime> {
    (0..hours as i64).map(move |h| start + Duration::hours(h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::HourlyPoint;
    use chrono::{Datelike, NaiveDate, Timelike};

    fn start() -> NaiveDateTime {
        // Monday
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn series_from(days: i64, f: impl Fn(NaiveDateTime) -> f64) -> HourlySeries {
        let points = (0..days * 24)
            .map(|h| {
                let ts = start() + Duration::hours(h);
                HourlyPoint::new(ts, f(ts))
            })
            .collect();
        HourlySeries::from_points(points).unwrap()
    }

    #[test]
    fn test_constant_series_forecasts_constant() {
        let history = series_from(14, |_| 500.0);
        let forecaster = SeasonalProfileForecaster::default();
        let next = start() + Duration::days(14);

        let fcst = forecaster.fit_and_predict(&history, next, 24).unwrap();

        assert_eq!(fcst.len(), 24);
        assert_eq!(fcst[0].ts, next);
        assert_eq!(fcst[23].ts, next + Duration::hours(23));
        for p in fcst {
            assert!((p.yhat - 500.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_daily_shape_is_recovered() {
        let history = series_from(21, |ts| if (8..18).contains(&ts.hour()) { 1_000.0 } else { 100.0 });
        let forecaster = SeasonalProfileForecaster::default();
        let next = start() + Duration::days(21);

        let fcst = forecaster.fit_and_predict(&history, next, 24).unwrap();

        assert!((fcst[12].yhat - 1_000.0).abs() < 1e-6);
        assert!((fcst[3].yhat - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_weekly_factor_blends_linearly_with_daily() {
        // flat within each day: weekdays 100, weekends 300
        let history = series_from(28, |ts| if ts.weekday().number_from_monday() > 5 { 300.0 } else { 100.0 });
        let next = start() + Duration::days(28);
        let saturday_noon = 5 * 24 + 12;
        let mean = (5.0 * 100.0 + 2.0 * 300.0) / 7.0;

        let blended = SeasonalProfileForecaster::default()
            .fit_and_predict(&history, next, 168)
            .unwrap();
        // level * ((1 - w) * 1.0 + w * 300 / mean) with w = 0.5
        assert!((blended[saturday_noon].yhat - (0.5 * mean + 0.5 * 300.0)).abs() < 1e-6);

        let weekly_only = SeasonalProfileForecaster::new(SeasonalProfileConfig {
            weekly_weight: 1.0,
            ..Default::default()
        })
        .fit_and_predict(&history, next, 168)
        .unwrap();
        assert!((weekly_only[saturday_noon].yhat - 300.0).abs() < 1e-6);
        assert!((weekly_only[12].yhat - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_history_forecasts_zero() {
        let history = series_from(8, |_| 0.0);
        let fcst = SeasonalProfileForecaster::default()
            .fit_and_predict(&history, start() + Duration::days(8), 24)
            .unwrap();
        assert!(fcst.iter().all(|p| p.yhat == 0.0));
    }

    #[test]
    fn test_insufficient_history() {
        let history = series_from(3, |_| 1.0);
        let err = SeasonalProfileForecaster::default()
            .fit_and_predict(&history, start() + Duration::days(3), 24)
            .unwrap_err();
        assert_eq!(err, ForecastError::InsufficientHistory { needed: 168, got: 72 });
    }

    #[test]
    fn test_invalid_horizon() {
        let history = series_from(8, |_| 1.0);
        let forecaster = SeasonalProfileForecaster::default();

        let err = forecaster
            .fit_and_predict(&history, start() + Duration::minutes(30), 24)
            .unwrap_err();
        assert!(matches!(err, ForecastError::InvalidHorizon(_)));

        let err = forecaster.fit_and_predict(&history, start(), 0).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidHorizon(_)));
    }

    #[test]
    fn test_seasonal_naive_repeats_last_week() {
        let history = series_from(14, |ts| (ts.hour() * 10) as f64 + (ts.day() as f64) / 100.0);
        let forecaster = SeasonalNaiveForecaster::default();
        let next = start() + Duration::days(14);

        let fcst = forecaster.fit_and_predict(&history, next, 24).unwrap();

        for p in &fcst {
            let expected = history.get(p.ts - Duration::days(7)).unwrap();
            assert_eq!(p.yhat, expected);
        }
    }

    #[test]
    fn test_seasonal_naive_skips_gap_after_history() {
        let history = series_from(7, |ts| ts.hour() as f64);
        let forecaster = SeasonalNaiveForecaster::default();
        // three weeks past the end of history
        let target = start() + Duration::days(21) + Duration::hours(5);

        let fcst = forecaster.fit_and_predict(&history, target, 1).unwrap();
        assert_eq!(fcst[0].yhat, 5.0);
    }
}
