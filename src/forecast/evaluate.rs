//! Train/test evaluation of a forecaster on a single split date

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use super::{DemandForecaster, ForecastError, ForecastMetrics, Season, TimeFeatures};
use crate::series::HourlySeries;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub forecaster: String,
    pub split: NaiveDateTime,
    pub train_points: usize,
    pub test_points: usize,
    pub metrics: ForecastMetrics,
    /// Mean absolute error per season of the test period
    pub mae_by_season: BTreeMap<Season, f64>,
    /// Mean absolute error per day of week (0=Monday)
    pub mae_by_weekday: BTreeMap<u32, f64>,
}

/// Fit on every point at or before `split` and forecast the rest of the series
pub fn evaluate_split(
    series: &HourlySeries,
    split: NaiveDateTime,
    forecaster: &dyn DemandForecaster,
) -> Result<EvaluationReport, ForecastError> {
    let train = series.up_to(split);
    let test: Vec<_> = series
        .points()
        .iter()
        .filter(|p| p.ts > split)
        .copied()
        .collect();

    let Some(first_test) = test.first() else {
        return Err(ForecastError::EmptyData);
    };

    info!(
        forecaster = forecaster.name(),
        train = train.len(),
        test = test.len(),
        %split,
        "evaluating forecaster"
    );

    let forecast = forecaster.fit_and_predict(&train, first_test.ts, test.len())?;
    let actual: Vec<f64> = test.iter().map(|p| p.value).collect();
    let predicted: Vec<f64> = forecast.iter().map(|p| p.yhat).collect();
    let metrics = ForecastMetrics::calculate(&actual, &predicted)?;

    let mut by_season: BTreeMap<Season, (f64, usize)> = BTreeMap::new();
    let mut by_weekday: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for (p, yhat) in test.iter().zip(predicted.iter()) {
        let f = TimeFeatures::from_timestamp(p.ts);
        let err = (p.value - yhat).abs();
        let s = by_season.entry(f.season).or_default();
        s.0 += err;
        s.1 += 1;
        let w = by_weekday.entry(f.day_of_week).or_default();
        w.0 += err;
        w.1 += 1;
    }

    info!(%metrics, "evaluation complete");

    Ok(EvaluationReport {
        forecaster: forecaster.name().to_string(),
        split,
        train_points: train.len(),
        test_points: test.len(),
        metrics,
        mae_by_season: mean_of(by_season),
        mae_by_weekday: mean_of(by_weekday),
    })
}

fn mean_of<K: Ord>(acc: BTreeMap<K, (f64, usize)>) -> BTreeMap<K, f64> {
    acc.into_iter()
        .map(|(k, (sum, n))| (k, sum / n as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{MockDemandForecaster, ForecastPoint, SeasonalProfileForecaster};
    use crate::series::HourlyPoint;
    use chrono::{Duration, NaiveDate, Timelike};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn daily_pattern(days: i64) -> HourlySeries {
        let points = (0..days * 24)
            .map(|h| {
                let ts = start() + Duration::hours(h);
                let v = if ts.hour() >= 16 { 2_000.0 } else { 400.0 };
                HourlyPoint::new(ts, v)
            })
            .collect();
        HourlySeries::from_points(points).unwrap()
    }

    #[test]
    fn test_evaluate_split_on_regular_pattern() {
        let series = daily_pattern(42);
        let split = start() + Duration::days(35) - Duration::hours(1);

        let report =
            evaluate_split(&series, split, &SeasonalProfileForecaster::default()).unwrap();

        assert_eq!(report.train_points, 35 * 24);
        assert_eq!(report.test_points, 7 * 24);
        assert!(report.metrics.mape < 1e-6);
        assert_eq!(report.mae_by_weekday.len(), 7);
        assert_eq!(report.mae_by_season.len(), 1);
    }

    #[test]
    fn test_evaluate_split_trains_only_on_past() {
        let series = daily_pattern(10);
        let split = start() + Duration::days(8);

        let mut mock = MockDemandForecaster::new();
        mock.expect_name().return_const("mock");
        mock.expect_fit_and_predict()
            .withf(move |history, from, hours| {
                history.last_ts() == Some(split)
                    && *from == split + Duration::hours(1)
                    && *hours == 47
            })
            .times(1)
            .returning(|_, from, hours| {
                Ok((0..hours as i64)
                    .map(|h| ForecastPoint {
                        ts: from + Duration::hours(h),
                        yhat: 0.0,
                    })
                    .collect())
            });

        let report = evaluate_split(&series, split, &mock).unwrap();
        assert_eq!(report.forecaster, "mock");
        assert_eq!(report.metrics.sample_count, 47);
    }

    #[test]
    fn test_evaluate_split_without_test_data() {
        let series = daily_pattern(10);
        let split = start() + Duration::days(30);
        let err = evaluate_split(&series, split, &SeasonalProfileForecaster::default()).unwrap_err();
        assert_eq!(err, ForecastError::EmptyData);
    }
}
