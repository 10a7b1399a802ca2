//! Day-ahead walk-forward pricing simulation
//!
//! For every day in the window the forecaster is retrained on all hours
//! before that day, the next 24 hours are forecast, and the forecast shape
//! is turned into an hourly price index. Each risk scenario then prices the
//! day's actual demand, after applying its elasticity, against the flat
//! base price.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{check_scenario_names, RiskScenario, ScenarioResult, SimulationError, SimulationReport};
use crate::forecast::{DemandForecaster, ForecastError, ForecastPoint};
use crate::pricing::{hourly_price_index, PricedHour, PricingError};
use crate::series::HourlySeries;

const HOURS_PER_DAY: usize = 24;

/// First forecast day is the day after `forecast_start`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationWindow {
    pub forecast_start: NaiveDate,
    pub simulation_end: NaiveDate,
}

impl Default for SimulationWindow {
    fn default() -> Self {
        Self {
            forecast_start: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap_or(NaiveDate::MIN),
            simulation_end: NaiveDate::from_ymd_opt(2024, 9, 30).unwrap_or(NaiveDate::MIN),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Flat reference price per Wh-unit of the operator tariff
    pub base_price: f64,
    /// Width of the centered rolling window used for the price index
    pub window_hours: i64,
    /// Upper bound on days forecast concurrently
    pub max_parallel_days: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            base_price: 4.79,
            window_hours: 24,
            max_parallel_days: 4,
        }
    }
}

impl SimulationSettings {
    pub fn validate(&self) -> Result<(), PricingError> {
        if !(self.base_price.is_finite() && self.base_price > 0.0) {
            return Err(PricingError::InvalidBasePrice(self.base_price));
        }
        if self.window_hours < 1 {
            return Err(PricingError::InvalidWindow(self.window_hours));
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::hours(self.window_hours)
    }
}

/// Forecast for one simulated day, shared by all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayForecast {
    pub date: NaiveDate,
    /// Last hour of the training data
    pub trained_until: Option<NaiveDateTime>,
    pub hours: Vec<ForecastPoint>,
}

impl DayForecast {
    pub fn forecasted_energy(&self) -> f64 {
        self.hours.iter().map(|p| p.yhat).sum()
    }
}

/// One priced hour compared with what actually happened
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourOutcome {
    pub ts: NaiveDateTime,
    pub price_index: f64,
    pub actual_energy: f64,
    pub volume_delta: f64,
    pub revenue_with_dynamic_price: f64,
}

/// Daily outcome of one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDay {
    pub date: NaiveDate,
    pub forecasted_energy: f64,
    pub predicted_revenue: f64,
    /// None when the series holds no hours for this day
    pub actual_energy: Option<f64>,
    pub actual_revenue: Option<f64>,
    pub revenue_with_dynamic_price: f64,
    /// Relative revenue change vs the flat price, rounded to 2 decimals
    pub pct_diff: Option<f64>,
}

pub fn day_bounds(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(NaiveTime::MIN);
    (start, start + Duration::days(1))
}

/// Train on every hour strictly before `date` and forecast its 24 hours
pub fn forecast_one_day(
    series: &HourlySeries,
    date: NaiveDate,
    forecaster: &dyn DemandForecaster,
) -> Result<DayForecast, SimulationError> {
    let (start, _) = day_bounds(date);
    let training = series.before(start);
    debug!(%date, trained_until = ?training.last_ts(), points = training.len(), "training forecaster");

    let hours = forecaster
        .fit_and_predict(&training, start, HOURS_PER_DAY)
        .map_err(|source| SimulationError::Forecast { date, source })?;

    Ok(DayForecast {
        date,
        trained_until: training.last_ts(),
        hours,
    })
}

/// Price a day's forecast under `scenario`
pub fn price_forecast(
    forecast: &DayForecast,
    scenario: &RiskScenario,
    settings: &SimulationSettings,
) -> Result<Vec<PricedHour>, SimulationError> {
    let band = scenario.band()?;
    Ok(hourly_price_index(&forecast.hours, settings.window(), band)?)
}

/// Compare the priced forecast with the day's actual demand.
///
/// Hours are matched on timestamp; forecast hours without an actual value
/// contribute nothing to the dynamic revenue.
pub fn simulate_day(
    series: &HourlySeries,
    forecast: &DayForecast,
    scenario: &RiskScenario,
    settings: &SimulationSettings,
) -> Result<(ScenarioDay, Vec<HourOutcome>), SimulationError> {
    let priced = price_forecast(forecast, scenario, settings)?;
    let base_price = settings.base_price;

    let predicted_revenue: f64 = priced
        .iter()
        .map(|h| h.yhat * base_price * h.price_index)
        .sum();

    let (start, end) = day_bounds(forecast.date);
    let actual_hours = series.between(start, end);
    let actual_energy =
        (!actual_hours.is_empty()).then(|| actual_hours.iter().map(|p| p.value).sum::<f64>());
    let actual_revenue = actual_energy.map(|e| e * base_price);

    let outcomes: Vec<HourOutcome> = priced
        .iter()
        .filter_map(|h| {
            let actual = series.get(h.ts)?;
            let volume_delta = scenario.volume_delta(h.price_index, actual);
            Some(HourOutcome {
                ts: h.ts,
                price_index: h.price_index,
                actual_energy: actual,
                volume_delta,
                revenue_with_dynamic_price: (actual - volume_delta) * base_price * h.price_index,
            })
        })
        .collect();

    let revenue_with_dynamic_price: f64 =
        outcomes.iter().map(|o| o.revenue_with_dynamic_price).sum();

    let pct_diff = actual_revenue
        .filter(|r| *r != 0.0)
        .map(|r| round_to((revenue_with_dynamic_price - r) / r, 2));

    let day = ScenarioDay {
        date: forecast.date,
        forecasted_energy: forecast.forecasted_energy(),
        predicted_revenue,
        actual_energy,
        actual_revenue,
        revenue_with_dynamic_price,
        pct_diff,
    };

    debug!(
        scenario = %scenario.name,
        date = %day.date,
        forecasted_energy = day.forecasted_energy,
        predicted_revenue = day.predicted_revenue,
        actual_energy = ?day.actual_energy,
        dynamic_revenue = day.revenue_with_dynamic_price,
        pct_diff = ?day.pct_diff,
        "simulated day"
    );

    Ok((day, outcomes))
}

/// Days to simulate: from the day after `forecast_start` through the last
/// day with data, capped at `simulation_end`
pub fn simulation_days(series: &HourlySeries, window: &SimulationWindow) -> Vec<NaiveDate> {
    let Some(last_date) = series.last_date() else {
        return Vec::new();
    };
    let mut days = Vec::new();
    let mut current = window.forecast_start + Duration::days(1);
    while current <= last_date && current <= window.simulation_end {
        days.push(current);
        current += Duration::days(1);
    }
    days
}

/// Run the walk-forward simulation for every scenario.
///
/// Each day is forecast once on a blocking worker, at most
/// `max_parallel_days` at a time; the scenarios reuse that forecast.
/// Days the forecaster refuses for lack of history are skipped and listed
/// in [`SimulationReport::skipped_days`].
pub async fn simulate(
    series: Arc<HourlySeries>,
    forecaster: Arc<dyn DemandForecaster>,
    window: SimulationWindow,
    scenarios: &[RiskScenario],
    settings: &SimulationSettings,
) -> Result<SimulationReport, SimulationError> {
    settings.validate()?;
    if scenarios.is_empty() {
        return Err(SimulationError::NoScenarios);
    }
    check_scenario_names(scenarios)?;
    for scenario in scenarios {
        scenario.band()?;
    }
    if series.is_empty() {
        return Err(SimulationError::EmptySeries);
    }

    let days = simulation_days(&series, &window);
    info!(
        forecaster = forecaster.name(),
        days = days.len(),
        scenarios = scenarios.len(),
        first = ?days.first(),
        last = ?days.last(),
        "starting day-ahead simulation"
    );

    let limit = Arc::new(Semaphore::new(settings.max_parallel_days.max(1)));
    let mut tasks = JoinSet::new();
    for date in days {
        let permit = limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| SimulationError::Task(e.to_string()))?;
        let series = Arc::clone(&series);
        let forecaster = Arc::clone(&forecaster);
        tasks.spawn_blocking(move || {
            let _permit = permit;
            forecast_one_day(&series, date, forecaster.as_ref())
        });
    }

    let mut forecasts = Vec::new();
    let mut skipped_days = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined.map_err(|e| SimulationError::Task(e.to_string()))? {
            Ok(forecast) => {
                info!(
                    date = %forecast.date,
                    forecasted_energy = forecast.forecasted_energy(),
                    "forecast ready"
                );
                forecasts.push(forecast);
            }
            Err(SimulationError::Forecast {
                date,
                source: source @ ForecastError::InsufficientHistory { .. },
            }) => {
                warn!(%date, error = %source, "skipping day without enough history");
                skipped_days.push(date);
            }
            Err(e) => return Err(e),
        }
    }
    forecasts.sort_by_key(|f| f.date);
    skipped_days.sort();

    let mut results = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let mut days = Vec::with_capacity(forecasts.len());
        let mut hours = Vec::with_capacity(forecasts.len() * HOURS_PER_DAY);
        for forecast in &forecasts {
            let (day, outcomes) = simulate_day(&series, forecast, scenario, settings)?;
            days.push(day);
            hours.extend(outcomes);
        }
        let result = ScenarioResult {
            scenario: scenario.clone(),
            days,
            hours,
        };
        let totals = result.totals();
        info!(
            scenario = %scenario.name,
            actual_revenue = totals.actual_revenue,
            dynamic_revenue = totals.revenue_with_dynamic_price,
            pct_diff = totals.pct_diff,
            "scenario complete"
        );
        results.push(result);
    }

    info!("simulation completed");
    Ok(SimulationReport {
        forecaster: forecaster.name().to_string(),
        base_price: settings.base_price,
        window,
        forecasts,
        skipped_days,
        scenarios: results,
    })
}

/// Rounds half to even, like Python's `round`
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{MockDemandForecaster, SeasonalProfileForecaster};
    use crate::series::HourlyPoint;
    use crate::simulation::ScenarioNameError;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn flat_series(days: i64, value: f64) -> HourlySeries {
        let start = day_bounds(date(1)).0;
        let points = (0..days * 24)
            .map(|h| HourlyPoint::new(start + Duration::hours(h), value))
            .collect();
        HourlySeries::from_points(points).unwrap()
    }

    fn forecast_for(d: NaiveDate, values: &[f64]) -> DayForecast {
        let (start, _) = day_bounds(d);
        DayForecast {
            date: d,
            trained_until: Some(start - Duration::hours(1)),
            hours: values
                .iter()
                .enumerate()
                .map(|(h, &yhat)| ForecastPoint {
                    ts: start + Duration::hours(h as i64),
                    yhat,
                })
                .collect(),
        }
    }

    #[test]
    fn test_simulation_days_window() {
        let series = flat_series(10, 1.0);
        let window = SimulationWindow {
            forecast_start: date(3),
            simulation_end: date(30),
        };
        // data ends on June 10th
        let days = simulation_days(&series, &window);
        assert_eq!(days.first(), Some(&date(4)));
        assert_eq!(days.last(), Some(&date(10)));
        assert_eq!(days.len(), 7);

        let capped = SimulationWindow {
            forecast_start: date(3),
            simulation_end: date(5),
        };
        assert_eq!(simulation_days(&series, &capped), vec![date(4), date(5)]);
    }

    #[test]
    fn test_flat_forecast_prices_at_midpoint() {
        let series = flat_series(3, 100.0);
        let forecast = forecast_for(date(2), &[100.0; 24]);
        let scenario = RiskScenario::new("flat", 0.8, 1.2, 0.1);
        let settings = SimulationSettings::default();

        let (day, hours) = simulate_day(&series, &forecast, &scenario, &settings).unwrap();

        assert_eq!(hours.len(), 24);
        assert_eq!(day.actual_energy, Some(2_400.0));
        assert!((day.actual_revenue.unwrap() - 2_400.0 * 4.79).abs() < 1e-9);
        // index 1.0 everywhere: no volume shift, revenue unchanged
        assert!((day.revenue_with_dynamic_price - day.actual_revenue.unwrap()).abs() < 1e-6);
        assert_eq!(day.pct_diff, Some(0.0));
        assert!((day.predicted_revenue - 2_400.0 * 4.79).abs() < 1e-6);
    }

    #[test]
    fn test_elasticity_adjusts_realized_volume() {
        let series = flat_series(3, 100.0);
        let mut values = [100.0; 24];
        values[18] = 500.0;
        let forecast = forecast_for(date(2), &values);
        let scenario = RiskScenario::baseline();
        let settings = SimulationSettings::default();

        let (_, hours) = simulate_day(&series, &forecast, &scenario, &settings).unwrap();

        let peak = hours[18];
        assert!((peak.price_index - 1.4).abs() < 1e-9);
        // (1.4 - 1) * 100 * 0.1 = 4 Wh lost
        assert!((peak.volume_delta - 4.0).abs() < 1e-9);
        assert!((peak.revenue_with_dynamic_price - 96.0 * 4.79 * 1.4).abs() < 1e-9);

        let trough = hours[17];
        assert!((trough.price_index - 0.6).abs() < 1e-9);
        assert!((trough.volume_delta + 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_day_without_actuals() {
        let series = flat_series(2, 100.0);
        let forecast = forecast_for(date(5), &[100.0; 24]);

        let (day, hours) = simulate_day(
            &series,
            &forecast,
            &RiskScenario::baseline(),
            &SimulationSettings::default(),
        )
        .unwrap();

        assert!(hours.is_empty());
        assert_eq!(day.actual_energy, None);
        assert_eq!(day.actual_revenue, None);
        assert_eq!(day.pct_diff, None);
        assert_eq!(day.revenue_with_dynamic_price, 0.0);
    }

    #[test]
    fn test_zero_actual_revenue_has_no_pct_diff() {
        let series = flat_series(3, 0.0);
        let forecast = forecast_for(date(2), &[10.0; 24]);

        let (day, _) = simulate_day(
            &series,
            &forecast,
            &RiskScenario::baseline(),
            &SimulationSettings::default(),
        )
        .unwrap();

        assert_eq!(day.actual_energy, Some(0.0));
        assert_eq!(day.pct_diff, None);
    }

    #[test]
    fn test_forecast_one_day_trains_strictly_before_day() {
        let series = flat_series(5, 10.0);
        let mut mock = MockDemandForecaster::new();
        mock.expect_fit_and_predict()
            .withf(|history, start, hours| {
                history.last_ts() == Some(day_bounds(date(3)).0 - Duration::hours(1))
                    && *start == day_bounds(date(3)).0
                    && *hours == 24
            })
            .times(1)
            .returning(|_, start, hours| {
                Ok((0..hours as i64)
                    .map(|h| ForecastPoint {
                        ts: start + Duration::hours(h),
                        yhat: 1.0,
                    })
                    .collect())
            });

        let forecast = forecast_one_day(&series, date(3), &mock).unwrap();
        assert_eq!(forecast.forecasted_energy(), 24.0);
        assert_eq!(forecast.trained_until, Some(day_bounds(date(3)).0 - Duration::hours(1)));
    }

    #[test]
    fn test_forecast_error_names_the_day() {
        let series = flat_series(5, 10.0);
        let mut mock = MockDemandForecaster::new();
        mock.expect_fit_and_predict()
            .returning(|_, _, _| Err(ForecastError::EmptyData));

        let err = forecast_one_day(&series, date(2), &mock).unwrap_err();
        assert!(matches!(err, SimulationError::Forecast { date: d, .. } if d == date(2)));
    }

    #[tokio::test]
    async fn test_simulate_shares_forecasts_across_scenarios() {
        let series = Arc::new(flat_series(10, 50.0));
        let mut mock = MockDemandForecaster::new();
        mock.expect_name().return_const("mock");
        // one fit per day, regardless of scenario count
        mock.expect_fit_and_predict()
            .times(7)
            .returning(|_, start, hours| {
                Ok((0..hours as i64)
                    .map(|h| ForecastPoint {
                        ts: start + Duration::hours(h),
                        yhat: 50.0 + h as f64,
                    })
                    .collect())
            });

        let window = SimulationWindow {
            forecast_start: date(3),
            simulation_end: date(30),
        };
        let settings = SimulationSettings {
            max_parallel_days: 2,
            ..Default::default()
        };

        let report = simulate(
            series,
            Arc::new(mock),
            window,
            &RiskScenario::risk_ladder(),
            &settings,
        )
        .await
        .unwrap();

        assert_eq!(report.scenarios.len(), 3);
        assert_eq!(report.forecasts.len(), 7);
        for result in &report.scenarios {
            let dates: Vec<NaiveDate> = result.days.iter().map(|d| d.date).collect();
            assert_eq!(dates, (4..=10).map(date).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn test_simulate_skips_days_with_short_history() {
        // data starts four days before the first forecast day
        let start = NaiveDate::from_ymd_opt(2024, 5, 28).unwrap().and_time(NaiveTime::MIN);
        let points = (0..14 * 24)
            .map(|h| HourlyPoint::new(start + Duration::hours(h), 10.0 + (h % 24) as f64))
            .collect();
        let series = Arc::new(HourlySeries::from_points(points).unwrap());

        let report = simulate(
            series,
            Arc::new(SeasonalProfileForecaster::default()),
            SimulationWindow::default(),
            &RiskScenario::risk_ladder(),
            &SimulationSettings::default(),
        )
        .await
        .unwrap();

        // a week of history is available from June 4th
        assert_eq!(report.skipped_days, vec![date(1), date(2), date(3)]);
        assert_eq!(report.forecasts.first().map(|f| f.date), Some(date(4)));
        assert_eq!(report.forecasts.last().map(|f| f.date), Some(date(10)));
        for result in &report.scenarios {
            assert_eq!(result.days.len(), 7);
            assert_eq!(result.hours.len(), 7 * 24);
        }
    }

    #[tokio::test]
    async fn test_simulate_fails_on_other_forecast_errors() {
        let mut mock = MockDemandForecaster::new();
        mock.expect_name().return_const("mock");
        mock.expect_fit_and_predict()
            .returning(|_, _, _| Err(ForecastError::EmptyData));

        let window = SimulationWindow {
            forecast_start: date(3),
            simulation_end: date(5),
        };
        let err = simulate(
            Arc::new(flat_series(10, 1.0)),
            Arc::new(mock),
            window,
            &[RiskScenario::baseline()],
            &SimulationSettings::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SimulationError::Forecast { source: ForecastError::EmptyData, .. }));
    }

    #[tokio::test]
    async fn test_simulate_rejects_clashing_scenario_names() {
        let forecaster: Arc<dyn DemandForecaster> = Arc::new(MockDemandForecaster::new());
        let scenarios = vec![
            RiskScenario::new("x", 0.9, 1.1, 0.1),
            RiskScenario::new("x", 0.8, 1.2, 0.05),
        ];
        let err = simulate(
            Arc::new(flat_series(3, 1.0)),
            forecaster.clone(),
            SimulationWindow::default(),
            &scenarios,
            &SimulationSettings::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            SimulationError::ScenarioName(ScenarioNameError::Duplicate(ref n)) if n == "x"
        ));

        let err = simulate(
            Arc::new(flat_series(3, 1.0)),
            forecaster,
            SimulationWindow::default(),
            &[RiskScenario::new("../x", 0.9, 1.1, 0.1)],
            &SimulationSettings::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            SimulationError::ScenarioName(ScenarioNameError::NotAFileName(_))
        ));
    }

    #[tokio::test]
    async fn test_simulate_rejects_empty_inputs() {
        let forecaster: Arc<dyn DemandForecaster> = Arc::new(MockDemandForecaster::new());
        let err = simulate(
            Arc::new(HourlySeries::empty()),
            forecaster.clone(),
            SimulationWindow::default(),
            &[RiskScenario::baseline()],
            &SimulationSettings::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SimulationError::EmptySeries));

        let err = simulate(
            Arc::new(flat_series(3, 1.0)),
            forecaster,
            SimulationWindow::default(),
            &[],
            &SimulationSettings::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SimulationError::NoScenarios));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.12345, 2), 0.12);
        assert_eq!(round_to(-0.125_1, 2), -0.13);
        assert_eq!(round_to(0.123456, 4), 0.1235);
        // exact ties go to the even neighbour
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(0.375, 2), 0.38);
        assert_eq!(round_to(-2.5, 0), -2.0);
    }
}
