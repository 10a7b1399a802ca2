#![cfg(test)]
//! Load Testing Suite
//!
//! Key Performance Requirements:
//! - A full May-September season with three scenarios finishes in seconds
//! - Parallel day workers produce the same report as a single worker

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;

use ev_dynamic_pricing::forecast::SeasonalProfileForecaster;
use ev_dynamic_pricing::series::{hourly_energy, HourlySeries};
use ev_dynamic_pricing::simulation::{
    simulate, RiskScenario, SessionGenerator, SimulationSettings, SimulationWindow, SynthConfig,
};

fn year_of_demand() -> HourlySeries {
    let sessions = SessionGenerator::new(SynthConfig {
        start: NaiveDate::from_ymd_opt(2023, 10, 1).unwrap(),
        days: 366,
        sessions_per_day: 80.0,
        random_seed: Some(2024),
        ..Default::default()
    })
    .unwrap()
    .generate();
    hourly_energy(&sessions).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn stress_full_season_simulation() {
    let series = Arc::new(year_of_demand());
    let settings = SimulationSettings {
        max_parallel_days: 8,
        ..Default::default()
    };

    let started = Instant::now();
    let report = simulate(
        series,
        Arc::new(SeasonalProfileForecaster::default()),
        SimulationWindow::default(),
        &RiskScenario::risk_ladder(),
        &settings,
    )
    .await
    .unwrap();
    let elapsed = started.elapsed();

    println!("Simulated {} days in {:?}", report.forecasts.len(), elapsed);
    println!("{}", report.totals_table());

    // 2024-06-01 ..= 2024-09-30
    assert_eq!(report.forecasts.len(), 122);
    assert!(elapsed.as_secs() < 30, "season took {elapsed:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn stress_parallelism_does_not_change_results() {
    let series = Arc::new(year_of_demand());
    let run = |parallel: usize| {
        let series = series.clone();
        async move {
            simulate(
                series,
                Arc::new(SeasonalProfileForecaster::default()),
                SimulationWindow::default(),
                &RiskScenario::risk_ladder(),
                &SimulationSettings {
                    max_parallel_days: parallel,
                    ..Default::default()
                },
            )
            .await
            .unwrap()
        }
    };

    let serial = run(1).await;
    let parallel = run(16).await;

    assert_eq!(serial.totals(), parallel.totals());
    assert_eq!(serial.monthly_summary(), parallel.monthly_summary());
}
