//! # Dynamic Pricing Simulation
//!
//! Walk-forward simulation of a day-ahead dynamic tariff.
//!
//! ## Components
//!
//! - **Scenario**: price band and demand elasticity assumed for a run
//! - **Walk-forward**: per-day retrain, forecast, price index and revenue
//! - **Report**: per-scenario totals, monthly summary and file outputs
//! - **Synth**: seeded synthetic charging sessions for demos and tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ev_dynamic_pricing::forecast::SeasonalProfileForecaster;
//! use ev_dynamic_pricing::series::HourlySeries;
//! use ev_dynamic_pricing::simulation::{
//!     simulate, RiskScenario, SimulationSettings, SimulationWindow,
//! };
//!
//! # async fn run(series: HourlySeries) -> Result<(), Box<dyn std::error::Error>> {
//! let report = simulate(
//!     Arc::new(series),
//!     Arc::new(SeasonalProfileForecaster::default()),
//!     SimulationWindow::default(),
//!     &RiskScenario::risk_ladder(),
//!     &SimulationSettings::default(),
//! )
//! .await?;
//! println!("{}", report.totals_table());
//! # Ok(())
//! # }
//! ```

use chrono::NaiveDate;
use thiserror::Error;

use crate::forecast::ForecastError;
use crate::pricing::PricingError;

pub mod report;
pub mod scenario;
pub mod synth;
pub mod walk_forward;

pub use report::*;
pub use scenario::*;
pub use synth::*;
pub use walk_forward::*;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Forecast for {date} failed: {source}")]
    Forecast {
        date: NaiveDate,
        #[source]
        source: ForecastError,
    },

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    ScenarioName(#[from] ScenarioNameError),

    #[error("No scenarios to simulate")]
    NoScenarios,

    #[error("Demand series is empty")]
    EmptySeries,

    #[error("Simulation task failed: {0}")]
    Task(String),

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
}
