//! EV charger demand forecasting and day-ahead dynamic pricing simulation.
//!
//! Sessions and status streams are ingested into hourly demand series, a
//! [`forecast::DemandForecaster`] predicts the next day, and
//! [`simulation::simulate`] prices that forecast under several risk
//! scenarios against a flat tariff.

pub mod config;
pub mod domain;
pub mod forecast;
pub mod ingest;
pub mod pricing;
pub mod series;
pub mod simulation;
pub mod telemetry;
