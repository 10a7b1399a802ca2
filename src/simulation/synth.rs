//! # Synthetic Charging Sessions
//!
//! Seeded generator of public-charger sessions with a realistic demand
//! shape: a morning and an evening arrival peak, quieter weekends and a
//! normally distributed energy per session. Arrivals per hour are Poisson.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Poisson};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::domain::ChargingSession;

#[derive(Debug, Error, PartialEq)]
pub enum SynthError {
    #[error("Invalid generator parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    /// First generated day
    pub start: NaiveDate,

    /// Number of days to generate
    pub days: u32,

    /// Mean sessions per weekday
    pub sessions_per_day: f64,

    /// Demand multiplier applied on Saturdays and Sundays
    pub weekend_factor: f64,

    /// Mean energy delivered per session (Wh)
    pub mean_energy_wh: f64,

    /// Std dev of energy per session (Wh)
    pub energy_std_wh: f64,

    /// Mean plug-in duration (minutes)
    pub mean_duration_min: f64,

    /// Random seed for reproducibility (None = random)
    pub random_seed: Option<u64>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN),
            days: 270,
            sessions_per_day: 24.0,
            weekend_factor: 0.7,
            mean_energy_wh: 12_000.0, // ~12 kWh per top-up
            energy_std_wh: 4_000.0,
            mean_duration_min: 45.0,
            random_seed: Some(42),
        }
    }
}

/// Share of a day's arrivals per hour of day. Sums to 1.
pub fn arrival_profile() -> [f64; 24] {
    let bump = |h: f64, center: f64, width: f64| (-((h - center) / width).powi(2)).exp();

    let mut weights = [0.0; 24];
    for (h, w) in weights.iter_mut().enumerate() {
        let h = h as f64 + 0.5;
        // Overnight floor, commute peak, afternoon/evening peak
        *w = 0.05 + 0.8 * bump(h, 8.0, 2.0) + 1.0 * bump(h, 17.5, 2.5);
    }

    let total: f64 = weights.iter().sum();
    weights.iter_mut().for_each(|w| *w /= total);
    weights
}

pub struct SessionGenerator {
    config: SynthConfig,
    rng: StdRng,
    profile: [f64; 24],
    energy: Normal<f64>,
    duration: Normal<f64>,
}

impl SessionGenerator {
    pub fn new(config: SynthConfig) -> Result<Self, SynthError> {
        for (name, value) in [
            ("sessions_per_day", config.sessions_per_day),
            ("weekend_factor", config.weekend_factor),
            ("mean_energy_wh", config.mean_energy_wh),
            ("mean_duration_min", config.mean_duration_min),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SynthError::InvalidParameter { name, value });
            }
        }

        let energy = Normal::new(config.mean_energy_wh, config.energy_std_wh).map_err(|_| {
            SynthError::InvalidParameter {
                name: "energy_std_wh",
                value: config.energy_std_wh,
            }
        })?;
        let duration = Normal::new(config.mean_duration_min, config.mean_duration_min / 3.0)
            .map_err(|_| SynthError::InvalidParameter {
                name: "mean_duration_min",
                value: config.mean_duration_min,
            })?;

        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            rng,
            profile: arrival_profile(),
            energy,
            duration,
        })
    }

    /// Sessions for one day, sorted by start time
    pub fn day(&mut self, date: NaiveDate) -> Vec<ChargingSession> {
        let day_factor = match date.weekday() {
            Weekday::Sat | Weekday::Sun => self.config.weekend_factor,
            _ => 1.0,
        };
        let midnight = date.and_time(NaiveTime::MIN);

        let mut sessions = Vec::new();
        for hour in 0..24 {
            let lambda = self.config.sessions_per_day * day_factor * self.profile[hour];
            let arrivals = match Poisson::new(lambda) {
                Ok(poisson) => {
                    let n: f64 = poisson.sample(&mut self.rng);
                    n as u64
                }
                Err(_) => 0, // lambda == 0
            };

            for _ in 0..arrivals {
                let start = midnight
                    + Duration::hours(hour as i64)
                    + Duration::seconds(self.rng.gen_range(0..3600));
                sessions.push(self.session_at(start));
            }
        }

        sessions.sort_by_key(|s| s.start);
        sessions
    }

    /// Sessions for every configured day
    pub fn generate(&mut self) -> Vec<ChargingSession> {
        let sessions: Vec<_> = self
            .config
            .start
            .iter_days()
            .take(self.config.days as usize)
            .flat_map(|date| self.day(date))
            .collect();

        info!(
            days = self.config.days,
            sessions = sessions.len(),
            seed = ?self.config.random_seed,
            "generated synthetic sessions"
        );
        sessions
    }

    fn session_at(&mut self, start: NaiveDateTime) -> ChargingSession {
        let minutes = self.duration.sample(&mut self.rng).clamp(5.0, 240.0);
        // Minimum of 100 Wh keeps aborted plug-ins visible but small
        let energy_wh = self.energy.sample(&mut self.rng).max(100.0).round();
        ChargingSession::new(start, start + Duration::seconds((minutes * 60.0) as i64), energy_wh)
    }
}
