use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::forecast::{
    DemandForecaster, SeasonalNaiveForecaster, SeasonalProfileConfig, SeasonalProfileForecaster,
};
use crate::pricing::PricingError;
use crate::simulation::{
    check_scenario_names, RiskScenario, ScenarioNameError, SimulationSettings, SimulationWindow,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "EVPRICE__";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid pricing settings: {0}")]
    Pricing(#[from] PricingError),

    #[error("Invalid scenario {name}: {source}")]
    Scenario {
        name: String,
        #[source]
        source: PricingError,
    },

    #[error("Invalid scenario list: {0}")]
    ScenarioName(#[from] ScenarioNameError),

    #[error("Simulation window ends ({end}) before it starts ({start})")]
    Window { start: NaiveDate, end: NaiveDate },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub pricing: PricingConfig,
    pub simulation: SimulationConfig,
    pub forecast: ForecastConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub sessions_csv: PathBuf,
    pub status_jsonl: PathBuf,
    /// Only read this many status lines (None = all)
    pub read_first: Option<usize>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            sessions_csv: PathBuf::from("data/sessions.csv"),
            status_jsonl: PathBuf::from("data/status.jsonl"),
            read_first: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub base_price: f64,
    pub window_hours: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let settings = SimulationSettings::default();
        Self {
            base_price: settings.base_price,
            window_hours: settings.window_hours,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub forecast_start: NaiveDate,
    pub simulation_end: NaiveDate,
    pub max_parallel_days: usize,
    pub scenarios: Vec<RiskScenario>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let window = SimulationWindow::default();
        Self {
            forecast_start: window.forecast_start,
            simulation_end: window.simulation_end,
            max_parallel_days: SimulationSettings::default().max_parallel_days,
            scenarios: RiskScenario::risk_ladder(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastModel {
    SeasonalProfile,
    SeasonalNaive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub model: ForecastModel,
    pub lookback_days: usize,
    pub min_history_days: usize,
    pub recent_days: usize,
    pub weekly_weight: f64,
    /// Period of the seasonal-naive model
    pub period_hours: usize,
    /// Train/test split used by `evaluate`
    pub evaluation_split: NaiveDate,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        let profile = SeasonalProfileConfig::default();
        Self {
            model: ForecastModel::SeasonalProfile,
            lookback_days: profile.lookback_days,
            min_history_days: profile.min_history_days,
            recent_days: profile.recent_days,
            weekly_weight: profile.weekly_weight,
            period_hours: 168,
            evaluation_split: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap_or(NaiveDate::MIN),
        }
    }
}

impl ForecastConfig {
    pub fn build(&self) -> Arc<dyn DemandForecaster> {
        match self.model {
            ForecastModel::SeasonalProfile => {
                Arc::new(SeasonalProfileForecaster::new(SeasonalProfileConfig {
                    lookback_days: self.lookback_days,
                    min_history_days: self.min_history_days,
                    recent_days: self.recent_days,
                    weekly_weight: self.weekly_weight,
                }))
            }
            ForecastModel::SeasonalNaive => Arc::new(SeasonalNaiveForecaster::new(self.period_hours)),
        }
    }

    pub fn split_at(&self) -> NaiveDateTime {
        self.evaluation_split.and_time(NaiveTime::MIN)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
        }
    }
}

impl Config {
    /// Defaults, then `config/default.toml`, then `EVPRICE__*` env vars
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config: Config = Self::figment(path).extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings().validate()?;

        if self.simulation.simulation_end < self.simulation.forecast_start {
            return Err(ConfigError::Window {
                start: self.simulation.forecast_start,
                end: self.simulation.simulation_end,
            });
        }
        if self.simulation.max_parallel_days == 0 {
            return Err(ConfigError::Invalid {
                field: "simulation.max_parallel_days",
                reason: "must be at least 1".into(),
            });
        }
        if self.simulation.scenarios.is_empty() {
            return Err(ConfigError::Invalid {
                field: "simulation.scenarios",
                reason: "at least one scenario is required".into(),
            });
        }
        check_scenario_names(&self.simulation.scenarios)?;
        for scenario in &self.simulation.scenarios {
            scenario.band().map_err(|source| ConfigError::Scenario {
                name: scenario.name.clone(),
                source,
            })?;
        }
        if !(0.0..=1.0).contains(&self.forecast.weekly_weight) {
            return Err(ConfigError::Invalid {
                field: "forecast.weekly_weight",
                reason: format!("{} is outside 0.0-1.0", self.forecast.weekly_weight),
            });
        }
        if self.forecast.lookback_days == 0 {
            return Err(ConfigError::Invalid {
                field: "forecast.lookback_days",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn settings(&self) -> SimulationSettings {
        SimulationSettings {
            base_price: self.pricing.base_price,
            window_hours: self.pricing.window_hours,
            max_parallel_days: self.simulation.max_parallel_days,
        }
    }

    pub fn window(&self) -> SimulationWindow {
        SimulationWindow {
            forecast_start: self.simulation.forecast_start,
            simulation_end: self.simulation.simulation_end,
        }
    }
}
