use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::pricing::{PriceBand, PricingError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioNameError {
    #[error("scenario name must not be empty")]
    Empty,
    #[error("scenario name {0:?} is used more than once")]
    Duplicate(String),
    #[error("scenario name {0:?} must not contain path separators or be a relative path component")]
    NotAFileName(String),
}

/// Price band and demand response assumed for one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScenario {
    pub name: String,
    /// Lowest price index (cheapest hours)
    pub scale_min: f64,
    /// Highest price index (peak hours)
    pub scale_max: f64,
    /// Fraction of volume lost per unit of index above 1.0 (and gained below)
    pub elasticity: f64,
}

impl RiskScenario {
    pub fn new(name: impl Into<String>, scale_min: f64, scale_max: f64, elasticity: f64) -> Self {
        Self {
            name: name.into(),
            scale_min,
            scale_max,
            elasticity,
        }
    }

    /// Conservative band with the strongest demand response
    pub fn low() -> Self {
        Self::new("low", 0.9, 1.2, 0.1)
    }

    pub fn medium() -> Self {
        Self::new("medium", 0.8, 1.4, 0.07)
    }

    /// Widest band with almost inelastic demand
    pub fn high() -> Self {
        Self::new("high", 0.7, 1.7, 0.01)
    }

    /// Single-scenario defaults: band 0.6-1.4, elasticity 0.1
    pub fn baseline() -> Self {
        Self::new("baseline", 0.6, 1.4, 0.1)
    }

    /// The low/medium/high risk ladder
    pub fn risk_ladder() -> Vec<Self> {
        vec![Self::low(), Self::medium(), Self::high()]
    }

    pub fn band(&self) -> Result<PriceBand, PricingError> {
        PriceBand::new(self.scale_min, self.scale_max)
    }

    /// Volume shift caused by the index: positive means demand lost
    pub fn volume_delta(&self, price_index: f64, energy: f64) -> f64 {
        (price_index - 1.0) * energy * self.elasticity
    }
}

/// Scenario names become output file names, so they must be unique and
/// usable as a single path component.
pub fn check_scenario_names(scenarios: &[RiskScenario]) -> Result<(), ScenarioNameError> {
    let mut seen = HashSet::new();
    for scenario in scenarios {
        let name = scenario.name.as_str();
        if name.trim().is_empty() {
            return Err(ScenarioNameError::Empty);
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ScenarioNameError::NotAFileName(name.to_string()));
        }
        if !seen.insert(name) {
            return Err(ScenarioNameError::Duplicate(name.to_string()));
        }
    }
    Ok(())
}

impl Default for RiskScenario {
    fn default() -> Self {
        Self::baseline()
    }
}
