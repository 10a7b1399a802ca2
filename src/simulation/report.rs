use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, Table};
use itertools::Itertools;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

use super::walk_forward::round_to;
use super::{DayForecast, HourOutcome, RiskScenario, ScenarioDay, SimulationError, SimulationWindow};

/// Outcomes of one scenario, ordered by date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: RiskScenario,
    pub days: Vec<ScenarioDay>,
    /// Every priced hour that had an actual value
    #[serde(default)]
    pub hours: Vec<HourOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioTotals {
    pub scenario: String,
    pub days: usize,
    pub forecasted_energy: f64,
    pub predicted_revenue: f64,
    pub actual_energy: f64,
    pub actual_revenue: f64,
    pub revenue_with_dynamic_price: f64,
    /// Relative change vs the flat price, rounded to 4 decimals
    pub pct_diff: Option<f64>,
}

impl ScenarioResult {
    /// Sums over all simulated days; days without actual data count as zero
    pub fn totals(&self) -> ScenarioTotals {
        let sum = |f: fn(&ScenarioDay) -> f64| self.days.iter().map(f).sum::<f64>();
        let actual_revenue = sum(|d| d.actual_revenue.unwrap_or(0.0));
        let revenue_with_dynamic_price = sum(|d| d.revenue_with_dynamic_price);

        ScenarioTotals {
            scenario: self.scenario.name.clone(),
            days: self.days.len(),
            forecasted_energy: sum(|d| d.forecasted_energy),
            predicted_revenue: sum(|d| d.predicted_revenue),
            actual_energy: sum(|d| d.actual_energy.unwrap_or(0.0)),
            actual_revenue,
            revenue_with_dynamic_price,
            pct_diff: (actual_revenue != 0.0).then(|| {
                round_to((revenue_with_dynamic_price - actual_revenue) / actual_revenue, 4)
            }),
        }
    }
}

/// Revenue of one calendar month across scenarios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    pub actual_revenue: f64,
    /// Dynamic revenue per scenario, in scenario order
    pub dynamic_revenue: Vec<f64>,
    /// Stacked increments: first scenario minus actual, then each scenario
    /// minus the previous one
    pub increments: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub forecaster: String,
    pub base_price: f64,
    pub window: SimulationWindow,
    pub forecasts: Vec<DayForecast>,
    /// Days left out because the forecaster lacked history
    #[serde(default)]
    pub skipped_days: Vec<NaiveDate>,
    pub scenarios: Vec<ScenarioResult>,
}

impl SimulationReport {
    pub fn scenario(&self, name: &str) -> Option<&ScenarioResult> {
        self.scenarios.iter().find(|r| r.scenario.name == name)
    }

    pub fn totals(&self) -> Vec<ScenarioTotals> {
        self.scenarios.iter().map(ScenarioResult::totals).collect()
    }

    /// Per-month revenue for every scenario.
    ///
    /// Actual revenue does not depend on the scenario and is taken from the
    /// first one.
    pub fn monthly_summary(&self) -> Vec<MonthlyRevenue> {
        let n = self.scenarios.len();
        let mut months: BTreeMap<String, (f64, Vec<f64>)> = BTreeMap::new();

        for (i, result) in self.scenarios.iter().enumerate() {
            for day in &result.days {
                let entry = months
                    .entry(day.date.format("%Y-%m").to_string())
                    .or_insert_with(|| (0.0, vec![0.0; n]));
                if i == 0 {
                    entry.0 += day.actual_revenue.unwrap_or(0.0);
                }
                entry.1[i] += day.revenue_with_dynamic_price;
            }
        }

        months
            .into_iter()
            .map(|(month, (actual_revenue, dynamic_revenue))| {
                let increments = std::iter::once(actual_revenue)
                    .chain(dynamic_revenue.iter().copied())
                    .tuple_windows()
                    .map(|(lower, upper)| upper - lower)
                    .collect();
                MonthlyRevenue {
                    month,
                    actual_revenue,
                    dynamic_revenue,
                    increments,
                }
            })
            .collect()
    }

    /// Totals as a printable table
    pub fn totals_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            Cell::new("Scenario").add_attribute(Attribute::Bold),
            Cell::new("Band").add_attribute(Attribute::Bold),
            Cell::new("Elasticity").add_attribute(Attribute::Bold),
            Cell::new("Days").add_attribute(Attribute::Bold),
            Cell::new("Actual\nRevenue").add_attribute(Attribute::Bold),
            Cell::new("Dynamic\nRevenue").add_attribute(Attribute::Bold),
            Cell::new("Change").add_attribute(Attribute::Bold),
        ]);

        for result in &self.scenarios {
            let totals = result.totals();
            let change = match totals.pct_diff {
                Some(p) if p >= 0.0 => Cell::new(format!("{:+.2}%", p * 100.0)).fg(Color::Green),
                Some(p) => Cell::new(format!("{:+.2}%", p * 100.0)).fg(Color::Red),
                None => Cell::new("-"),
            };
            table.add_row(vec![
                Cell::new(&result.scenario.name),
                Cell::new(format!(
                    "{:.2}-{:.2}",
                    result.scenario.scale_min, result.scenario.scale_max
                )),
                Cell::new(format!("{:.2}", result.scenario.elasticity)),
                Cell::new(totals.days),
                Cell::new(format!("{:.2}", totals.actual_revenue)),
                Cell::new(format!("{:.2}", totals.revenue_with_dynamic_price)),
                change,
            ]);
        }

        table
    }

    /// Write daily and hourly CSVs per scenario, the monthly summary CSV and
    /// the full JSON report into `dir`. Returns the written paths.
    pub fn write_outputs(&self, dir: &Path) -> Result<Vec<PathBuf>, SimulationError> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();

        for result in &self.scenarios {
            let path = dir.join(format!("daily_{}.csv", result.scenario.name));
            let mut wtr = csv::Writer::from_path(&path)?;
            for day in &result.days {
                wtr.serialize(day)?;
            }
            wtr.flush()?;
            written.push(path);

            let path = dir.join(format!("hourly_{}.csv", result.scenario.name));
            let mut wtr = csv::Writer::from_path(&path)?;
            for hour in &result.hours {
                wtr.serialize(hour)?;
            }
            wtr.flush()?;
            written.push(path);
        }

        let path = dir.join("monthly_summary.csv");
        self.write_monthly_csv(&path)?;
        written.push(path);

        let path = dir.join("report.json");
        let file = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(file, self)?;
        written.push(path);

        info!(dir = %dir.display(), files = written.len(), "wrote simulation outputs");
        Ok(written)
    }

    fn write_monthly_csv(&self, path: &Path) -> Result<(), SimulationError> {
        let mut wtr = csv::Writer::from_path(path)?;

        let mut header = vec!["month".to_string(), "actual_revenue".to_string()];
        header.extend(self.scenarios.iter().map(|r| format!("{}_dynamic", r.scenario.name)));
        header.extend(self.scenarios.iter().map(|r| format!("{}_increment", r.scenario.name)));
        wtr.write_record(&header)?;

        for row in self.monthly_summary() {
            let mut record = vec![row.month.clone(), format!("{:.2}", row.actual_revenue)];
            record.extend(row.dynamic_revenue.iter().map(|v| format!("{v:.2}")));
            record.extend(row.increments.iter().map(|v| format!("{v:.2}")));
            wtr.write_record(&record)?;
        }

        wtr.flush()?;
        Ok(())
    }
}
