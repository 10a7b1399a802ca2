use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use super::IngestError;
use crate::domain::ChargingSession;
use crate::series::HourlySeries;

pub const START_COLUMN: &str = "Start time";
pub const STOP_COLUMN: &str = "Count.Stop time";
pub const ENERGY_COLUMN: &str = "Modified Count.Energy (Wh)";

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];
const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
struct RawSessionRow {
    #[serde(rename = "Start time")]
    start: String,
    #[serde(rename = "Count.Stop time")]
    stop: String,
    #[serde(rename = "Modified Count.Energy (Wh)")]
    energy: String,
}

#[derive(Debug, Serialize)]
struct SessionRow {
    #[serde(rename = "Start time")]
    start: String,
    #[serde(rename = "Count.Stop time")]
    stop: String,
    #[serde(rename = "Modified Count.Energy (Wh)")]
    energy: f64,
}

/// Counters reported after a session load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub rows: usize,
    pub kept: usize,
    pub bad_timestamp: usize,
    pub bad_energy: usize,
    /// Rows that could not be read at all (missing fields)
    pub bad_row: usize,
}

/// Load charging sessions from the operator CSV export.
///
/// Rows with a non-numeric energy value are dropped, as are rows whose
/// timestamps cannot be parsed and ragged rows. Returned sessions are sorted by start time.
pub fn load_sessions_csv(path: &Path) -> Result<(Vec<ChargingSession>, LoadStats), IngestError> {
    let file = std::fs::File::open(path).map_err(|source| IngestError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let (sessions, stats) = read_sessions(file)?;
    info!(
        path = %path.display(),
        rows = stats.rows,
        kept = stats.kept,
        bad_timestamp = stats.bad_timestamp,
        bad_energy = stats.bad_energy,
        bad_row = stats.bad_row,
        "loaded charging sessions"
    );
    Ok((sessions, stats))
}

pub fn read_sessions<R: std::io::Read>(
    reader: R,
) -> Result<(Vec<ChargingSession>, LoadStats), IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    for column in [START_COLUMN, STOP_COLUMN, ENERGY_COLUMN] {
        if !headers.iter().any(|h| h == column) {
            return Err(IngestError::MissingColumn(column));
        }
    }

    let mut stats = LoadStats::default();
    let mut sessions = Vec::new();

    for (line, row) in rdr.deserialize::<RawSessionRow>().enumerate() {
        stats.rows += 1;
        let row = match row {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                warn!(line = line + 2, error = %e, "skipping unreadable row");
                stats.bad_row += 1;
                continue;
            }
        };

        let (Some(start), Some(stop)) = (parse_timestamp(&row.start), parse_timestamp(&row.stop))
        else {
            warn!(line = line + 2, start = %row.start, stop = %row.stop, "skipping row with unparseable timestamp");
            stats.bad_timestamp += 1;
            continue;
        };

        let energy_wh = match row.energy.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                stats.bad_energy += 1;
                continue;
            }
        };

        sessions.push(ChargingSession::new(start, stop, energy_wh));
    }

    sessions.sort_by_key(|s| s.start);
    stats.kept = sessions.len();
    Ok((sessions, stats))
}

pub fn write_sessions_csv(path: &Path, sessions: &[ChargingSession]) -> Result<(), IngestError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for s in sessions {
        wtr.serialize(SessionRow {
            start: s.start.format(OUTPUT_TIMESTAMP_FORMAT).to_string(),
            stop: s.stop.format(OUTPUT_TIMESTAMP_FORMAT).to_string(),
            energy: s.energy_wh,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_hourly_csv(path: &Path, series: &HourlySeries, value_column: &str) -> Result<(), IngestError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["ds", value_column])?;
    for p in series.points() {
        wtr.write_record([
            p.ts.format(OUTPUT_TIMESTAMP_FORMAT).to_string(),
            p.value.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}
