use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;
use tracing::{error, info};

use super::IngestError;
use crate::domain::{ChargerKey, ChargerStatus, StatusEvent, StatusSession};

const PROGRESS_EVERY: usize = 1000;

#[derive(Debug, Deserialize)]
struct RawStatusEntry {
    #[serde(rename = "nobilId")]
    site_id: Option<Value>,
    #[serde(rename = "evseUid")]
    evse_uid: Option<Value>,
    status: Option<String>,
    timestamp: Option<Value>,
}

impl RawStatusEntry {
    /// Entries with any missing or empty field are not usable
    fn into_event(self) -> Option<StatusEvent> {
        let site_id = non_empty_string(self.site_id?)?;
        let evse_uid = non_empty_string(self.evse_uid?)?;
        let status = self.status.filter(|s| !s.is_empty())?;
        let timestamp = match self.timestamp? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
            Value::String(s) => s.trim().parse::<i64>().ok()?,
            _ => return None,
        };
        if timestamp == 0 {
            return None;
        }

        Some(StatusEvent {
            key: ChargerKey::new(site_id, evse_uid),
            timestamp,
            status: status.parse().unwrap_or(ChargerStatus::Other(status)),
        })
    }
}

fn non_empty_string(v: Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read status-change events, one JSON object per line.
///
/// `read_first` stops after that many lines. Malformed lines are logged and
/// skipped.
pub fn load_status_events_jsonl(
    path: &Path,
    read_first: Option<usize>,
) -> Result<Vec<StatusEvent>, IngestError> {
    let file = std::fs::File::open(path).map_err(|source| IngestError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "streaming status events");
    read_status_events(std::io::BufReader::new(file), read_first)
}

pub fn read_status_events<R: BufRead>(
    reader: R,
    read_first: Option<usize>,
) -> Result<Vec<StatusEvent>, IngestError> {
    let mut events = Vec::new();

    for (i, line) in reader.split(b'\n').enumerate() {
        if read_first.is_some_and(|limit| i >= limit) {
            break;
        }
        let bytes = line?;
        let line = match std::str::from_utf8(&bytes) {
            Ok(line) => line.trim_end_matches('\r'),
            Err(e) => {
                error!(line = i + 1, error = %e, "skipping status entry that is not UTF-8");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<RawStatusEntry>(line) {
            Ok(entry) => events.extend(entry.into_event()),
            Err(e) => error!(line = i + 1, error = %e, "failed to parse status entry"),
        }

        if i % PROGRESS_EVERY == 0 && i > 0 {
            info!(processed = i, "reading status events");
        }
    }

    Ok(events)
}

/// Status events grouped per charger, each group ordered by timestamp
#[derive(Debug, Clone, Default)]
pub struct StatusLog {
    logs: BTreeMap<ChargerKey, Vec<(i64, ChargerStatus)>>,
}

impl StatusLog {
    pub fn from_events(events: impl IntoIterator<Item = StatusEvent>) -> Self {
        let mut logs: BTreeMap<ChargerKey, Vec<(i64, ChargerStatus)>> = BTreeMap::new();
        for event in events {
            logs.entry(event.key)
                .or_default()
                .push((event.timestamp, event.status));
        }
        for entries in logs.values_mut() {
            entries.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.as_str().cmp(b.1.as_str())));
        }
        info!(chargers = logs.len(), "grouped status events");
        Self { logs }
    }

    pub fn charger_count(&self) -> usize {
        self.logs.len()
    }

    pub fn events(&self, key: &ChargerKey) -> Option<&[(i64, ChargerStatus)]> {
        self.logs.get(key).map(Vec::as_slice)
    }

    /// Every distinct status value seen, sorted by wire form
    pub fn unique_statuses(&self) -> Vec<ChargerStatus> {
        let mut statuses: Vec<ChargerStatus> = self
            .logs
            .values()
            .flat_map(|entries| entries.iter().map(|(_, s)| s.clone()))
            .collect();
        statuses.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        statuses.dedup();
        statuses
    }

    /// Reconstruct charging sessions from status transitions.
    ///
    /// A session opens on the first CHARGING event while idle and closes on
    /// the next AVAILABLE, BLOCKED, OUTOFORDER or UNKNOWN. Anything else
    /// (RESERVED, repeated CHARGING) leaves the session state untouched. A
    /// session still open at the end of the log is discarded.
    pub fn extract_sessions(&self) -> Vec<StatusSession> {
        let mut sessions = Vec::new();

        for (key, entries) in &self.logs {
            let mut charging_start: Option<i64> = None;

            for (ts, status) in entries {
                match charging_start {
                    None if status.is_charging() => charging_start = Some(*ts),
                    Some(start) if status.ends_session() => {
                        sessions.push(StatusSession {
                            key: key.clone(),
                            start,
                            end: *ts,
                            duration_secs: ts - start,
                        });
                        charging_start = None;
                    }
                    _ => {}
                }
            }
        }

        info!(sessions = sessions.len(), "extracted charging sessions");
        sessions
    }
}

#[derive(Debug, Serialize)]
struct StatusSessionRow<'a> {
    site_id: &'a str,
    charger_id: &'a str,
    start: i64,
    end: i64,
    duration_secs: i64,
}

pub fn write_status_sessions_csv(path: &Path, sessions: &[StatusSession]) -> Result<(), IngestError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for s in sessions {
        wtr.serialize(StatusSessionRow {
            site_id: &s.key.site_id,
            charger_id: &s.key.evse_uid,
            start: s.start,
            end: s.end,
            duration_secs: s.duration_secs,
        })?;
    }
    wtr.flush()?;
    Ok(())
}
