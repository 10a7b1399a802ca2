use chrono::{DateTime, NaiveDateTime};
use std::collections::BTreeMap;
use tracing::debug;

use super::{floor_hour, HourlyPoint, HourlySeries, SeriesError};
use crate::domain::{ChargingSession, StatusSession};

/// Sum delivered energy per hour, keyed by the hour each session started in
pub fn hourly_energy(sessions: &[ChargingSession]) -> Result<HourlySeries, SeriesError> {
    bucket_by_hour(sessions.iter().map(|s| (s.start, s.energy_wh)))
}

/// Number of sessions starting in each hour
pub fn hourly_session_counts(sessions: &[StatusSession]) -> Result<HourlySeries, SeriesError> {
    bucket_by_hour(
        sessions
            .iter()
            .filter_map(|s| unix_to_naive(s.start).map(|ts| (ts, 1.0))),
    )
}

pub fn unix_to_naive(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

fn bucket_by_hour(
    entries: impl Iterator<Item = (NaiveDateTime, f64)>,
) -> Result<HourlySeries, SeriesError> {
    let mut buckets: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
    for (ts, value) in entries {
        *buckets.entry(floor_hour(ts)).or_insert(0.0) += value;
    }

    debug!(occupied_hours = buckets.len(), "bucketed sessions by hour");

    HourlySeries::from_points(
        buckets
            .into_iter()
            .map(|(ts, value)| HourlyPoint::new(ts, value))
            .collect(),
    )
}
