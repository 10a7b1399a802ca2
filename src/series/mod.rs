//! Hourly demand series
//!
//! A [`HourlySeries`] is the common currency between ingestion, forecasting
//! and the pricing simulation: hour-aligned, strictly increasing and gap-free.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod hourly;

pub use hourly::*;

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("timestamp {0} is not aligned to a full hour")]
    NotHourAligned(NaiveDateTime),
    #[error("timestamps must be strictly increasing: {previous} is followed by {next}")]
    NotIncreasing {
        previous: NaiveDateTime,
        next: NaiveDateTime,
    },
    #[error("value at {ts} is not finite")]
    NonFinite { ts: NaiveDateTime },
}

/// One hour of demand
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    /// Start of the hour
    pub ts: NaiveDateTime,
    pub value: f64,
}

impl HourlyPoint {
    pub fn new(ts: NaiveDateTime, value: f64) -> Self {
        Self { ts, value }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    points: Vec<HourlyPoint>,
}

impl HourlySeries {
    pub fn empty() -> Self {
        Self { points: Vec::new() }
    }

    /// Build a series from hour-aligned, strictly increasing points.
    ///
    /// Missing hours between the first and last point are filled with zero.
    pub fn from_points(points: Vec<HourlyPoint>) -> Result<Self, SeriesError> {
        let mut filled: Vec<HourlyPoint> = Vec::with_capacity(points.len());

        for point in points {
            if !is_hour_aligned(point.ts) {
                return Err(SeriesError::NotHourAligned(point.ts));
            }
            if !point.value.is_finite() {
                return Err(SeriesError::NonFinite { ts: point.ts });
            }
            if let Some(last) = filled.last() {
                if point.ts <= last.ts {
                    return Err(SeriesError::NotIncreasing {
                        previous: last.ts,
                        next: point.ts,
                    });
                }
                let mut gap = last.ts + Duration::hours(1);
                while gap < point.ts {
                    filled.push(HourlyPoint::new(gap, 0.0));
                    gap += Duration::hours(1);
                }
            }
            filled.push(point);
        }

        Ok(Self { points: filled })
    }

    pub fn points(&self) -> &[HourlyPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_ts(&self) -> Option<NaiveDateTime> {
        self.points.first().map(|p| p.ts)
    }

    pub fn last_ts(&self) -> Option<NaiveDateTime> {
        self.points.last().map(|p| p.ts)
    }

    /// Date of the last hour in the series
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.last_ts().map(|ts| ts.date())
    }

    /// All points strictly before `t`; the training slice for a forecast at `t`
    pub fn before(&self, t: NaiveDateTime) -> HourlySeries {
        let end = self.points.partition_point(|p| p.ts < t);
        Self {
            points: self.points[..end].to_vec(),
        }
    }

    /// All points at or before `t`
    pub fn up_to(&self, t: NaiveDateTime) -> HourlySeries {
        let end = self.points.partition_point(|p| p.ts <= t);
        Self {
            points: self.points[..end].to_vec(),
        }
    }

    /// Points with `from <= ts < to`
    pub fn between(&self, from: NaiveDateTime, to: NaiveDateTime) -> &[HourlyPoint] {
        let start = self.points.partition_point(|p| p.ts < from);
        let end = self.points.partition_point(|p| p.ts < to);
        if start >= end {
            return &[];
        }
        &self.points[start..end]
    }

    pub fn get(&self, ts: NaiveDateTime) -> Option<f64> {
        self.points
            .binary_search_by(|p| p.ts.cmp(&ts))
            .ok()
            .map(|i| self.points[i].value)
    }

    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }
}

pub fn is_hour_aligned(ts: NaiveDateTime) -> bool {
    ts.minute() == 0 && ts.second() == 0 && ts.nanosecond() == 0
}

/// Truncate a timestamp to the start of its hour
pub fn floor_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date()
        .and_hms_opt(ts.hour(), 0, 0)
        .unwrap_or(ts)
}
