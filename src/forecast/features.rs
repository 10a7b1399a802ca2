//! Calendar features for hourly demand
//!
//! Charging demand follows hour-of-day and day-of-week cycles with a
//! seasonal drift; these features expose those calendar positions.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Fall, Season::Winter];

    /// Season from a calendar date.
    ///
    /// Uses the offset `(month * 100 + day - 320) mod 1300`, so March 20th is
    /// the start of the cycle. Bins are right-closed: `(0, 300]` spring,
    /// `(300, 602]` summer, `(602, 900]` fall, `(900, 1300]` winter. An offset
    /// of exactly zero falls outside every bin and is reported as winter.
    pub fn from_month_day(month: u32, day: u32) -> Self {
        let offset = (month as i64 * 100 + day as i64 - 320).rem_euclid(1300);
        match offset {
            1..=300 => Season::Spring,
            301..=602 => Season::Summer,
            603..=900 => Season::Fall,
            _ => Season::Winter,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
            Season::Winter => "Winter",
        };
        f.write_str(s)
    }
}

/// Calendar features of one timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFeatures {
    /// Hour of day (0-23)
    pub hour: u32,
    /// Day of week (0=Monday, 6=Sunday)
    pub day_of_week: u32,
    pub weekday: Weekday,
    pub quarter: u32,
    pub month: u32,
    pub year: i32,
    pub day_of_year: u32,
    pub day_of_month: u32,
    /// ISO week number
    pub week_of_year: u32,
    pub season: Season,
}

impl TimeFeatures {
    pub fn from_timestamp(ts: NaiveDateTime) -> Self {
        let month = ts.month();
        let day = ts.day();
        Self {
            hour: ts.hour(),
            day_of_week: ts.weekday().num_days_from_monday(),
            weekday: ts.weekday(),
            quarter: (month - 1) / 3 + 1,
            month,
            year: ts.year(),
            day_of_year: ts.ordinal(),
            day_of_month: day,
            week_of_year: ts.iso_week().week(),
            season: Season::from_month_day(month, day),
        }
    }

    /// Slot within a week (0..168), Monday 00:00 first
    pub fn hour_of_week(&self) -> usize {
        (self.day_of_week * 24 + self.hour) as usize
    }

    pub fn is_weekend(&self) -> bool {
        self.day_of_week >= 5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    #[test]
    fn test_extract_features() {
        // Thursday
        let ts = NaiveDate::from_ymd_opt(2024, 8, 1)
            .unwrap()
            .and_hms_opt(17, 0, 0)
            .unwrap();
        let f = TimeFeatures::from_timestamp(ts);

        assert_eq!(f.hour, 17);
        assert_eq!(f.day_of_week, 3);
        assert_eq!(f.weekday, Weekday::Thu);
        assert_eq!(f.quarter, 3);
        assert_eq!(f.month, 8);
        assert_eq!(f.year, 2024);
        assert_eq!(f.day_of_year, 214);
        assert_eq!(f.day_of_month, 1);
        assert_eq!(f.week_of_year, 31);
        assert_eq!(f.season, Season::Summer);
        assert_eq!(f.hour_of_week(), 3 * 24 + 17);
        assert!(!f.is_weekend());
    }

    #[rstest]
    #[case(3, 20, Season::Winter)]
    #[case(3, 21, Season::Spring)]
    #[case(6, 20, Season::Spring)]
    #[case(6, 21, Season::Summer)]
    #[case(9, 22, Season::Summer)]
    #[case(9, 23, Season::Fall)]
    #[case(12, 20, Season::Fall)]
    #[case(12, 21, Season::Winter)]
    #[case(1, 15, Season::Winter)]
    fn test_season_boundaries(#[case] month: u32, #[case] day: u32, #[case] expected: Season) {
        assert_eq!(Season::from_month_day(month, day), expected);
    }
}
