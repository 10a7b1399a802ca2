use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One charging event as exported by the charger operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargingSession {
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
    /// Energy delivered during the session (Wh)
    pub energy_wh: f64,
}

impl ChargingSession {
    pub fn new(start: NaiveDateTime, stop: NaiveDateTime, energy_wh: f64) -> Self {
        Self {
            start,
            stop,
            energy_wh,
        }
    }

    pub fn duration(&self) -> Duration {
        self.stop - self.start
    }

    /// Session length in minutes as f64
    pub fn duration_minutes(&self) -> f64 {
        self.duration().num_seconds() as f64 / 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_session_duration() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(10, 15, 0)
            .unwrap();
        let stop = start + Duration::minutes(42);
        let session = ChargingSession::new(start, stop, 7_300.0);

        assert_eq!(session.duration(), Duration::minutes(42));
        assert_eq!(session.duration_minutes(), 42.0);
    }
}
