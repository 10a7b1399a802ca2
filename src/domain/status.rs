use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use strum::EnumString;

/// Charger connector status as reported in the status-change stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ChargerStatus {
    Available,
    Blocked,
    Charging,
    OutOfOrder,
    Reserved,
    Unknown,
    /// Any status string not covered above, kept verbatim
    #[strum(default)]
    Other(String),
}

impl ChargerStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Blocked => "BLOCKED",
            Self::Charging => "CHARGING",
            Self::OutOfOrder => "OUTOFORDER",
            Self::Reserved => "RESERVED",
            Self::Unknown => "UNKNOWN",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Whether this status closes an open charging session
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            Self::Available | Self::Blocked | Self::OutOfOrder | Self::Unknown
        )
    }

    pub fn is_charging(&self) -> bool {
        matches!(self, Self::Charging)
    }
}

impl fmt::Display for ChargerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ChargerStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChargerStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        // the default variant makes parsing infallible
        Ok(ChargerStatus::from_str(&raw).unwrap_or(ChargerStatus::Other(raw)))
    }
}

/// Identifies one EVSE at one charging site
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChargerKey {
    pub site_id: String,
    pub evse_uid: String,
}

impl ChargerKey {
    pub fn new(site_id: impl Into<String>, evse_uid: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            evse_uid: evse_uid.into(),
        }
    }
}

impl fmt::Display for ChargerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.site_id, self.evse_uid)
    }
}

/// One status change of one charger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub key: ChargerKey,
    /// Unix seconds
    pub timestamp: i64,
    pub status: ChargerStatus,
}

/// A charging session reconstructed from status transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSession {
    #[serde(flatten)]
    pub key: ChargerKey,
    /// Unix seconds
    pub start: i64,
    /// Unix seconds
    pub end: i64,
    pub duration_secs: i64,
}
