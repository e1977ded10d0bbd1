use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type RequestId = u64;
pub type UnixMillis = u64;

/// Identity of the party that issued a request. Matches the numeric user id
/// handed out by whatever front-end relays requests to the daemon.
pub type RequesterId = i64;

pub const KEEP_COUNT_MIN: u32 = 1;
pub const KEEP_COUNT_MAX: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceHealth {
    Running,
    Stopped,
    Unknown(String),
}

impl fmt::Display for ServiceHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceHealth::Running => write!(f, "running"),
            ServiceHealth::Stopped => write!(f, "stopped"),
            ServiceHealth::Unknown(raw) => write!(f, "unknown ({raw})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowListEntry {
    #[serde(default)]
    pub uuid: String,
    pub name: String,
}

/// How often scheduled backups fire. Wire/file names match the settings
/// record format this daemon inherits ("15min", "30min", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupInterval {
    #[serde(rename = "15min")]
    Every15Min,
    #[serde(rename = "30min")]
    Every30Min,
    #[serde(rename = "hourly")]
    Hourly,
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "weekly")]
    Weekly,
}

impl BackupInterval {
    /// Minute step for the boundary-aligned intervals, `None` for the
    /// calendar-based ones.
    pub fn aligned_minutes(self) -> Option<u32> {
        match self {
            BackupInterval::Every15Min => Some(15),
            BackupInterval::Every30Min => Some(30),
            BackupInterval::Hourly => Some(60),
            BackupInterval::Daily | BackupInterval::Weekly => None,
        }
    }
}

impl fmt::Display for BackupInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackupInterval::Every15Min => "every 15 minutes",
            BackupInterval::Every30Min => "every 30 minutes",
            BackupInterval::Hourly => "hourly",
            BackupInterval::Daily => "daily",
            BackupInterval::Weekly => "weekly",
        };
        write!(f, "{name}")
    }
}

/// Wall-clock time of day, serialized as "HH:MM". Valid by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, InvalidSettings> {
        if hour > 23 || minute > 59 {
            return Err(InvalidSettings::TimeOfDay(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = InvalidSettings;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let Some((hour, minute)) = value.trim().split_once(':') else {
            return Err(InvalidSettings::TimeOfDay(value.to_string()));
        };
        let hour = hour
            .parse::<u8>()
            .map_err(|_| InvalidSettings::TimeOfDay(value.to_string()))?;
        let minute = minute
            .parse::<u8>()
            .map_err(|_| InvalidSettings::TimeOfDay(value.to_string()))?;
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = InvalidSettings;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// The durable scheduler configuration. One record per host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSettings {
    pub enabled: bool,
    pub interval: BackupInterval,
    pub time: TimeOfDay,
    pub keep_count: u32,
}

impl BackupSettings {
    pub fn validate(&self) -> Result<(), InvalidSettings> {
        if !(KEEP_COUNT_MIN..=KEEP_COUNT_MAX).contains(&self.keep_count) {
            return Err(InvalidSettings::KeepCount(self.keep_count));
        }
        Ok(())
    }
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: BackupInterval::Daily,
            time: TimeOfDay { hour: 3, minute: 0 },
            keep_count: 7,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidSettings {
    #[error("keep_count must be between 1 and 50, got {0}")]
    KeepCount(u32),
    #[error("not a valid 24h time: {0}")]
    TimeOfDay(String),
}

/// Result of one backup pipeline run, reported to the requester verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupOutcome {
    pub success: bool,
    pub message: String,
    pub artifact: Option<PathBuf>,
}

/// Whether a relayed console command actually reached the server or was only
/// written to the local command journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum CommandDelivery {
    Executed { response: String },
    Recorded {},
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_of_day_parses_and_rejects() {
        let t: TimeOfDay = "03:00".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (3, 0));
        assert_eq!(t.to_string(), "03:00");

        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("12:60".parse::<TimeOfDay>().is_err());
        assert!("noon".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn settings_round_trip_matches_legacy_record_format() {
        let settings = BackupSettings {
            enabled: true,
            interval: BackupInterval::Daily,
            time: TimeOfDay::new(3, 0).unwrap(),
            keep_count: 7,
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"daily\""));
        assert!(json.contains("\"03:00\""));
        let back: BackupSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn keep_count_bounds_are_enforced() {
        let mut settings = BackupSettings::default();
        settings.keep_count = 0;
        assert!(settings.validate().is_err());
        settings.keep_count = 51;
        assert!(settings.validate().is_err());
        settings.keep_count = 50;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn bad_time_in_stored_record_is_rejected() {
        let raw = r#"{"enabled":true,"interval":"daily","time":"25:00","keep_count":7}"#;
        assert!(serde_json::from_str::<BackupSettings>(raw).is_err());
    }
}
