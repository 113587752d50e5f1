//! Schedule spec: the validated input value for the coordinator.
//!
//! A spec is an immutable value. Reconfiguration replaces the whole spec;
//! nothing mutates one in place.

use chrono::Weekday as ChronoWeekday;
use serde::{Deserialize, Serialize};

use super::errors::JanitorError;

/// How often the cleanup job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Daily,
    Weekly,
}

/// Day of week for weekly schedules.
///
/// Own enum instead of `chrono::Weekday` so the serde names match the
/// configuration surface (`"monday"` .. `"sunday"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn to_chrono(self) -> ChronoWeekday {
        match self {
            Weekday::Monday => ChronoWeekday::Mon,
            Weekday::Tuesday => ChronoWeekday::Tue,
            Weekday::Wednesday => ChronoWeekday::Wed,
            Weekday::Thursday => ChronoWeekday::Thu,
            Weekday::Friday => ChronoWeekday::Fri,
            Weekday::Saturday => ChronoWeekday::Sat,
            Weekday::Sunday => ChronoWeekday::Sun,
        }
    }
}

/// Schedule for the recurring cleanup job.
///
/// `start_weekday` only matters when `interval` is `Weekly`; it is kept in
/// the value unconditionally so a daily spec can be flipped to weekly without
/// losing the configured day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSpec {
    pub enabled: bool,

    /// Age in days past which an attachment is a deletion candidate.
    pub retention_days: u32,

    pub interval: Interval,

    /// Hour of day (0..=23, UTC) the run starts.
    pub start_hour: u8,

    pub start_weekday: Weekday,
}

impl Default for ScheduleSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            retention_days: 365,
            interval: Interval::Daily,
            start_hour: 0,
            start_weekday: Weekday::Monday,
        }
    }
}

impl ScheduleSpec {
    /// Defensive re-validation. Config loading upstream is expected to have
    /// rejected these values already.
    pub fn validate(&self) -> Result<(), JanitorError> {
        if self.start_hour > 23 {
            return Err(JanitorError::InvalidSpec(format!(
                "start_hour {} out of range 0..=23",
                self.start_hour
            )));
        }
        if self.retention_days == 0 {
            return Err(JanitorError::InvalidSpec(
                "retention_days must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
