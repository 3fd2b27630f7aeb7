//! Task cadence and next-run computation.
//!
//! A cadence is a positive `frequency` of hours or days. The next run is
//! always one step after the *previous scheduled time*, never after "now":
//! a task that fell several periods behind stays due and is picked up again
//! on the following cycles until it catches up.

use crate::error::TaskError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Time granularity of a cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CadenceUnit {
    Hour,
    Day,
}

impl CadenceUnit {
    /// Returns the stored string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }

    fn hours(&self) -> i64 {
        match self {
            Self::Hour => 1,
            Self::Day => 24,
        }
    }
}

impl fmt::Display for CadenceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CadenceUnit {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            other => Err(TaskError::InvalidUnit {
                unit: other.to_string(),
            }),
        }
    }
}

/// How often a task runs: every `frequency` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCadence", into = "RawCadence")]
pub struct Cadence {
    frequency: u32,
    unit: CadenceUnit,
}

impl Cadence {
    /// Creates a cadence, rejecting non-positive frequencies.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::InvalidFrequency` when `frequency <= 0` or it does
    /// not fit in a `u32`.
    pub fn new(frequency: i64, unit: CadenceUnit) -> Result<Self, TaskError> {
        match u32::try_from(frequency) {
            Ok(frequency) if frequency > 0 => Ok(Self { frequency, unit }),
            _ => Err(TaskError::InvalidFrequency { frequency }),
        }
    }

    #[must_use]
    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    #[must_use]
    pub fn unit(&self) -> CadenceUnit {
        self.unit
    }

    /// The length of one step.
    #[must_use]
    pub fn step(&self) -> Duration {
        Duration::hours(i64::from(self.frequency) * self.unit.hours())
    }

    /// Returns `scheduled_at` advanced by exactly one step.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::ScheduleOverflow` if the result is not a
    /// representable timestamp.
    pub fn next_after(&self, scheduled_at: DateTime<Utc>) -> Result<DateTime<Utc>, TaskError> {
        scheduled_at
            .checked_add_signed(self.step())
            .ok_or(TaskError::ScheduleOverflow { scheduled_at })
    }
}

#[derive(Serialize, Deserialize)]
struct RawCadence {
    frequency: i64,
    unit: CadenceUnit,
}

impl TryFrom<RawCadence> for Cadence {
    type Error = TaskError;

    fn try_from(raw: RawCadence) -> Result<Self, Self::Error> {
        Self::new(raw.frequency, raw.unit)
    }
}

impl From<Cadence> for RawCadence {
    fn from(cadence: Cadence) -> Self {
        Self {
            frequency: i64::from(cadence.frequency),
            unit: cadence.unit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    #[test]
    fn hourly_step_adds_hours() {
        let cadence = Cadence::new(1, CadenceUnit::Hour).unwrap();
        assert_eq!(cadence.next_after(at(9, 0)).unwrap(), at(10, 0));
    }

    #[test]
    fn daily_step_is_24_hour_multiples() {
        let cadence = Cadence::new(2, CadenceUnit::Day).unwrap();
        let d = at(9, 0);
        assert_eq!(cadence.next_after(d).unwrap(), d + Duration::hours(48));
    }

    #[test]
    fn step_is_relative_to_scheduled_time_not_now() {
        // Overdue by days: one step still only moves one hour.
        let cadence = Cadence::new(1, CadenceUnit::Hour).unwrap();
        let long_ago = Utc::now() - Duration::days(3);
        let next = cadence.next_after(long_ago).unwrap();
        assert_eq!(next - long_ago, Duration::hours(1));
        assert!(next < Utc::now());
    }

    #[test]
    fn rejects_non_positive_frequency() {
        assert_eq!(
            Cadence::new(0, CadenceUnit::Hour),
            Err(TaskError::InvalidFrequency { frequency: 0 })
        );
        assert!(Cadence::new(-3, CadenceUnit::Day).is_err());
        assert!(Cadence::new(i64::from(u32::MAX) + 1, CadenceUnit::Day).is_err());
    }

    #[test]
    fn overflow_is_an_error() {
        let cadence = Cadence::new(1, CadenceUnit::Day).unwrap();
        let result = cadence.next_after(DateTime::<Utc>::MAX_UTC);
        assert!(matches!(result, Err(TaskError::ScheduleOverflow { .. })));
    }

    #[test]
    fn unit_parses_stored_form() {
        assert_eq!("hour".parse::<CadenceUnit>().unwrap(), CadenceUnit::Hour);
        assert_eq!("day".parse::<CadenceUnit>().unwrap(), CadenceUnit::Day);
        assert!("week".parse::<CadenceUnit>().is_err());
    }

    #[test]
    fn deserialize_validates_frequency() {
        let ok: Cadence = serde_json::from_str(r#"{"frequency":3,"unit":"day"}"#).unwrap();
        assert_eq!(ok.frequency(), 3);
        let bad: Result<Cadence, _> = serde_json::from_str(r#"{"frequency":0,"unit":"hour"}"#);
        assert!(bad.is_err());
    }
}
