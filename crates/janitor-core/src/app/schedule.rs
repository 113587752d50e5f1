//! Deadline computation for daily/weekly schedules.
//!
//! Pure: the caller passes `now`, nothing here reads a clock. That keeps the
//! math deterministic and testable without real time passing.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};

use crate::domain::{Interval, JanitorError, ScheduleSpec};

/// Compute the next run deadline strictly after `now`.
///
/// - Daily: the next occurrence of `start_hour:00:00` UTC.
/// - Weekly: the next occurrence of `start_weekday` at `start_hour:00:00`
///   UTC.
///
/// A slot landing exactly on `now` rolls a full period forward ("strictly
/// after").
pub fn next_deadline(
    spec: &ScheduleSpec,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, JanitorError> {
    spec.validate()?;

    let slot = NaiveTime::from_hms_opt(u32::from(spec.start_hour), 0, 0).ok_or_else(|| {
        JanitorError::InvalidSpec(format!("start_hour {} out of range 0..=23", spec.start_hour))
    })?;

    let mut candidate = Utc.from_utc_datetime(&now.date_naive().and_time(slot));

    match spec.interval {
        Interval::Daily => {
            if candidate <= now {
                candidate += Duration::days(1);
            }
        }
        Interval::Weekly => {
            let target = spec.start_weekday.to_chrono();
            let days_ahead =
                (target.num_days_from_monday() + 7 - now.weekday().num_days_from_monday()) % 7;
            candidate += Duration::days(i64::from(days_ahead));
            if candidate <= now {
                candidate += Duration::days(7);
            }
        }
    }

    Ok(candidate)
}
