//! Hour-based time arithmetic shared by schedules and trips.
//!
//! Durations are carried as fractional hours (`f64`). Conversions go through
//! whole milliseconds so that `hours_between(start, add_hours(start, h))`
//! returns `h` for any duration a person would type.

use chrono::{DateTime, Duration, Utc};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// `start + hours`.
pub fn add_hours(start: DateTime<Utc>, hours: f64) -> DateTime<Utc> {
    let millis = (hours * MILLIS_PER_HOUR).round() as i64;
    start + Duration::milliseconds(millis)
}

/// `(end - start)` in hours. Negative when `end` precedes `start`.
pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / MILLIS_PER_HOUR
}

/// Round to two decimals, the precision durations are reported with.
pub fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}
