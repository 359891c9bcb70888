//! Pure time-interval helpers shared by the validation pipeline and the slot
//! generator. Keeping a single implementation here is what guarantees the two
//! paths can never disagree about overlap or advance-notice semantics.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid time of day: {0:?}")]
pub struct TimeParseError(pub String);

/// Parse `"HH:MM"` (or `"HH:MM:SS"`, seconds ignored) into minutes since
/// midnight. Rules arrive from clients as strings; this is the only place
/// they are parsed.
pub fn time_to_minutes(text: &str) -> Result<u32, TimeParseError> {
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return Err(TimeParseError(text.to_string()));
    }

    let hours: u32 = parts[0]
        .parse()
        .map_err(|_| TimeParseError(text.to_string()))?;
    let minutes: u32 = parts[1]
        .parse()
        .map_err(|_| TimeParseError(text.to_string()))?;

    if parts.len() == 3 {
        let _seconds: u32 = parts[2]
            .parse()
            .map_err(|_| TimeParseError(text.to_string()))?;
    }

    if hours >= 24 || minutes >= 60 {
        return Err(TimeParseError(text.to_string()));
    }

    Ok(hours * 60 + minutes)
}

/// Inverse of [`time_to_minutes`]: zero-padded `"HH:MM"`.
pub fn minutes_to_time(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Half-open interval overlap test: `[a_start, a_end)` vs `[b_start, b_end)`.
/// Intervals that only touch at an endpoint do NOT overlap, which is what
/// lets back-to-back bookings coexist.
pub fn overlaps<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && a_end > b_start
}

pub fn duration_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_minutes()
}

/// Day of week as 0=Sunday..6=Saturday, the convention availability rules
/// are stored in.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Minutes since midnight of a UTC instant. Callers are responsible for
/// normalizing timestamps to the reference clock; no local-time conversion
/// happens here.
pub fn minutes_of_day(instant: DateTime<Utc>) -> u32 {
    instant.hour() * 60 + instant.minute()
}

pub fn naive_time_minutes(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

pub fn naive_time_from_minutes(minutes: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}
