// Date utility functions
// Instant arithmetic shared by the temporal engine, list builder and selector

use chrono::{DateTime, Duration, DurationRound, NaiveTime, Timelike, Utc};

/// Whole seconds in `duration`, rounded towards positive infinity.
///
/// Sub-second remainders count as a full second so that countdowns never
/// show "0s" while time is still left.
pub fn ceil_seconds(duration: Duration) -> i64 {
    let secs = duration.num_seconds();
    let remainder = duration - Duration::seconds(secs);
    if remainder > Duration::zero() {
        secs + 1
    } else {
        secs
    }
}

/// Whole seconds in `duration`, rounded towards negative infinity.
pub fn floor_seconds(duration: Duration) -> i64 {
    let secs = duration.num_seconds();
    let remainder = duration - Duration::seconds(secs);
    if remainder < Duration::zero() {
        secs - 1
    } else {
        secs
    }
}

/// Drops seconds and sub-second precision from `instant`.
pub fn truncate_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .duration_trunc(Duration::minutes(1))
        .unwrap_or(instant)
}

pub fn is_midnight(time: NaiveTime) -> bool {
    time.hour() == 0 && time.minute() == 0
}

/// 23:59 is treated as a day boundary too; some calendars store
/// "until the end of the day" that way instead of the next midnight.
pub fn is_day_boundary(time: NaiveTime) -> bool {
    is_midnight(time) || (time.hour() == 23 && time.minute() == 59)
}

/// Converts a possibly negative chrono duration into a non-negative one.
pub fn clamp_non_negative(duration: Duration) -> Duration {
    duration.max(Duration::zero())
}
