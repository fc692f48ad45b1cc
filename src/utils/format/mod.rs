// Label formatting
// Abbreviated durations, countdowns and day-relative section titles

use chrono::NaiveDate;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Formats a span as abbreviated hours and minutes ("2m", "1h", "1h 5m").
///
/// Seconds are dropped; negative spans format as "0m".
pub fn abbreviated_duration(seconds: i64) -> String {
    let minutes = seconds.max(0) / MINUTE;
    hours_and_minutes(minutes)
}

/// Countdown text for a span still to elapse.
///
/// Under a minute the label is in seconds; otherwise minutes are rounded up
/// (never below "1m") and spans of an hour or more gain an hour component.
pub fn countdown(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < MINUTE {
        return format!("{}s", seconds);
    }
    let minutes = (seconds + MINUTE - 1) / MINUTE;
    hours_and_minutes(minutes.max(1))
}

/// Text for a span that has already elapsed, rounded down.
pub fn elapsed(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < MINUTE {
        format!("{}s", seconds)
    } else if seconds < DAY {
        hours_and_minutes(seconds / MINUTE)
    } else {
        format!("{}d", seconds / DAY)
    }
}

fn hours_and_minutes(total_minutes: i64) -> String {
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    match (hours, minutes) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// Named relative day ("Today", "Yesterday", "3 days ago", "In 2 days").
pub fn relative_day(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "Today".to_string(),
        -1 => "Yesterday".to_string(),
        1 => "Tomorrow".to_string(),
        days if days < 0 => format!("{} days ago", -days),
        days => format!("In {} days", days),
    }
}

/// Long absolute date used for section headers, e.g. "Friday 16 Oct".
pub fn section_date(date: NaiveDate) -> String {
    date.format("%A %-d %b").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, "0m")]
    #[test_case(59, "0m")]
    #[test_case(120, "2m")]
    #[test_case(3600, "1h")]
    #[test_case(3900, "1h 5m")]
    #[test_case(-30, "0m")]
    fn abbreviated_duration_formats(seconds: i64, expected: &str) {
        assert_eq!(abbreviated_duration(seconds), expected);
    }

    #[test_case(0, "0s")]
    #[test_case(45, "45s")]
    #[test_case(60, "1m")]
    #[test_case(61, "2m")]
    #[test_case(3540, "59m")]
    #[test_case(3541, "1h")]
    #[test_case(3600, "1h")]
    #[test_case(3660, "1h 1m")]
    #[test_case(7200, "2h")]
    fn countdown_formats(seconds: i64, expected: &str) {
        assert_eq!(countdown(seconds), expected);
    }

    #[test_case(5, "5s")]
    #[test_case(330, "5m")]
    #[test_case(7260, "2h 1m")]
    #[test_case(3 * 86400 + 10, "3d")]
    fn elapsed_formats(seconds: i64, expected: &str) {
        assert_eq!(elapsed(seconds), expected);
    }

    #[test]
    fn relative_day_names_nearby_days() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(relative_day(today, today), "Today");
        assert_eq!(relative_day(today.pred_opt().unwrap(), today), "Yesterday");
        assert_eq!(
            relative_day(NaiveDate::from_ymd_opt(2026, 10, 13).unwrap(), today),
            "3 days ago"
        );
        assert_eq!(
            relative_day(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(), today),
            "In 2 days"
        );
    }

    #[test]
    fn section_date_uses_weekday_day_month() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(section_date(date), "Friday 16 Oct");
    }
}
