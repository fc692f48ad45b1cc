// Date range module
// Day-relative facts about an event's span, evaluated in a calendar context

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::services::calendar::CalendarContext;
use crate::utils::date::{is_day_boundary, is_midnight};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    calendar: CalendarContext,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, calendar: CalendarContext) -> Self {
        Self {
            start,
            end,
            calendar,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// End pulled back one second so a span ending at 00:00 belongs to the
    /// day before.
    pub fn fixed_end(&self) -> DateTime<Utc> {
        if self.end <= self.start {
            self.end
        } else {
            self.end - Duration::seconds(1)
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.calendar.local_date(self.start)
    }

    pub fn end_date(&self) -> NaiveDate {
        self.calendar.local_date(self.fixed_end())
    }

    pub fn is_single_day(&self) -> bool {
        self.start_date() == self.end_date()
    }

    pub fn is_same_month(&self) -> bool {
        let (start, end) = (self.start_date(), self.end_date());
        start.year() == end.year() && start.month() == end.month()
    }

    pub fn starts_midnight(&self) -> bool {
        is_midnight(self.calendar.local_time(self.start))
    }

    pub fn ends_midnight(&self) -> bool {
        is_day_boundary(self.calendar.local_time(self.end))
    }

    pub fn starts_today(&self, now: DateTime<Utc>) -> bool {
        self.calendar.is_same_day(self.start, now)
    }

    pub fn ends_today(&self, now: DateTime<Utc>) -> bool {
        self.calendar.is_same_day(self.fixed_end(), now)
    }

    /// The span is over once `now` reaches `end`.
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        now >= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn range(start: (u32, u32, u32), end: (u32, u32, u32)) -> DateRange {
        DateRange::new(
            Utc.with_ymd_and_hms(2026, 10, start.0, start.1, start.2, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 10, end.0, end.1, end.2, 0).unwrap(),
            CalendarContext::utc(),
        )
    }

    #[test]
    fn span_ending_at_next_midnight_is_single_day() {
        let r = range((16, 0, 0), (17, 0, 0));
        assert!(r.is_single_day());
        assert!(r.starts_midnight());
        assert!(r.ends_midnight());
        assert_eq!(r.end_date(), NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
    }

    #[test]
    fn span_across_days_is_multi_day() {
        let r = range((16, 22, 0), (17, 2, 0));
        assert!(!r.is_single_day());
        assert!(r.is_same_month());
        assert!(!r.ends_midnight());
    }

    #[test]
    fn zero_length_span_keeps_its_end() {
        let r = range((16, 9, 0), (16, 9, 0));
        assert_eq!(r.fixed_end(), r.end());
        assert!(r.is_single_day());
    }

    #[test]
    fn past_from_end_instant() {
        let r = range((16, 9, 0), (16, 10, 0));
        assert!(!r.is_past(Utc.with_ymd_and_hms(2026, 10, 16, 9, 59, 59).unwrap()));
        assert!(r.is_past(r.end()));
    }
}
