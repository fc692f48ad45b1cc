// Calendar context
// Time zone and week rules used for every day-granularity comparison

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

/// Calendar rules in effect for the current user.
///
/// Day boundaries ("is this today?", "start of day") are always evaluated in
/// [`CalendarContext::time_zone`]; instants themselves stay in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarContext {
    time_zone: Tz,
    first_weekday: Weekday,
}

impl Default for CalendarContext {
    fn default() -> Self {
        Self::utc()
    }
}

impl CalendarContext {
    pub fn new(time_zone: Tz, first_weekday: Weekday) -> Self {
        Self {
            time_zone,
            first_weekday,
        }
    }

    pub fn utc() -> Self {
        Self::new(Tz::UTC, Weekday::Mon)
    }

    /// Context for the machine's zone, as the operating system reports it.
    /// Falls back to UTC when the zone cannot be read or is not an IANA name.
    pub fn from_environment() -> Self {
        match iana_time_zone::get_timezone() {
            Ok(name) => Self::from_zone_name(Some(&name)),
            Err(err) => {
                log::warn!("Could not read the system time zone ({}); using UTC day boundaries", err);
                Self::from_zone_name(None)
            }
        }
    }

    /// Context for an IANA zone name such as `Europe/Berlin`. A leading `:`
    /// (POSIX `TZ` form) is ignored.
    pub fn from_zone_name(name: Option<&str>) -> Self {
        let Some(name) = name.map(|name| name.trim().trim_start_matches(':')) else {
            return Self::utc();
        };
        match name.parse::<Tz>() {
            Ok(zone) => Self::new(zone, Weekday::Mon),
            Err(_) => {
                log::warn!("'{}' is not a known time zone; using UTC day boundaries", name);
                Self::utc()
            }
        }
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub fn first_weekday(&self) -> Weekday {
        self.first_weekday
    }

    pub fn to_local(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.time_zone)
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.to_local(instant).date_naive()
    }

    pub fn local_time(&self, instant: DateTime<Utc>) -> NaiveTime {
        self.to_local(instant).time()
    }

    pub fn is_same_day(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        self.local_date(a) == self.local_date(b)
    }

    /// First instant of `date`. On days where midnight falls in a DST gap
    /// the first valid local time after the gap is used.
    pub fn start_of_day(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let mut candidate = date.and_time(NaiveTime::MIN);
        // DST gaps are at most a few hours wide.
        for _ in 0..4 {
            match self.time_zone.from_local_datetime(&candidate) {
                LocalResult::Single(local) => return Some(local.with_timezone(&Utc)),
                LocalResult::Ambiguous(earliest, _) => return Some(earliest.with_timezone(&Utc)),
                LocalResult::None => candidate += Duration::hours(1),
            }
        }
        None
    }

    /// Last whole second of `date` (23:59:59 local).
    pub fn end_of_day(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let next = date.succ_opt()?;
        self.start_of_day(next).map(|start| start - Duration::seconds(1))
    }

    /// Local date of the first day of the week containing `date`.
    pub fn start_of_week(&self, date: NaiveDate) -> NaiveDate {
        let offset = (7 + date.weekday().num_days_from_monday()
            - self.first_weekday.num_days_from_monday())
            % 7;
        date - Duration::days(i64::from(offset))
    }
}
