// Test fixtures - reusable test data
// Provides consistent instants, events and clocks across the test files

#![allow(dead_code)]

use std::rc::Rc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use event_timeline::models::color::RgbaColor;
use event_timeline::models::event::{Event, InvitationStatus};
use event_timeline::services::calendar::CalendarContext;
use event_timeline::services::clock::VirtualClock;

/// Sample instants for testing. "Today" is Friday 16 October 2026, UTC.
pub mod dates {
    use super::*;

    /// Returns today at `h:m:s`
    pub fn today_at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, h, m, s).unwrap()
    }

    /// Returns `days` days from today at `h:m`
    pub fn day_offset(days: i64, h: u32, m: u32) -> DateTime<Utc> {
        today_at(h, m, 0) + Duration::days(days)
    }

    /// Returns the first instant of today
    pub fn start_of_today() -> DateTime<Utc> {
        today_at(0, 0, 0)
    }
}

/// Sample events for testing
pub mod events {
    use super::*;

    pub fn work_color() -> RgbaColor {
        RgbaColor::rgb(59, 130, 246)
    }

    /// Creates a timed event on the "Work" calendar
    pub fn timed(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Event {
        Event::builder(id)
            .title(format!("Event {}", id))
            .start(start)
            .end(end)
            .calendar("Work", work_color())
            .build()
            .unwrap()
    }

    /// Creates an all-day event covering the day of `day_start`
    pub fn all_day(id: &str, day_start: DateTime<Utc>) -> Event {
        Event::builder(id)
            .title(format!("All day {}", id))
            .start(day_start)
            .end(day_start + Duration::days(1))
            .all_day(true)
            .calendar("Holidays", RgbaColor::rgb(16, 185, 129))
            .build()
            .unwrap()
    }

    /// Creates a reminder due at `due`
    pub fn reminder(id: &str, due: DateTime<Utc>, completed: bool) -> Event {
        Event::reminder(id, format!("Reminder {}", id), due, completed, &CalendarContext::utc()).unwrap()
    }

    /// Creates an invitation carrying `status`
    pub fn invitation(id: &str, start: DateTime<Utc>, end: DateTime<Utc>, status: InvitationStatus) -> Event {
        Event::builder(id)
            .title(format!("Invite {}", id))
            .start(start)
            .end(end)
            .status(status)
            .build()
            .unwrap()
    }
}

/// Virtual clock shared as an `Rc` the way engines and builders expect it
pub fn clock_at(now: DateTime<Utc>) -> Rc<VirtualClock> {
    Rc::new(VirtualClock::new(now))
}
