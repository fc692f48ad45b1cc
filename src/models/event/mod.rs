// Event module
// Immutable calendar event / reminder value consumed by the timeline

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::color::RgbaColor;
use crate::models::date_range::DateRange;
use crate::services::calendar::CalendarContext;

/// The user's answer to a meeting invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Accepted,
    Maybe,
    Pending,
    Declined,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Plain {
        #[serde(default)]
        status: InvitationStatus,
    },
    Reminder {
        completed: bool,
    },
    Birthday,
}

impl Default for EventKind {
    fn default() -> Self {
        EventKind::Plain {
            status: InvitationStatus::Unknown,
        }
    }
}

/// Calendar event or reminder.
///
/// Events are never mutated in place: an edited event arrives as a new
/// value carrying the same `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    /// For reminders this is the last second of the due day.
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub kind: EventKind,
    #[serde(default)]
    pub time_zone: Option<Tz>,
    #[serde(default)]
    pub calendar_title: String,
    #[serde(default)]
    pub calendar_color: RgbaColor,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventValidationError {
    #[error("event id is required")]
    MissingId,
    #[error("event start time is required")]
    MissingStart,
    #[error("event end time is required")]
    MissingEnd,
    #[error("event end ({end}) is before its start ({start})")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("reminder due date has no end of day in the current calendar")]
    NoEndOfDay,
}

impl Event {
    /// Create a builder for constructing events with optional fields
    pub fn builder(id: impl Into<String>) -> EventBuilder {
        EventBuilder::new(id)
    }

    /// Reminder due at `due`; its end is the last second of the due day.
    pub fn reminder(
        id: impl Into<String>,
        title: impl Into<String>,
        due: DateTime<Utc>,
        completed: bool,
        calendar: &CalendarContext,
    ) -> Result<Self, EventValidationError> {
        let end = calendar
            .end_of_day(calendar.local_date(due))
            .ok_or(EventValidationError::NoEndOfDay)?;
        Event::builder(id)
            .title(title)
            .start(due)
            .end(end.max(due))
            .kind(EventKind::Reminder { completed })
            .build()
    }

    /// Checks the invariants the timeline relies on.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        if self.id.trim().is_empty() {
            return Err(EventValidationError::MissingId);
        }
        if self.end < self.start {
            return Err(EventValidationError::EndBeforeStart {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn range(&self, calendar: &CalendarContext) -> DateRange {
        DateRange::new(self.start, self.end, *calendar)
    }

    pub fn is_reminder(&self) -> bool {
        matches!(self.kind, EventKind::Reminder { .. })
    }

    pub fn is_completed_reminder(&self) -> bool {
        matches!(self.kind, EventKind::Reminder { completed: true })
    }

    pub fn is_incomplete_reminder(&self) -> bool {
        matches!(self.kind, EventKind::Reminder { completed: false })
    }

    pub fn invitation_status(&self) -> Option<InvitationStatus> {
        match self.kind {
            EventKind::Plain { status } => Some(status),
            _ => None,
        }
    }

    pub fn is_declined(&self) -> bool {
        self.invitation_status() == Some(InvitationStatus::Declined)
    }

    /// Invitation not yet answered.
    pub fn is_pending(&self) -> bool {
        self.invitation_status() == Some(InvitationStatus::Pending)
    }
}

/// Builder for creating events with optional fields
pub struct EventBuilder {
    id: String,
    title: String,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    is_all_day: bool,
    kind: EventKind,
    time_zone: Option<Tz>,
    calendar_title: String,
    calendar_color: RgbaColor,
}

impl EventBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            start: None,
            end: None,
            is_all_day: false,
            kind: EventKind::default(),
            time_zone: None,
            calendar_title: String::new(),
            calendar_color: RgbaColor::default(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn all_day(mut self, all_day: bool) -> Self {
        self.is_all_day = all_day;
        self
    }

    pub fn kind(mut self, kind: EventKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn status(self, status: InvitationStatus) -> Self {
        self.kind(EventKind::Plain { status })
    }

    pub fn time_zone(mut self, time_zone: Tz) -> Self {
        self.time_zone = Some(time_zone);
        self
    }

    /// Set the owning calendar's title and colour
    pub fn calendar(mut self, title: impl Into<String>, color: RgbaColor) -> Self {
        self.calendar_title = title.into();
        self.calendar_color = color;
        self
    }

    pub fn build(self) -> Result<Event, EventValidationError> {
        let start = self.start.ok_or(EventValidationError::MissingStart)?;
        let end = self.end.ok_or(EventValidationError::MissingEnd)?;

        let event = Event {
            id: self.id,
            title: self.title,
            start,
            end,
            is_all_day: self.is_all_day,
            kind: self.kind,
            time_zone: self.time_zone,
            calendar_title: self.calendar_title,
            calendar_color: self.calendar_color,
        };

        event.validate()?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, h, m, 0).unwrap()
    }

    #[test]
    fn builder_requires_start_and_end() {
        let result = Event::builder("a").title("Standup").start(at(9, 0)).build();
        assert_eq!(result.unwrap_err(), EventValidationError::MissingEnd);
    }

    #[test]
    fn builder_rejects_end_before_start() {
        let result = Event::builder("a").start(at(10, 0)).end(at(9, 0)).build();
        assert!(matches!(
            result,
            Err(EventValidationError::EndBeforeStart { .. })
        ));
    }

    #[test]
    fn zero_duration_is_valid() {
        let event = Event::builder("a").start(at(9, 0)).end(at(9, 0)).build().unwrap();
        assert_eq!(event.duration(), Duration::zero());
    }

    #[test]
    fn reminder_ends_at_end_of_due_day() {
        let ctx = CalendarContext::utc();
        let reminder = Event::reminder("r", "Pay rent", at(14, 0), false, &ctx).unwrap();
        assert_eq!(reminder.end, Utc.with_ymd_and_hms(2026, 10, 16, 23, 59, 59).unwrap());
        assert!(reminder.is_incomplete_reminder());
        assert_eq!(reminder.invitation_status(), None);
    }

    #[test]
    fn deserializes_tagged_kind() {
        let json = r##"{
            "id": "e1",
            "title": "Review",
            "start": "2026-10-16T09:00:00Z",
            "end": "2026-10-16T09:30:00Z",
            "kind": { "type": "plain", "status": "declined" },
            "time_zone": "Asia/Tokyo",
            "calendar_color": "#3B82F6"
        }"##;
        let event: Event = serde_json::from_str(json).unwrap();
        assert!(event.is_declined());
        assert_eq!(event.time_zone, Some(chrono_tz::Asia::Tokyo));
        assert!(!event.is_all_day);
    }
}
