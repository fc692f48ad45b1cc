// Presentation module
// Business rules turning an event and its temporal state into a list row

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::models::color::RgbaColor;
use crate::models::event::{Event, EventKind};
use crate::services::calendar::CalendarContext;
use crate::services::temporal::TemporalState;
use crate::utils::format;

/// Alpha applied to the calendar colour behind an in-progress row.
const PROGRESS_BACKGROUND_ALPHA: f32 = 0.15;

/// Inputs shared by every row of one list build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresentationContext {
    pub now: DateTime<Utc>,
    pub calendar: CalendarContext,
    pub is_today_selected: bool,
    pub show_past_events: bool,
    pub show_overdue_reminders: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventPresentationModel {
    pub event_id: String,
    pub title: String,
    pub kind: EventKind,
    pub color: RgbaColor,
    pub state: TemporalState,
    pub is_faded: bool,
    pub duration_label: String,
    /// Reminders only: how long ago the reminder fell due.
    pub relative_label: Option<String>,
    pub background_color: RgbaColor,
}

impl EventPresentationModel {
    pub fn derive(event: &Event, state: TemporalState, cx: &PresentationContext) -> Self {
        let background_color = if state.is_in_progress() {
            event.calendar_color.with_alpha(PROGRESS_BACKGROUND_ALPHA)
        } else {
            RgbaColor::TRANSPARENT
        };

        Self {
            event_id: event.id.clone(),
            title: event.title.clone(),
            kind: event.kind,
            color: event.calendar_color,
            state,
            is_faded: is_faded(event, state, cx),
            duration_label: duration_label(event, &cx.calendar),
            relative_label: relative_label(event, cx.now),
            background_color,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.state.is_in_progress()
    }

    pub fn is_reminder(&self) -> bool {
        matches!(self.kind, EventKind::Reminder { .. })
    }
}

pub fn is_faded(event: &Event, state: TemporalState, cx: &PresentationContext) -> bool {
    if event.is_declined() {
        return true;
    }
    if let EventKind::Reminder { completed } = event.kind {
        return cx.is_today_selected && completed;
    }
    let range = event.range(&cx.calendar);
    if event.is_all_day || (!range.is_single_day() && !range.ends_today(cx.now)) {
        return false;
    }
    state.is_past()
}

/// Whether a row stays in the list. With past events hidden on today's
/// list, completed reminders and ended timed events drop out.
pub fn is_visible(event: &Event, state: TemporalState, cx: &PresentationContext) -> bool {
    if cx.show_past_events || !cx.is_today_selected {
        return true;
    }
    if let EventKind::Reminder { completed } = event.kind {
        return !completed;
    }
    event.is_all_day || !state.is_past()
}

pub fn duration_label(event: &Event, calendar: &CalendarContext) -> String {
    let range = event.range(calendar);
    let show_time = !(range.starts_midnight() && range.ends_midnight());

    if event.is_all_day && range.is_single_day() {
        return String::new();
    }

    if range.is_single_day() {
        let end = if event.is_reminder() {
            event.start
        } else if range.ends_midnight() {
            calendar
                .start_of_day(range.start_date())
                .unwrap_or(event.start)
        } else {
            event.end
        };
        return time_interval(event.start, end, event.time_zone, calendar.time_zone());
    }

    if !show_time {
        let start = range.start_date();
        let end = range.end_date();
        return if range.is_same_month() {
            format!("{} – {}", start.format("%-d"), end.format("%-d %B"))
        } else {
            format!("{} – {}", start.format("%-d %b"), end.format("%-d %b"))
        };
    }

    let start = calendar.to_local(event.start).format("%d/%m/%Y %H:%M");
    let end = calendar.to_local(event.end).format("%d/%m/%Y %H:%M");
    format!("{}\n{}", start, end)
}

/// "10:00 – 10:30", or a bare "10:00" when both ends coincide. An event
/// pinned to another zone is shown in that zone with its abbreviation.
fn time_interval(start: DateTime<Utc>, end: DateTime<Utc>, pinned: Option<Tz>, zone: Tz) -> String {
    let display_zone = pinned.filter(|tz| *tz != zone).unwrap_or(zone);

    let from = start.with_timezone(&display_zone).format("%H:%M").to_string();
    let mut label = if start == end {
        from
    } else {
        let to = end.with_timezone(&display_zone).format("%H:%M");
        format!("{} – {}", from, to)
    };

    if display_zone != zone {
        let abbreviation = start.with_timezone(&display_zone).format("%Z");
        label = format!("{} ({})", label, abbreviation);
    }
    label
}

pub fn relative_label(event: &Event, now: DateTime<Utc>) -> Option<String> {
    if !event.is_reminder() || event.start > now {
        return None;
    }
    let seconds = (now - event.start).num_seconds();
    Some(format!("{} ago", format::elapsed(seconds)))
}
