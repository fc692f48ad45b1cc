use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::models::color::RgbaColor;
use crate::models::event::Event;
use crate::services::calendar::CalendarContext;
use crate::services::presentation::EventPresentationModel;

/// Free time between two consecutive timed events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalGap {
    /// Abbreviated length of the gap, e.g. "1h 5m".
    pub label: String,
    /// Latched: once true it stays true for as long as the gap is listed.
    pub fade: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListItem {
    SectionHeader(String),
    IntervalGap(IntervalGap),
    EventRow(EventPresentationModel),
}

impl ListItem {
    pub fn as_event(&self) -> Option<&EventPresentationModel> {
        match self {
            ListItem::EventRow(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_header(&self) -> Option<&str> {
        match self {
            ListItem::SectionHeader(text) => Some(text),
            _ => None,
        }
    }
}

/// One published state of the list. Rebuilt wholesale, never patched.
///
/// Each count comes with the distinct calendar colours of the rows it
/// counts, for summary badges.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventListSnapshot {
    pub items: Vec<ListItem>,
    pub overdue_count: usize,
    pub overdue_colors: BTreeSet<RgbaColor>,
    pub all_day_count: usize,
    pub all_day_colors: BTreeSet<RgbaColor>,
    pub pending_count: usize,
    pub pending_colors: BTreeSet<RgbaColor>,
}

impl EventListSnapshot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn event_rows(&self) -> impl Iterator<Item = &EventPresentationModel> {
        self.items.iter().filter_map(ListItem::as_event)
    }

    pub fn event_ids(&self) -> Vec<&str> {
        self.event_rows().map(|row| row.event_id.as_str()).collect()
    }
}

/// Everything the list is derived from, apart from the clock.
#[derive(Debug, Clone, PartialEq)]
pub struct ListInputs {
    pub events: Vec<Event>,
    pub selected_date: DateTime<Utc>,
    pub show_past_events: bool,
    pub show_overdue_reminders: bool,
    /// While a details popover is open the list is frozen.
    pub is_showing_details_modal: bool,
    pub calendar: CalendarContext,
}

impl ListInputs {
    pub fn new(selected_date: DateTime<Utc>, calendar: CalendarContext) -> Self {
        Self {
            events: Vec::new(),
            selected_date,
            show_past_events: true,
            show_overdue_reminders: true,
            is_showing_details_modal: false,
            calendar,
        }
    }
}
