// Event list layout
// Buckets, section headers, interval gaps and counts for one rebuild

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::color::RgbaColor;
use crate::models::event::Event;
use crate::services::presentation::{self, EventPresentationModel, PresentationContext};
use crate::services::temporal::TemporalState;
use crate::utils::date::truncate_to_minute;
use crate::utils::format;

use super::models::{EventListSnapshot, IntervalGap, ListItem};

/// Shortest free interval that earns a gap row, in seconds.
const MIN_GAP_SECONDS: i64 = 60;

pub(super) const ALL_DAY_HEADER: &str = "All day";
pub(super) const TODAY_HEADER: &str = "Today";

/// Identifies a gap by the events on either side of it.
type GapKey = (String, String);

/// Remembers which gaps have faded. A gap keeps its fade for as long as
/// consecutive rebuilds keep listing it.
#[derive(Debug, Default)]
pub(super) struct GapLatch {
    latched: HashSet<GapKey>,
    seen: HashSet<GapKey>,
}

impl GapLatch {
    fn begin(&mut self) {
        self.seen.clear();
    }

    fn resolve(&mut self, key: GapKey, fade: bool) -> bool {
        if fade {
            self.latched.insert(key.clone());
        }
        let latched = self.latched.contains(&key);
        self.seen.insert(key);
        latched
    }

    fn finish(&mut self) {
        let seen = &self.seen;
        self.latched.retain(|key| seen.contains(key));
    }

    pub(super) fn clear(&mut self) {
        self.latched.clear();
        self.seen.clear();
    }
}

/// Result of one layout pass.
pub(super) struct Layout {
    pub snapshot: EventListSnapshot,
    /// True when `now` sits inside a gap whose label counts down from now.
    pub has_live_gap: bool,
}

struct Row<'a> {
    event: &'a Event,
    model: EventPresentationModel,
}

impl Row<'_> {
    fn is_timed(&self) -> bool {
        !self.event.is_all_day
    }

    fn fades_gap(&self) -> bool {
        self.model.is_faded || self.model.is_in_progress()
    }
}

/// Lays out `rows` (each event with its state at `cx.now`) for
/// `selected_day`.
pub(super) fn layout(
    rows: &[(&Event, TemporalState)],
    selected_day: NaiveDate,
    cx: &PresentationContext,
    latch: &mut GapLatch,
) -> Layout {
    let calendar = &cx.calendar;
    let today = calendar.local_date(cx.now);

    let mut overdue = Vec::new();
    let mut all_day = Vec::new();
    let mut timed = Vec::new();
    let mut future = Vec::new();

    for &(event, state) in rows {
        if !presentation::is_visible(event, state, cx) {
            continue;
        }
        let start_day = calendar.local_date(event.start);
        let row = Row {
            event,
            model: EventPresentationModel::derive(event, state, cx),
        };

        if cx.is_today_selected && event.is_incomplete_reminder() && start_day < today {
            if cx.show_overdue_reminders {
                overdue.push(row);
            }
        } else if start_day > selected_day {
            future.push(row);
        } else if event.is_all_day {
            all_day.push(row);
        } else {
            timed.push(row);
        }
    }

    overdue.sort_by_key(|row| row.event.start);
    all_day.sort_by(|a, b| {
        let (a, b) = (a.event, b.event);
        (&a.calendar_title, a.calendar_color, &a.title, &a.id)
            .cmp(&(&b.calendar_title, b.calendar_color, &b.title, &b.id))
    });
    timed.sort_by_key(|row| (row.event.start, row.event.end));
    future.sort_by_key(|row| (row.event.start, row.event.end, row.event.is_all_day));

    let due_today: Vec<&Row> = timed
        .iter()
        .filter(|row| row.model.is_reminder() && row.model.is_in_progress())
        .collect();
    let pending: Vec<&Row> = timed
        .iter()
        .filter(|row| !row.model.is_faded)
        .filter(|row| !(row.model.is_reminder() && row.model.is_in_progress()))
        .collect();

    let overdue_count = overdue.len() + due_today.len();
    let overdue_colors = colors_of(overdue.iter().chain(due_today.iter().copied()));
    let all_day_count = all_day.len();
    let all_day_colors = colors_of(all_day.iter());
    let pending_count = pending.len();
    let pending_colors = colors_of(pending.iter().copied());

    let mut builder = ItemsBuilder {
        items: Vec::with_capacity(rows.len() + 8),
        cx,
        latch,
        has_live_gap: false,
    };
    builder.latch.begin();

    let mut overdue_day = None;
    for row in overdue {
        let day = calendar.local_date(row.event.start);
        if overdue_day != Some(day) {
            let header = if cx.is_today_selected {
                format::relative_day(day, today)
            } else {
                format::section_date(day)
            };
            builder.items.push(ListItem::SectionHeader(header));
            overdue_day = Some(day);
        }
        builder.items.push(ListItem::EventRow(row.model));
    }

    if !all_day.is_empty() {
        builder
            .items
            .push(ListItem::SectionHeader(ALL_DAY_HEADER.to_string()));
        builder
            .items
            .extend(all_day.into_iter().map(|row| ListItem::EventRow(row.model)));
    }

    if !timed.is_empty() {
        let header = if cx.is_today_selected {
            TODAY_HEADER.to_string()
        } else {
            format::section_date(selected_day)
        };
        builder.items.push(ListItem::SectionHeader(header));
        builder.push_day(timed);
    }

    let mut day_rows: Vec<Row> = Vec::new();
    let mut current_day = None;
    for row in future {
        let day = calendar.local_date(row.event.start);
        if current_day != Some(day) {
            builder.push_day(std::mem::take(&mut day_rows));
            builder
                .items
                .push(ListItem::SectionHeader(format::section_date(day)));
            current_day = Some(day);
        }
        day_rows.push(row);
    }
    builder.push_day(day_rows);

    builder.latch.finish();
    let has_live_gap = builder.has_live_gap;
    let items = builder.items;

    Layout {
        snapshot: EventListSnapshot {
            items,
            overdue_count,
            overdue_colors,
            all_day_count,
            all_day_colors,
            pending_count,
            pending_colors,
        },
        has_live_gap,
    }
}

struct ItemsBuilder<'c, 'l> {
    items: Vec<ListItem>,
    cx: &'c PresentationContext,
    latch: &'l mut GapLatch,
    has_live_gap: bool,
}

impl ItemsBuilder<'_, '_> {
    /// Pushes one day's sorted rows with gaps between consecutive timed rows.
    fn push_day(&mut self, rows: Vec<Row>) {
        let mut previous: Option<Row> = None;
        for row in rows {
            if let Some(prev) = &previous {
                if let Some(gap) = self.gap_between(prev, &row) {
                    self.items.push(ListItem::IntervalGap(gap));
                }
            }
            let model = row.model.clone();
            previous = Some(row);
            self.items.push(ListItem::EventRow(model));
        }
    }

    fn gap_between(&mut self, prev: &Row, next: &Row) -> Option<IntervalGap> {
        if !prev.is_timed() || !next.is_timed() {
            return None;
        }
        let from = prev.event.end;
        let to = next.event.start;
        if (to - from).num_seconds() < MIN_GAP_SECONDS {
            return None;
        }

        let now = self.cx.now;
        let counted_from = if self.cx.is_today_selected && from < now && now < to {
            self.has_live_gap = true;
            live_gap_start(now, from)
        } else {
            from
        };

        let key = (prev.event.id.clone(), next.event.id.clone());
        let fade = self
            .latch
            .resolve(key, prev.fades_gap() || next.fades_gap());

        Some(IntervalGap {
            label: format::abbreviated_duration((to - counted_from).num_seconds()),
            fade,
        })
    }
}

fn colors_of<'r, 'e: 'r>(rows: impl Iterator<Item = &'r Row<'e>>) -> BTreeSet<RgbaColor> {
    rows.map(|row| row.model.color).collect()
}

fn live_gap_start(now: DateTime<Utc>, gap_start: DateTime<Utc>) -> DateTime<Utc> {
    truncate_to_minute(now).max(gap_start)
}
