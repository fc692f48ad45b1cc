//! Nearest relevant item of the day with a live countdown.
//!
//! The selector only wakes when its label would change: once per second
//! inside the last minute of a countdown, otherwise at the next whole-minute
//! step of the label.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};

use crate::models::color::RgbaColor;
use crate::models::event::Event;
use crate::models::settings::NextEventSettings;
use crate::services::calendar::CalendarContext;
use crate::services::clock::{SharedClock, TimerSlot};
use crate::services::signal::{Signal, Subscription};
use crate::services::temporal::Phase;
use crate::utils::date::{ceil_seconds, floor_seconds};
use crate::utils::format;

const PROGRESS_BACKGROUND_ALPHA: f32 = 0.15;
const MINUTE: i64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct NextEvent {
    pub event_id: String,
    /// Display title, already truncated.
    pub title: String,
    pub color: RgbaColor,
    /// Transparent while upcoming, tinted calendar colour while in progress.
    pub background_color: RgbaColor,
    pub phase: Phase,
}

/// Picks the next event to show, if any.
///
/// All-day events, unanswered invitations, completed reminders and
/// anything already over are skipped; of the rest the earliest start wins,
/// so an event in progress beats any upcoming one.
pub fn select<'a>(events: &'a [Event], now: DateTime<Utc>, calendar: &CalendarContext) -> Option<&'a Event> {
    let today = calendar.local_date(now);
    events
        .iter()
        .filter(|event| event.validate().is_ok())
        .filter(|event| !event.is_all_day && !event.is_pending() && !event.is_completed_reminder())
        .filter(|event| now < event.end && calendar.local_date(event.start) <= today)
        .min_by(|a, b| (a.start, a.end, &a.id).cmp(&(b.start, b.end, &b.id)))
}

fn phase_at(event: &Event, now: DateTime<Utc>) -> Phase {
    if now >= event.end {
        Phase::Past
    } else if now >= event.start {
        Phase::InProgress
    } else {
        Phase::Upcoming
    }
}

/// "in 5m", "25m left", or for a reminder already due, "5m ago".
pub fn countdown_label(event: &Event, now: DateTime<Utc>) -> String {
    match phase_at(event, now) {
        Phase::Upcoming => format!("in {}", format::countdown(ceil_seconds(event.start - now))),
        Phase::InProgress if event.is_reminder() => {
            format!("{} ago", format::elapsed(floor_seconds(now - event.start)))
        }
        Phase::InProgress => format!("{} left", format::countdown(ceil_seconds(event.end - now))),
        Phase::Past => String::new(),
    }
}

/// First instant after `now` at which [`countdown_label`] or the phase
/// of `event` changes.
pub fn next_wake(event: &Event, now: DateTime<Utc>) -> DateTime<Utc> {
    let wake = match phase_at(event, now) {
        Phase::Upcoming => countdown_step(event.start, now),
        Phase::InProgress if event.is_reminder() => {
            let elapsed = floor_seconds(now - event.start);
            let step = if elapsed < MINUTE {
                elapsed + 1
            } else {
                (elapsed / MINUTE + 1) * MINUTE
            };
            event.start + Duration::seconds(step)
        }
        Phase::InProgress => countdown_step(event.end, now),
        Phase::Past => now,
    };
    wake.min(event.end)
}

fn countdown_step(target: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let remaining = ceil_seconds(target - now);
    let keep = if remaining <= MINUTE {
        remaining - 1
    } else {
        MINUTE * ((remaining - 1) / MINUTE)
    };
    target - Duration::seconds(keep.max(0))
}

pub fn truncate_title(title: &str, max_length: usize) -> String {
    if title.chars().count() <= max_length {
        return title.to_string();
    }
    let cut: String = title.chars().take(max_length).collect();
    format!("{}...", cut.trim_end())
}

struct SelectorCore {
    clock: SharedClock,
    calendar: Cell<CalendarContext>,
    events: RefCell<Vec<Event>>,
    settings: RefCell<NextEventSettings>,
    wake: RefCell<TimerSlot>,
    current: Signal<Option<NextEvent>>,
    countdown: Signal<String>,
    has_event: Signal<bool>,
}

impl SelectorCore {
    fn refresh(self: &Rc<Self>) {
        let now = self.clock.now();
        let selected = {
            let events = self.events.borrow();
            let settings = self.settings.borrow();
            if settings.enabled {
                select(&events, now, &self.calendar.get()).map(|event| {
                    let phase = phase_at(event, now);
                    let background_color = if phase == Phase::InProgress {
                        event.calendar_color.with_alpha(PROGRESS_BACKGROUND_ALPHA)
                    } else {
                        RgbaColor::TRANSPARENT
                    };
                    let next = NextEvent {
                        event_id: event.id.clone(),
                        title: truncate_title(&event.title, settings.max_title_length),
                        color: event.calendar_color,
                        background_color,
                        phase,
                    };
                    (next, countdown_label(event, now), next_wake(event, now))
                })
            } else {
                None
            }
        };

        match selected {
            Some((next, label, wake)) => {
                self.arm(wake - now);
                if self.current.get().flatten().map(|e| e.event_id) != Some(next.event_id.clone()) {
                    log::info!("next event is now '{}'", next.event_id);
                }
                self.current.publish_if_changed(Some(next));
                self.countdown.publish_if_changed(label);
                self.has_event.publish_if_changed(true);
            }
            None => {
                self.wake.borrow_mut().cancel();
                self.current.publish_if_changed(None);
                self.countdown.publish_if_changed(String::new());
                self.has_event.publish_if_changed(false);
            }
        }
    }

    fn arm(self: &Rc<Self>, after: Duration) {
        let weak = Rc::downgrade(self);
        let token = self.clock.schedule(
            after,
            Box::new(move || {
                if let Some(core) = weak.upgrade() {
                    core.refresh();
                }
            }),
        );
        self.wake.borrow_mut().arm(token);
    }
}

/// Live "next event" line for today's events.
pub struct NextEventSelector {
    core: Rc<SelectorCore>,
}

impl NextEventSelector {
    pub fn new(clock: SharedClock, calendar: CalendarContext, settings: NextEventSettings) -> Self {
        let core = Rc::new(SelectorCore {
            clock,
            calendar: Cell::new(calendar),
            events: RefCell::new(Vec::new()),
            settings: RefCell::new(settings),
            wake: RefCell::new(TimerSlot::new()),
            current: Signal::new(),
            countdown: Signal::new(),
            has_event: Signal::new(),
        });
        core.refresh();
        Self { core }
    }

    pub fn set_events(&self, events: Vec<Event>) {
        let changed = {
            let mut current = self.core.events.borrow_mut();
            if *current == events {
                false
            } else {
                *current = events;
                true
            }
        };
        if changed {
            self.core.refresh();
        }
    }

    pub fn set_calendar_context(&self, calendar: CalendarContext) {
        if self.core.calendar.replace(calendar) != calendar {
            self.core.refresh();
        }
    }

    pub fn apply_settings(&self, settings: &NextEventSettings) {
        let changed = self.core.settings.replace(settings.clone()) != *settings;
        if changed {
            self.core.refresh();
        }
    }

    pub fn current(&self) -> Option<NextEvent> {
        self.core.current.get().flatten()
    }

    pub fn has_event(&self) -> bool {
        self.core.has_event.get().unwrap_or(false)
    }

    pub fn countdown_label(&self) -> String {
        self.core.countdown.get().unwrap_or_default()
    }

    /// Instant of the next scheduled refresh, if one is pending.
    pub fn next_refresh(&self) -> Option<DateTime<Utc>> {
        self.core.wake.borrow().deadline()
    }

    pub fn subscribe(&self, observer: impl Fn(&Option<NextEvent>) + 'static) -> Subscription {
        self.core.current.subscribe(observer)
    }

    pub fn subscribe_countdown(&self, observer: impl Fn(&String) + 'static) -> Subscription {
        self.core.countdown.subscribe(observer)
    }

    pub fn subscribe_has_event(&self, observer: impl Fn(&bool) + 'static) -> Subscription {
        self.core.has_event.subscribe(observer)
    }
}
