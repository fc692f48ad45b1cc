//! Live lifecycle state of a single event.
//!
//! An [`EventTemporalEngine`] owns at most two timers: the terminal wake-up
//! at the event's end, and (for events that show progress) a tick that starts
//! at the event's start and repeats every second until the terminal wake-up
//! cancels it. Dropping the engine cancels both.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use chrono::{DateTime, Duration, Utc};

use crate::models::event::Event;
use crate::services::calendar::CalendarContext;
use crate::services::clock::{SharedClock, TimerSlot};
use crate::services::signal::{Signal, Subscription};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TemporalState {
    Upcoming,
    /// Fraction of the event elapsed, in `[0, 1]`.
    InProgress(f64),
    Past,
}

/// [`TemporalState`] without the progress payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Upcoming,
    InProgress,
    Past,
}

impl TemporalState {
    pub fn phase(&self) -> Phase {
        match self {
            TemporalState::Upcoming => Phase::Upcoming,
            TemporalState::InProgress(_) => Phase::InProgress,
            TemporalState::Past => Phase::Past,
        }
    }

    pub fn is_past(&self) -> bool {
        matches!(self, TemporalState::Past)
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, TemporalState::InProgress(_))
    }

    pub fn progress(&self) -> Option<f64> {
        match self {
            TemporalState::InProgress(progress) => Some(*progress),
            _ => None,
        }
    }

    /// State of an event spanning `[start, end)` at `now`.
    pub fn evaluate(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
        tracks_progress: bool,
    ) -> Self {
        if now >= end {
            return TemporalState::Past;
        }
        if !tracks_progress || now < start {
            return TemporalState::Upcoming;
        }
        let total = (end - start).num_milliseconds() as f64;
        let elapsed = (now - start).num_milliseconds() as f64;
        TemporalState::InProgress((elapsed / total).clamp(0.0, 1.0))
    }
}

/// Whether `event` reports [`TemporalState::InProgress`] at all: it must
/// have a positive duration, not be all-day, sit within one day, and that
/// day must be today.
pub fn tracks_progress(event: &Event, calendar: &CalendarContext, now: DateTime<Utc>) -> bool {
    let range = event.range(calendar);
    event.start < event.end && !event.is_all_day && range.is_single_day() && range.ends_today(now)
}

struct EngineCore {
    event_id: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tracks_progress: bool,
    clock: SharedClock,
    state: Signal<TemporalState>,
    phase: Signal<Phase>,
    terminal: RefCell<TimerSlot>,
    tick: RefCell<TimerSlot>,
}

impl EngineCore {
    fn arm_terminal(self: &Rc<Self>, now: DateTime<Utc>) {
        let weak = Rc::downgrade(self);
        let token = self.clock.schedule(
            self.end - now,
            Box::new(move || {
                if let Some(core) = weak.upgrade() {
                    core.finish();
                }
            }),
        );
        self.terminal.borrow_mut().arm(token);
    }

    fn arm_tick(self: &Rc<Self>, after: Duration) {
        let weak: Weak<EngineCore> = Rc::downgrade(self);
        let token = self.clock.schedule(
            after,
            Box::new(move || {
                if let Some(core) = weak.upgrade() {
                    core.on_tick();
                }
            }),
        );
        self.tick.borrow_mut().arm(token);
    }

    fn on_tick(self: &Rc<Self>) {
        let now = self.clock.now();
        if now >= self.end {
            // The terminal wake-up owns the transition to Past.
            return;
        }
        self.publish(TemporalState::evaluate(self.start, self.end, now, true));
        self.arm_tick(Duration::seconds(1));
    }

    fn finish(&self) {
        self.tick.borrow_mut().cancel();
        log::debug!("event {} reached its end", self.event_id);
        self.publish(TemporalState::Past);
    }

    fn publish(&self, state: TemporalState) {
        self.state.publish_if_changed(state);
        self.phase.publish_if_changed(state.phase());
    }
}

/// Time-varying [`TemporalState`] for one event.
pub struct EventTemporalEngine {
    event: Event,
    core: Rc<EngineCore>,
}

impl EventTemporalEngine {
    pub fn new(event: Event, clock: SharedClock, calendar: &CalendarContext) -> Self {
        let now = clock.now();
        let tracks_progress = tracks_progress(&event, calendar, now);
        let initial = TemporalState::evaluate(event.start, event.end, now, tracks_progress);

        let core = Rc::new(EngineCore {
            event_id: event.id.clone(),
            start: event.start,
            end: event.end,
            tracks_progress,
            clock,
            state: Signal::with_value(initial),
            phase: Signal::with_value(initial.phase()),
            terminal: RefCell::new(TimerSlot::new()),
            tick: RefCell::new(TimerSlot::new()),
        });

        if !initial.is_past() {
            core.arm_terminal(now);
            if tracks_progress {
                core.arm_tick(event.start - now);
            }
        }

        Self { event, core }
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn tracks_progress(&self) -> bool {
        self.core.tracks_progress
    }

    /// Latest published state.
    pub fn state(&self) -> TemporalState {
        self.core.state.get().unwrap_or(TemporalState::Upcoming)
    }

    /// State at an arbitrary instant, using this engine's progress rules.
    /// Lets several engines be read against one shared `now`.
    pub fn state_at(&self, now: DateTime<Utc>) -> TemporalState {
        TemporalState::evaluate(self.core.start, self.core.end, now, self.core.tracks_progress)
    }

    pub fn has_pending_timers(&self) -> bool {
        self.core.terminal.borrow().is_armed() || self.core.tick.borrow().is_armed()
    }

    /// Observes every published state, progress updates included.
    pub fn subscribe(&self, observer: impl Fn(&TemporalState) + 'static) -> Subscription {
        self.core.state.subscribe(observer)
    }

    /// Observes phase transitions only.
    pub fn subscribe_phase(&self, observer: impl Fn(&Phase) + 'static) -> Subscription {
        self.core.phase.subscribe(observer)
    }
}

impl std::fmt::Debug for EventTemporalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventTemporalEngine")
            .field("event_id", &self.event.id)
            .field("state", &self.state())
            .field("tracks_progress", &self.core.tracks_progress)
            .finish()
    }
}
