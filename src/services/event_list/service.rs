use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::models::event::Event;
use crate::models::settings::TimelineSettings;
use crate::services::calendar::CalendarContext;
use crate::services::clock::{SharedClock, TimerSlot};
use crate::services::presentation::PresentationContext;
use crate::services::signal::{Signal, Subscription};
use crate::services::temporal::{EventTemporalEngine, Phase, TemporalState};
use crate::utils::date::truncate_to_minute;

use super::layout::{layout, GapLatch};
use super::models::{EventListSnapshot, ListInputs};

/// One engine per visible event id, plus the phase observer that feeds
/// the builder's re-trigger stream.
struct ArenaEntry {
    engine: EventTemporalEngine,
    _phase: Subscription,
}

#[derive(Default)]
struct EngineArena {
    entries: HashMap<String, ArenaEntry>,
    /// Day and calendar the engines' progress rules were computed for.
    built_for: Option<(NaiveDate, CalendarContext)>,
}

struct BuilderCore {
    clock: SharedClock,
    inputs: RefCell<ListInputs>,
    arena: RefCell<EngineArena>,
    latch: RefCell<GapLatch>,
    refresh: RefCell<TimerSlot>,
    minute_tick: RefCell<TimerSlot>,
    snapshot: Signal<EventListSnapshot>,
    builds: Cell<u64>,
}

impl BuilderCore {
    /// Queues one rebuild at the current instant. Requests made while one
    /// is already queued are absorbed by it.
    fn request_rebuild(self: &Rc<Self>) {
        if self.refresh.borrow().is_armed() {
            return;
        }
        let weak = Rc::downgrade(self);
        let token = self.clock.schedule(
            Duration::zero(),
            Box::new(move || {
                if let Some(core) = weak.upgrade() {
                    core.rebuild();
                }
            }),
        );
        self.refresh.borrow_mut().arm(token);
    }

    fn rebuild(self: &Rc<Self>) {
        let built = {
            let inputs = self.inputs.borrow();
            if inputs.is_showing_details_modal {
                log::debug!("details open, keeping the last snapshot");
                return;
            }
            self.refresh.borrow_mut().cancel();

            // One clock read per build keeps every row consistent.
            let now = self.clock.now();
            let calendar = inputs.calendar;
            let events = well_formed(&inputs.events);
            self.reconcile(&events, now, &calendar);

            let arena = self.arena.borrow();
            let rows: Vec<(&Event, TemporalState)> = events
                .iter()
                .filter_map(|event| {
                    arena
                        .entries
                        .get(&event.id)
                        .map(|entry| (*event, entry.engine.state_at(now)))
                })
                .collect();

            let selected_day = calendar.local_date(inputs.selected_date);
            let cx = PresentationContext {
                now,
                calendar,
                is_today_selected: selected_day == calendar.local_date(now),
                show_past_events: inputs.show_past_events,
                show_overdue_reminders: inputs.show_overdue_reminders,
            };
            let built = layout(&rows, selected_day, &cx, &mut self.latch.borrow_mut());
            (built, now)
        };

        let (built, now) = built;
        self.arm_minute_tick(built.has_live_gap, now);
        self.builds.set(self.builds.get() + 1);
        log::debug!(
            "event list rebuilt: {} items, {} overdue, {} all-day, {} pending",
            built.snapshot.items.len(),
            built.snapshot.overdue_count,
            built.snapshot.all_day_count,
            built.snapshot.pending_count
        );
        self.snapshot.publish(built.snapshot);
    }

    /// Brings the arena in line with `events`: unchanged events keep their
    /// engine, replaced or new ones get a fresh engine, and engines for
    /// vanished ids are dropped (cancelling their timers).
    fn reconcile(self: &Rc<Self>, events: &[&Event], now: DateTime<Utc>, calendar: &CalendarContext) {
        let mut arena = self.arena.borrow_mut();
        let today = calendar.local_date(now);

        if arena.built_for != Some((today, *calendar)) {
            if !arena.entries.is_empty() {
                log::info!(
                    "day or calendar changed, recreating {} engines",
                    arena.entries.len()
                );
            }
            arena.entries.clear();
            self.latch.borrow_mut().clear();
            arena.built_for = Some((today, *calendar));
        }

        let mut previous = std::mem::take(&mut arena.entries);
        let mut created = 0;
        for event in events {
            let entry = match previous.remove(&event.id) {
                Some(entry) if entry.engine.event() == *event => entry,
                _ => {
                    created += 1;
                    self.spawn_engine(event, calendar)
                }
            };
            arena.entries.insert(event.id.clone(), entry);
        }

        if created > 0 || !previous.is_empty() {
            log::info!(
                "reconciled engines: {} created, {} dropped, {} live",
                created,
                previous.len(),
                arena.entries.len()
            );
        }
        drop(arena);
        drop(previous);
    }

    fn spawn_engine(self: &Rc<Self>, event: &Event, calendar: &CalendarContext) -> ArenaEntry {
        let engine = EventTemporalEngine::new(event.clone(), self.clock.clone(), calendar);
        let weak: Weak<BuilderCore> = Rc::downgrade(self);
        let last_phase = Cell::new(None::<Phase>);
        let phase = engine.subscribe_phase(move |phase| {
            let previous = last_phase.replace(Some(*phase));
            if previous.is_some_and(|seen| seen != *phase) {
                if let Some(core) = weak.upgrade() {
                    core.request_rebuild();
                }
            }
        });
        ArenaEntry {
            engine,
            _phase: phase,
        }
    }

    fn arm_minute_tick(self: &Rc<Self>, live: bool, now: DateTime<Utc>) {
        if !live {
            self.minute_tick.borrow_mut().cancel();
            return;
        }
        let next_minute = truncate_to_minute(now) + Duration::minutes(1);
        let weak = Rc::downgrade(self);
        let token = self.clock.schedule(
            next_minute - now,
            Box::new(move || {
                if let Some(core) = weak.upgrade() {
                    core.request_rebuild();
                }
            }),
        );
        self.minute_tick.borrow_mut().arm(token);
    }
}

/// Keeps the first occurrence of each valid id; everything else is
/// logged and skipped.
fn well_formed(events: &[Event]) -> Vec<&Event> {
    let mut seen = HashSet::new();
    events
        .iter()
        .filter(|event| match event.validate() {
            Ok(()) => true,
            Err(err) => {
                log::warn!("dropping event '{}': {}", event.id, err);
                false
            }
        })
        .filter(|event| {
            let first = seen.insert(event.id.as_str());
            if !first {
                log::warn!("dropping duplicate event id '{}'", event.id);
            }
            first
        })
        .collect()
}

/// Turns the events of a selected day into a sectioned, live list.
///
/// The builder owns one [`EventTemporalEngine`] per event. Whenever an
/// engine changes phase the whole list is rebuilt once, at that instant,
/// and published through [`EventListBuilder::subscribe`]. Changing any
/// input also rebuilds, except while the details modal is open.
///
/// Dropping the builder cancels every timer it or its engines own.
pub struct EventListBuilder {
    core: Rc<BuilderCore>,
}

impl EventListBuilder {
    pub fn new(clock: SharedClock, calendar: CalendarContext) -> Self {
        let now = clock.now();
        let core = Rc::new(BuilderCore {
            clock,
            inputs: RefCell::new(ListInputs::new(now, calendar)),
            arena: RefCell::new(EngineArena::default()),
            latch: RefCell::new(GapLatch::default()),
            refresh: RefCell::new(TimerSlot::new()),
            minute_tick: RefCell::new(TimerSlot::new()),
            snapshot: Signal::new(),
            builds: Cell::new(0),
        });
        core.rebuild();
        Self { core }
    }

    /// Builder configured from persisted settings.
    pub fn with_settings(clock: SharedClock, settings: &TimelineSettings, calendar: CalendarContext) -> Self {
        let builder = Self::new(clock, calendar);
        builder.apply_settings(settings);
        builder
    }

    pub fn set_events(&self, events: Vec<Event>) {
        self.set_input(events, |inputs| &mut inputs.events);
    }

    pub fn set_selected_date(&self, date: DateTime<Utc>) {
        self.set_input(date, |inputs| &mut inputs.selected_date);
    }

    pub fn set_show_past_events(&self, show: bool) {
        self.set_input(show, |inputs| &mut inputs.show_past_events);
    }

    pub fn set_show_overdue_reminders(&self, show: bool) {
        self.set_input(show, |inputs| &mut inputs.show_overdue_reminders);
    }

    /// Freezes the list while `true`; closing rebuilds from the latest inputs.
    pub fn set_showing_details_modal(&self, showing: bool) {
        self.set_input(showing, |inputs| &mut inputs.is_showing_details_modal);
    }

    pub fn set_calendar_context(&self, calendar: CalendarContext) {
        self.set_input(calendar, |inputs| &mut inputs.calendar);
    }

    /// Applies both list toggles with a single rebuild.
    pub fn apply_settings(&self, settings: &TimelineSettings) {
        self.update(|inputs| {
            inputs.show_past_events = settings.show_past_events;
            inputs.show_overdue_reminders = settings.show_overdue_reminders;
        });
    }

    /// Edits several inputs at once; rebuilds once if anything changed.
    pub fn update(&self, apply: impl FnOnce(&mut ListInputs)) {
        let changed = {
            let mut inputs = self.core.inputs.borrow_mut();
            let before = inputs.clone();
            apply(&mut inputs);
            *inputs != before
        };
        if changed {
            self.core.rebuild();
        }
    }

    fn set_input<T: PartialEq>(&self, value: T, field: impl FnOnce(&mut ListInputs) -> &mut T) {
        let changed = {
            let mut inputs = self.core.inputs.borrow_mut();
            let slot = field(&mut inputs);
            if *slot == value {
                false
            } else {
                *slot = value;
                true
            }
        };
        if changed {
            self.core.rebuild();
        }
    }

    pub fn inputs(&self) -> ListInputs {
        self.core.inputs.borrow().clone()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> EventListSnapshot {
        self.core.snapshot.get().unwrap_or_default()
    }

    /// Observes every published snapshot, starting with the current one.
    pub fn subscribe(&self, observer: impl Fn(&EventListSnapshot) + 'static) -> Subscription {
        self.core.snapshot.subscribe(observer)
    }

    pub fn signal(&self) -> Signal<EventListSnapshot> {
        self.core.snapshot.clone()
    }

    /// Observes one row's state, progress ticks included. `None` when the
    /// event is not listed.
    pub fn subscribe_event(
        &self,
        event_id: &str,
        observer: impl Fn(&TemporalState) + 'static,
    ) -> Option<Subscription> {
        let arena = self.core.arena.borrow();
        let entry = arena.entries.get(event_id)?;
        Some(entry.engine.subscribe(observer))
    }

    pub fn engine_count(&self) -> usize {
        self.core.arena.borrow().entries.len()
    }

    /// Number of snapshots built so far.
    pub fn build_count(&self) -> u64 {
        self.core.builds.get()
    }
}

impl std::fmt::Debug for EventListBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListBuilder")
            .field("engines", &self.engine_count())
            .field("builds", &self.build_count())
            .finish()
    }
}
