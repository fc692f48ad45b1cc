// Integration tests for the live timeline
// Drives engines, the list builder and the next-event selector with a virtual clock

mod fixtures;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::Duration;
use pretty_assertions::assert_eq;

use event_timeline::models::event::InvitationStatus;
use event_timeline::models::settings::NextEventSettings;
use event_timeline::services::calendar::CalendarContext;
use event_timeline::services::event_list::{EventListBuilder, EventListSnapshot, IntervalGap, ListItem};
use event_timeline::services::next_event::NextEventSelector;
use event_timeline::services::presentation::{EventPresentationModel, PresentationContext};
use event_timeline::services::temporal::{EventTemporalEngine, TemporalState};

use fixtures::dates::{day_offset, start_of_today, today_at};
use fixtures::{clock_at, events};

fn shape(snapshot: &EventListSnapshot) -> Vec<String> {
    snapshot
        .items
        .iter()
        .map(|item| match item {
            ListItem::SectionHeader(title) => format!("header:{}", title),
            ListItem::IntervalGap(IntervalGap { label, .. }) => format!("gap:{}", label),
            ListItem::EventRow(row) => format!("row:{}", row.event_id),
        })
        .collect()
}

#[test]
fn progress_follows_the_clock() {
    let clock = clock_at(today_at(9, 59, 59));
    let event = events::timed("a", today_at(10, 0, 0), today_at(10, 30, 0));
    let engine = EventTemporalEngine::new(event, clock.clone(), &CalendarContext::utc());
    assert_eq!(engine.state(), TemporalState::Upcoming);

    clock.advance_to(today_at(10, 0, 0));
    assert_eq!(engine.state(), TemporalState::InProgress(0.0));

    clock.advance_to(today_at(10, 15, 0));
    assert_eq!(engine.state(), TemporalState::InProgress(0.5));

    clock.advance_to(today_at(10, 30, 1));
    assert_eq!(engine.state(), TemporalState::Past);
}

#[test]
fn all_day_never_progresses_or_fades() {
    let clock = clock_at(start_of_today());
    let event = events::all_day("h", start_of_today());
    let engine = EventTemporalEngine::new(event.clone(), clock.clone(), &CalendarContext::utc());

    let faded = Rc::new(Cell::new(false));
    let in_progress = Rc::new(Cell::new(false));
    let (faded_sink, progress_sink, observed) = (faded.clone(), in_progress.clone(), event.clone());
    let _sub = engine.subscribe(move |state| {
        let cx = PresentationContext {
            now: today_at(12, 0, 0),
            calendar: CalendarContext::utc(),
            is_today_selected: true,
            show_past_events: true,
            show_overdue_reminders: true,
        };
        let model = EventPresentationModel::derive(&observed, *state, &cx);
        faded_sink.set(faded_sink.get() || model.is_faded);
        progress_sink.set(progress_sink.get() || state.is_in_progress());
    });

    clock.advance(Duration::hours(30));
    assert!(!in_progress.get());
    assert!(!faded.get());
}

#[test]
fn gaps_between_timed_events() {
    let clock = clock_at(today_at(8, 0, 0));
    let list = EventListBuilder::new(clock.clone(), CalendarContext::utc());
    list.set_events(vec![
        events::timed("e1", today_at(9, 0, 0), today_at(9, 10, 0)),
        events::timed("e2", today_at(9, 12, 0), today_at(9, 20, 0)),
    ]);
    assert_eq!(
        shape(&list.snapshot()),
        vec!["header:Today", "row:e1", "gap:2m", "row:e2"]
    );

    list.set_events(vec![
        events::timed("e1", today_at(9, 0, 0), today_at(9, 10, 0)),
        events::timed("e2", today_at(9, 12, 0), today_at(9, 20, 0)),
        events::timed("e3", today_at(9, 20, 0), today_at(9, 25, 0)),
    ]);
    assert_eq!(
        shape(&list.snapshot()),
        vec!["header:Today", "row:e1", "gap:2m", "row:e2", "row:e3"]
    );
}

#[test]
fn overdue_reminder_leads_the_list() {
    let clock = clock_at(today_at(9, 0, 0));
    let list = EventListBuilder::new(clock.clone(), CalendarContext::utc());
    list.set_events(vec![
        events::timed("meeting", today_at(11, 0, 0), today_at(12, 0, 0)),
        events::reminder("taxes", day_offset(-3, 17, 0), false),
    ]);

    let snapshot = list.snapshot();
    assert_eq!(
        shape(&snapshot),
        vec!["header:3 days ago", "row:taxes", "header:Today", "row:meeting"]
    );
    assert_eq!(snapshot.overdue_count, 1);
    assert_eq!(snapshot.pending_count, 1);
}

#[test]
fn ended_event_drops_out_without_input_changes() {
    let clock = clock_at(today_at(9, 0, 0));
    let list = EventListBuilder::new(clock.clone(), CalendarContext::utc());
    list.set_show_past_events(false);
    list.set_events(vec![
        events::timed("ending", today_at(8, 30, 0), today_at(9, 0, 5)),
        events::timed("later", today_at(10, 0, 0), today_at(10, 30, 0)),
    ]);
    assert_eq!(list.snapshot().event_ids(), vec!["ending", "later"]);

    let published = Rc::new(RefCell::new(Vec::new()));
    let sink = published.clone();
    let _sub = list.subscribe(move |snapshot| sink.borrow_mut().push(snapshot.event_ids().len()));

    clock.advance(Duration::seconds(5));
    assert_eq!(list.snapshot().event_ids(), vec!["later"]);
    assert_eq!(*published.borrow(), vec![2, 1]);
}

#[test]
fn gap_fade_latches_across_rebuilds() {
    let clock = clock_at(today_at(9, 0, 0));
    let list = EventListBuilder::new(clock.clone(), CalendarContext::utc());
    list.set_events(vec![
        events::timed("e1", today_at(9, 0, 0), today_at(9, 10, 0)),
        events::timed("e2", today_at(9, 30, 0), today_at(9, 40, 0)),
    ]);

    let gap_fade = |snapshot: &EventListSnapshot| {
        snapshot.items.iter().find_map(|item| match item {
            ListItem::IntervalGap(gap) => Some(gap.fade),
            _ => None,
        })
    };
    assert_eq!(gap_fade(&list.snapshot()), Some(true));

    // Showing another day and coming back keeps the same gap listed as faded.
    list.set_selected_date(day_offset(1, 9, 0));
    list.set_selected_date(today_at(9, 0, 0));
    assert_eq!(gap_fade(&list.snapshot()), Some(true));

    clock.advance_to(today_at(9, 20, 0));
    assert_eq!(gap_fade(&list.snapshot()), Some(true));
}

#[test]
fn dropped_engine_never_fires() {
    let clock = clock_at(today_at(9, 0, 0));
    let engine = EventTemporalEngine::new(
        events::timed("a", today_at(9, 0, 10), today_at(9, 1, 0)),
        clock.clone(),
        &CalendarContext::utc(),
    );
    let calls = Rc::new(Cell::new(0));
    let sink = calls.clone();
    let subscription = engine.subscribe(move |_| sink.set(sink.get() + 1));
    let replayed = calls.get();

    drop(engine);
    clock.advance(Duration::hours(2));
    assert_eq!(calls.get(), replayed);
    assert_eq!(clock.pending_timers(), 0);
    drop(subscription);
}

#[test]
fn dropped_builder_leaves_no_timers() {
    let clock = clock_at(today_at(9, 20, 0));
    let list = EventListBuilder::new(clock.clone(), CalendarContext::utc());
    list.set_events(vec![
        events::timed("e1", today_at(9, 0, 0), today_at(9, 10, 0)),
        events::timed("e2", today_at(9, 30, 0), today_at(9, 40, 0)),
    ]);
    assert!(clock.pending_timers() > 0);

    drop(list);
    assert_eq!(clock.pending_timers(), 0);
}

#[test]
fn future_days_follow_today() {
    let clock = clock_at(today_at(8, 0, 0));
    let list = EventListBuilder::new(clock.clone(), CalendarContext::utc());
    list.set_events(vec![
        events::timed("tomorrow", day_offset(1, 9, 0), day_offset(1, 10, 0)),
        events::all_day("weekend", day_offset(2, 0, 0)),
        events::timed("today", today_at(9, 0, 0), today_at(10, 0, 0)),
    ]);
    assert_eq!(
        shape(&list.snapshot()),
        vec![
            "header:Today",
            "row:today",
            "header:Saturday 17 Oct",
            "row:tomorrow",
            "header:Sunday 18 Oct",
            "row:weekend",
        ]
    );
}

#[test]
fn declined_invitation_is_faded_but_listed() {
    let clock = clock_at(today_at(8, 0, 0));
    let list = EventListBuilder::new(clock.clone(), CalendarContext::utc());
    list.set_events(vec![events::invitation(
        "nope",
        today_at(9, 0, 0),
        today_at(10, 0, 0),
        InvitationStatus::Declined,
    )]);
    let snapshot = list.snapshot();
    let row = snapshot.event_rows().next().unwrap();
    assert!(row.is_faded);
    assert_eq!(snapshot.pending_count, 0);
}

#[test]
fn next_event_walks_through_the_day() {
    let clock = clock_at(today_at(8, 59, 0));
    let selector = NextEventSelector::new(clock.clone(), CalendarContext::utc(), NextEventSettings::default());
    selector.set_events(vec![
        events::all_day("h", start_of_today()),
        events::invitation("maybe", today_at(9, 0, 0), today_at(9, 15, 0), InvitationStatus::Pending),
        events::timed("standup", today_at(9, 30, 0), today_at(9, 45, 0)),
        events::timed("review", today_at(11, 0, 0), today_at(12, 0, 0)),
    ]);

    let labels = Rc::new(RefCell::new(Vec::new()));
    let sink = labels.clone();
    let _sub = selector.subscribe_countdown(move |label| sink.borrow_mut().push(label.clone()));

    assert_eq!(selector.current().unwrap().event_id, "standup");
    assert_eq!(selector.countdown_label(), "in 31m");

    clock.advance_to(today_at(9, 30, 0));
    assert_eq!(selector.countdown_label(), "15m left");

    clock.advance_to(today_at(9, 45, 0));
    assert_eq!(selector.current().unwrap().event_id, "review");
    assert_eq!(selector.countdown_label(), "in 1h 15m");

    // One label per minute while more than a minute away.
    let seen = labels.borrow();
    assert_eq!(seen[0], "in 31m");
    assert_eq!(seen[1], "in 30m");
}
