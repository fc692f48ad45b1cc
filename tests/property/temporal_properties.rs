// Property-based tests for temporal state
// Checks state ordering and progress bounds under random clock movement

#[path = "../fixtures/mod.rs"]
mod fixtures;

use std::cell::RefCell;
use std::rc::Rc;

use chrono::Duration;
use proptest::prelude::*;

use event_timeline::services::calendar::CalendarContext;
use event_timeline::services::temporal::{EventTemporalEngine, TemporalState};

use fixtures::dates::today_at;
use fixtures::{clock_at, events};

fn assert_ordered(states: &[TemporalState]) -> Result<(), TestCaseError> {
    for pair in states.windows(2) {
        let (before, after) = (pair[0], pair[1]);
        prop_assert!(
            before.phase() <= after.phase(),
            "went from {:?} back to {:?}",
            before,
            after
        );
        if let (Some(p0), Some(p1)) = (before.progress(), after.progress()) {
            prop_assert!(p0 <= p1, "progress fell from {} to {}", p0, p1);
        }
    }
    for state in states {
        if let Some(p) = state.progress() {
            prop_assert!((0.0..=1.0).contains(&p), "progress {} out of bounds", p);
        }
    }
    Ok(())
}

proptest! {
    /// Property: published states only move forward and progress stays in [0, 1]
    #[test]
    fn prop_engine_states_only_move_forward(
        start_offset in 0i64..7200,
        length in 0i64..7200,
        steps in prop::collection::vec(1i64..900, 1..40),
    ) {
        let origin = today_at(6, 0, 0);
        let start = origin + Duration::seconds(start_offset);
        let clock = clock_at(origin);
        let engine = EventTemporalEngine::new(
            events::timed("p", start, start + Duration::seconds(length)),
            clock.clone(),
            &CalendarContext::utc(),
        );

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _sub = engine.subscribe(move |state| sink.borrow_mut().push(*state));

        for step in steps {
            clock.advance(Duration::seconds(step));
        }
        assert_ordered(&seen.borrow())?;

        if length == 0 {
            prop_assert!(seen.borrow().iter().all(|state| !state.is_in_progress()));
        }
    }

    /// Property: evaluating at non-decreasing instants never revisits a state
    #[test]
    fn prop_evaluate_is_monotonic(
        length_ms in 0i64..3_600_000,
        mut offsets in prop::collection::vec(-3_600_000i64..7_200_000, 2..60),
    ) {
        offsets.sort_unstable();
        let start = today_at(10, 0, 0);
        let end = start + Duration::milliseconds(length_ms);
        let states: Vec<TemporalState> = offsets
            .iter()
            .map(|offset| TemporalState::evaluate(start, end, start + Duration::milliseconds(*offset), true))
            .collect();
        assert_ordered(&states)?;
    }
}
