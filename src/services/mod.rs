// Service module exports
// Clock, calendar rules and the live timeline services built on them

pub mod calendar;
pub mod clock;
pub mod event_list;
pub mod next_event;
pub mod presentation;
pub mod signal;
pub mod temporal;
