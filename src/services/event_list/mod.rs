// Event list module
// Sectioned, self-updating list of the selected day's events

mod layout;
pub mod models;
pub mod service;

pub use models::{EventListSnapshot, IntervalGap, ListInputs, ListItem};
pub use service::EventListBuilder;
