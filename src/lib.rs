// Event Timeline Library
// Live, self-updating day timeline of calendar events and reminders

pub mod models;
pub mod services;
pub mod utils;

pub use models::event::{Event, EventKind, InvitationStatus};
pub use services::clock::{Clock, SharedClock, SystemClock, VirtualClock};
pub use services::event_list::{EventListBuilder, EventListSnapshot, ListItem};
pub use services::next_event::NextEventSelector;
pub use services::temporal::{EventTemporalEngine, TemporalState};
