// Module exports for models

pub mod color;
pub mod date_range;
pub mod event;
pub mod settings;
