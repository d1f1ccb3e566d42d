//! Output writers for parsed events.

pub mod json;

// Re-export main functions
pub use json::{create_event_file, write_events, EventWriter};
