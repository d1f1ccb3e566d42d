//! CLI command implementations.
//!
//! Commands orchestrate the library components to perform user tasks.

pub mod models;
pub mod report;

// Re-export main command functions
pub use models::ParseArgs;
pub use report::{execute_markers, execute_parse, stream_events, validate_args};
