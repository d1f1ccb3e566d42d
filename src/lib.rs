//! trace-cmd report parser
//!
//! Streaming parser for the text output of `trace-cmd report`.
//! Turns report lines into structured events, tolerating malformed
//! lines and honouring `TRACE_MARKER_START` / `TRACE_MARKER_STOP`
//! regions.
//!
//! ## Getting Started
//!
//! ```no_run
//! use trace_cmd_report::parser::TraceCmdTrace;
//!
//! let trace = TraceCmdTrace::from_path("trace.txt")
//!     .with_event_names(["sched_switch"])?;
//!
//! for event in trace.parse()? {
//!     let event = event?;
//!     println!("{} prev_pid={:?}", event, event.field("prev_pid").ok());
//! }
//! # Ok::<(), trace_cmd_report::utils::TraceError>(())
//! ```
//!
//! The `trace-report` binary wraps the same API:
//!
//! ```bash
//! trace-report parse --file trace.txt --event sched_switch
//! ```

pub mod commands;
pub mod output;
pub mod parser;
pub mod utils;
