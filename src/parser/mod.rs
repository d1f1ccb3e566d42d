//! Trace parsing and event definitions.
//!
//! This module handles:
//! - Reading trace-cmd report text line by line
//! - Classifying marker, header, dropped-events and event lines
//! - Parsing event bodies into typed fields

pub mod body;
pub mod event;
pub mod source;
pub mod trace_cmd;

// Re-export main types
pub use body::{
    default_body_parser, regex_body_parser, sched_switch_parser, BodyParser, ParserRegistry,
    ParserSpec, PatternFlags,
};
pub use event::{DroppedEventsEvent, Event, FieldMap, FieldValue, Timestamp, TraceEvent};
pub use source::{FileSource, LineSource, LossyLines, TextSource};
pub use trace_cmd::{compile_name_filter, ReaderConfig, RegionState, TraceCmdTrace, TraceEvents};
