//! Event records produced from trace-cmd report lines.
//!
//! A trace event looks like this in the report:
//!
//! ```text
//!       <idle>-0     [000]  3284.126993: sched_rq_runnable_load: cpu=0 load=54
//!          |           |         |              |                |
//!        thread       cpu    timestamp        name              body
//! ```
//!
//! The header (thread, cpu, timestamp, name) is fixed; the body is turned into
//! an open-ended set of named fields by a [`BodyParser`].

use super::body::BodyParser;
use crate::utils::config::{DROPPED_EVENTS_CPU_FIELD, DROPPED_EVENTS_NAME};
use crate::utils::error::TraceError;
use log::trace;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Named fields parsed out of an event body
pub type FieldMap = HashMap<String, FieldValue>;

/// Value of a single body field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Integer when the text is purely numeric, otherwise the text itself
    pub fn int_or_string(text: &str) -> Self {
        match text.parse::<i64>() {
            Ok(v) => Self::Int(v),
            Err(_) => Self::Str(text.to_string()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of the value (integers widen to `f64`)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Str(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Event timestamp, in seconds
///
/// Timestamps that do not look numeric are kept verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Timestamp {
    Seconds(f64),
    Raw(String),
}

impl Timestamp {
    /// Permissive numeric-or-string coercion
    pub fn coerce(text: &str) -> Self {
        match text.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Self::Seconds(v),
            _ => Self::Raw(text.to_string()),
        }
    }

    pub fn as_secs(&self) -> Option<f64> {
        match self {
            Self::Seconds(v) => Some(*v),
            Self::Raw(_) => None,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(v) => write!(f, "{}", v),
            Self::Raw(s) => f.write_str(s),
        }
    }
}

/// A single trace-cmd event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEvent {
    thread: String,
    reporting_cpu_id: u32,
    timestamp: Timestamp,
    name: String,
    text: String,
    fields: FieldMap,
}

impl TraceEvent {
    /// Build an event from its header parts and raw body text
    ///
    /// **Public** - used by the reader for every matched event line
    ///
    /// # Arguments
    /// * `cpu_id` - Reporting CPU, must be a non-negative integer
    /// * `timestamp` - Coerced with [`Timestamp::coerce`]
    /// * `parser` - Optional body parser used to populate the fields
    ///
    /// # Errors
    /// * `TraceError::MalformedHeader` - `cpu_id` is not a valid CPU number
    ///
    /// Errors returned by the body parser are discarded here. The event is
    /// still built and keeps whatever fields the parser set before failing,
    /// so unusual body syntax can never abort a trace.
    pub fn new(
        thread: impl Into<String>,
        cpu_id: &str,
        timestamp: &str,
        name: impl Into<String>,
        body: impl Into<String>,
        parser: Option<&BodyParser>,
    ) -> Result<Self, TraceError> {
        let reporting_cpu_id = cpu_id
            .trim()
            .parse::<u32>()
            .map_err(|e| {
                TraceError::MalformedHeader(format!("invalid cpu id '{}': {}", cpu_id, e))
            })?;

        let mut event = Self {
            thread: thread.into(),
            reporting_cpu_id,
            timestamp: Timestamp::coerce(timestamp),
            name: name.into(),
            text: body.into(),
            fields: FieldMap::new(),
        };

        if let Some(parser) = parser {
            if let Err(e) = parser.parse(&mut event.fields, &event.text) {
                trace!("Ignoring body parse failure for {}: {}", event.name, e);
            }
        }

        Ok(event)
    }

    pub fn thread(&self) -> &str {
        &self.thread
    }

    pub fn reporting_cpu_id(&self) -> u32 {
        self.reporting_cpu_id
    }

    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unparsed body text
    pub fn raw_text(&self) -> &str {
        &self.text
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Look up a body field
    ///
    /// # Errors
    /// * `TraceError::NoSuchField` - the body did not define `name`
    pub fn field(&self, name: &str) -> Result<&FieldValue, TraceError> {
        lookup(&self.fields, name)
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TE({} @ {})", self.name, self.timestamp)
    }
}

/// Notice that trace-cmd lost events on a CPU
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedEventsEvent {
    cpu_id: u32,
    fields: FieldMap,
}

impl DroppedEventsEvent {
    pub fn new(cpu_id: u32) -> Self {
        let mut fields = FieldMap::new();
        fields.insert(
            DROPPED_EVENTS_CPU_FIELD.to_string(),
            FieldValue::Int(i64::from(cpu_id)),
        );
        Self { cpu_id, fields }
    }

    /// CPU on which events were dropped
    pub fn cpu_id(&self) -> u32 {
        self.cpu_id
    }

    pub fn name(&self) -> &'static str {
        DROPPED_EVENTS_NAME
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Result<&FieldValue, TraceError> {
        lookup(&self.fields, name)
    }
}

impl fmt::Display for DroppedEventsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DROPPED_EVENTS_ON_CPU{}", self.cpu_id)
    }
}

/// Anything the reader can yield
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Trace(TraceEvent),
    Dropped(DroppedEventsEvent),
}

impl Event {
    pub fn name(&self) -> &str {
        match self {
            Self::Trace(e) => e.name(),
            Self::Dropped(e) => e.name(),
        }
    }

    /// Originating thread, absent for dropped-events notices
    pub fn thread(&self) -> Option<&str> {
        match self {
            Self::Trace(e) => Some(e.thread()),
            Self::Dropped(_) => None,
        }
    }

    pub fn reporting_cpu_id(&self) -> Option<u32> {
        match self {
            Self::Trace(e) => Some(e.reporting_cpu_id()),
            Self::Dropped(_) => None,
        }
    }

    pub fn timestamp(&self) -> Option<&Timestamp> {
        match self {
            Self::Trace(e) => Some(e.timestamp()),
            Self::Dropped(_) => None,
        }
    }

    pub fn raw_text(&self) -> Option<&str> {
        match self {
            Self::Trace(e) => Some(e.raw_text()),
            Self::Dropped(_) => None,
        }
    }

    pub fn fields(&self) -> &FieldMap {
        match self {
            Self::Trace(e) => e.fields(),
            Self::Dropped(e) => e.fields(),
        }
    }

    pub fn field(&self, name: &str) -> Result<&FieldValue, TraceError> {
        lookup(self.fields(), name)
    }

    pub fn as_trace(&self) -> Option<&TraceEvent> {
        match self {
            Self::Trace(e) => Some(e),
            Self::Dropped(_) => None,
        }
    }

    pub fn as_dropped(&self) -> Option<&DroppedEventsEvent> {
        match self {
            Self::Dropped(e) => Some(e),
            Self::Trace(_) => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trace(e) => fmt::Display::fmt(e, f),
            Self::Dropped(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl From<TraceEvent> for Event {
    fn from(e: TraceEvent) -> Self {
        Self::Trace(e)
    }
}

impl From<DroppedEventsEvent> for Event {
    fn from(e: DroppedEventsEvent) -> Self {
        Self::Dropped(e)
    }
}

fn lookup<'a>(fields: &'a FieldMap, name: &str) -> Result<&'a FieldValue, TraceError> {
    fields
        .get(name)
        .ok_or_else(|| TraceError::NoSuchField(name.to_string()))
}
