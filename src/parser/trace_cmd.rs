//! Streaming reader for `trace-cmd report` output.
//!
//! Lines are pulled one at a time and classified as marker, dropped-events
//! notice, header, empty-CPU notice, or event. Only events (and dropped-events
//! notices) are yielded; nothing beyond the current line is buffered.

use super::body::{ParserRegistry, ParserSpec};
use super::event::{DroppedEventsEvent, Event, TraceEvent};
use super::source::{FileSource, LineSource, LossyLines, TextSource};
use crate::utils::config::{
    DROPPED_EVENTS_PATTERN, EMPTY_CPU_PATTERN, HEADER_PATTERN, TRACE_EVENT_PATTERN,
    TRACE_MARKER_START, TRACE_MARKER_STOP,
};
use crate::utils::error::TraceError;
use log::{debug, warn};
use regex::Regex;
use std::cell::OnceCell;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Reader configuration
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Event name patterns to keep, each matched against the whole name.
    /// Empty keeps every event.
    pub event_names: Vec<String>,

    /// Only yield events between the start and stop markers
    pub filter_markers: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            event_names: Vec::new(),
            filter_markers: true,
        }
    }
}

/// Where the reader is relative to the marked region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    AwaitingStart,
    InsideRegion,
    Done,
}

/// Compiled line classifiers, shared by every reader
struct LinePatterns {
    event: Regex,
    header: Regex,
    dropped: Regex,
    empty_cpu: Regex,
}

impl LinePatterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            event: Regex::new(TRACE_EVENT_PATTERN)?,
            header: Regex::new(HEADER_PATTERN)?,
            dropped: Regex::new(DROPPED_EVENTS_PATTERN)?,
            empty_cpu: Regex::new(EMPTY_CPU_PATTERN)?,
        })
    }
}

fn line_patterns() -> Result<&'static LinePatterns, TraceError> {
    static PATTERNS: OnceLock<Result<LinePatterns, regex::Error>> = OnceLock::new();

    PATTERNS
        .get_or_init(LinePatterns::compile)
        .as_ref()
        .map_err(|e| TraceError::InvalidPattern {
            pattern: "trace-cmd line patterns".to_string(),
            source: e.clone(),
        })
}

/// A trace-cmd report and the settings for reading it
///
/// Not meant to be shared between threads; each reader keeps its own cached
/// start-marker state.
#[derive(Debug)]
pub struct TraceCmdTrace<S> {
    source: S,
    filter_markers: bool,
    names: Vec<String>,
    filters: Vec<Regex>,
    registry: ParserRegistry,
    start_marker: OnceCell<bool>,
}

impl TraceCmdTrace<FileSource> {
    /// Reader over a report file with default settings
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(FileSource::new(path))
    }
}

impl TraceCmdTrace<TextSource> {
    /// Reader over in-memory report text with default settings
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(TextSource::new(text))
    }
}

impl<S: LineSource> TraceCmdTrace<S> {
    /// Create a reader with marker filtering on, no name filter, and the
    /// default parser registry
    pub fn new(source: S) -> Self {
        Self {
            source,
            filter_markers: true,
            names: Vec::new(),
            filters: Vec::new(),
            registry: ParserRegistry::default(),
            start_marker: OnceCell::new(),
        }
    }

    /// Create a reader from a [`ReaderConfig`]
    ///
    /// # Errors
    /// * `TraceError::InvalidPattern` - an event name pattern failed to compile
    pub fn with_config(source: S, config: ReaderConfig) -> Result<Self, TraceError> {
        Self::new(source)
            .filter_markers(config.filter_markers)
            .with_event_names(config.event_names)
    }

    /// Keep only events whose name fully matches one of `names`
    ///
    /// # Errors
    /// * `TraceError::InvalidPattern` - a name pattern failed to compile
    pub fn with_event_names<I, T>(mut self, names: I) -> Result<Self, TraceError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        self.filters = names
            .iter()
            .map(|name| compile_name_filter(name))
            .collect::<Result<_, _>>()?;
        self.names = names;
        Ok(self)
    }

    /// Enable or disable marker-region filtering
    pub fn filter_markers(mut self, enabled: bool) -> Self {
        self.filter_markers = enabled;
        self
    }

    /// Replace the body parser registry
    pub fn with_registry(mut self, registry: ParserRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register a body parser for one event name
    pub fn register_parser(
        &mut self,
        event_name: impl Into<String>,
        spec: impl Into<ParserSpec>,
    ) -> Result<(), TraceError> {
        self.registry.register(event_name, spec)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn event_names(&self) -> &[String] {
        &self.names
    }

    pub fn filters_markers(&self) -> bool {
        self.filter_markers
    }

    /// Whether the source contains a start marker anywhere
    ///
    /// **Public** - lets callers decide whether to enable marker filtering
    ///
    /// Scans a separate handle on the source, so it never disturbs a parse.
    /// The answer is computed at most once per reader; a failed scan is not
    /// cached.
    ///
    /// # Errors
    /// * `TraceError::Open` / `TraceError::Read` - the source could not be read
    pub fn has_start_marker(&self) -> Result<bool, TraceError> {
        if let Some(found) = self.start_marker.get() {
            return Ok(*found);
        }

        let mut found = false;
        for line in LossyLines::new(self.source.open()?) {
            if line?.contains(TRACE_MARKER_START) {
                found = true;
                break;
            }
        }

        debug!(
            "Start marker {} in {}",
            if found { "present" } else { "absent" },
            self.source.describe()
        );

        let _ = self.start_marker.set(found);
        Ok(found)
    }

    /// Open the source and return the lazy event stream
    ///
    /// **Public** - main entry point for reading a trace
    ///
    /// # Errors
    /// * `TraceError::Open` - the source could not be opened
    ///
    /// Read failures part-way through surface as a single `Err` item, after
    /// which the stream ends.
    pub fn parse(&self) -> Result<TraceEvents<'_, S::Reader>, TraceError> {
        let patterns = line_patterns()?;
        let reader = self.source.open()?;

        debug!("Parsing trace from {}", self.source.describe());

        Ok(TraceEvents {
            lines: LossyLines::new(reader),
            state: if self.filter_markers {
                RegionState::AwaitingStart
            } else {
                RegionState::InsideRegion
            },
            filter_markers: self.filter_markers,
            filters: &self.filters,
            registry: &self.registry,
            patterns,
        })
    }
}

/// Whole-string regex for one event name pattern
///
/// **Public** - shared by the reader and CLI argument validation
///
/// # Errors
/// * `TraceError::InvalidPattern` - `name` does not compile once anchored
pub fn compile_name_filter(name: &str) -> Result<Regex, TraceError> {
    Regex::new(&format!("^(?:{})$", name)).map_err(|source| TraceError::InvalidPattern {
        pattern: name.to_string(),
        source,
    })
}

/// Lazy stream of events from one pass over a source
///
/// Dropping the stream closes the underlying reader.
pub struct TraceEvents<'a, R> {
    lines: LossyLines<R>,
    state: RegionState,
    filter_markers: bool,
    filters: &'a [Regex],
    registry: &'a ParserRegistry,
    patterns: &'static LinePatterns,
}

impl<R: std::io::BufRead> TraceEvents<'_, R> {
    pub fn state(&self) -> RegionState {
        self.state
    }

    /// Classify one line, yielding at most one event
    ///
    /// **Private** - internal state machine step
    fn process_line(&mut self, line: &str) -> Option<Event> {
        if self.filter_markers {
            match self.state {
                RegionState::AwaitingStart => {
                    if line.contains(TRACE_MARKER_START) {
                        debug!("Start marker on line {}", self.lines.line_number());
                        self.state = RegionState::InsideRegion;
                    }
                    return None;
                }
                RegionState::InsideRegion if line.contains(TRACE_MARKER_STOP) => {
                    debug!("Stop marker on line {}", self.lines.line_number());
                    self.state = RegionState::Done;
                    return None;
                }
                _ => {}
            }
        }

        if let Some(caps) = self.patterns.dropped.captures(line) {
            return match caps["cpu_id"].parse::<u32>() {
                Ok(cpu_id) => Some(DroppedEventsEvent::new(cpu_id).into()),
                Err(e) => {
                    warn!("Invalid dropped events notice: \"{}\": {}", line, e);
                    None
                }
            };
        }

        if self.patterns.header.is_match(line) || self.patterns.empty_cpu.is_match(line) {
            debug!("{}", line.trim());
            return None;
        }

        let Some(caps) = self.patterns.event.captures(line) else {
            warn!("Invalid trace event: \"{}\"", line);
            return None;
        };

        let name = &caps["name"];
        if !self.filters.is_empty() && !self.filters.iter().any(|f| f.is_match(name)) {
            return None;
        }

        let parser = self.registry.get(name);
        match TraceEvent::new(
            &caps["thread"],
            &caps["cpu_id"],
            &caps["ts"],
            name,
            &caps["body"],
            Some(parser),
        ) {
            Ok(event) => Some(event.into()),
            Err(e) => {
                warn!("Invalid trace event on line {}: {}", self.lines.line_number(), e);
                None
            }
        }
    }

    /// Mark the stream exhausted
    ///
    /// **Private** - called when the source runs out of lines
    fn finish(&mut self) {
        if self.filter_markers && self.state == RegionState::InsideRegion {
            warn!("Did not encounter a stop marker in trace");
        }
        self.state = RegionState::Done;
    }
}

impl<R: std::io::BufRead> Iterator for TraceEvents<'_, R> {
    type Item = Result<Event, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.state != RegionState::Done {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.state = RegionState::Done;
                    return Some(Err(TraceError::Read(e)));
                }
                None => {
                    self.finish();
                    return None;
                }
            };

            if let Some(event) = self.process_line(&line) {
                return Some(Ok(event));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{self, BufReader, Read};

    /// Source whose reader errors once `fail_at` bytes have been served
    struct FailingSource {
        text: &'static str,
        fail_at: usize,
    }

    struct FailingReader {
        data: &'static [u8],
        pos: usize,
        fail_at: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos >= self.fail_at {
                return Err(io::Error::new(io::ErrorKind::Other, "boom"));
            }
            let end = self.fail_at.min(self.data.len()).min(self.pos + buf.len());
            let n = end - self.pos;
            buf[..n].copy_from_slice(&self.data[self.pos..end]);
            self.pos = end;
            Ok(n)
        }
    }

    impl LineSource for FailingSource {
        type Reader = BufReader<FailingReader>;

        fn open(&self) -> Result<Self::Reader, TraceError> {
            Ok(BufReader::new(FailingReader {
                data: self.text.as_bytes(),
                pos: 0,
                fail_at: self.fail_at,
            }))
        }

        fn describe(&self) -> String {
            "failing source".to_string()
        }
    }

    fn names(trace: &TraceCmdTrace<TextSource>) -> Vec<String> {
        trace
            .parse()
            .unwrap()
            .map(|e| e.unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_line_patterns_compile() {
        assert!(line_patterns().is_ok());
    }

    #[test]
    fn test_initial_state() {
        let marked = TraceCmdTrace::from_text("");
        assert_eq!(marked.parse().unwrap().state(), RegionState::AwaitingStart);

        let unmarked = TraceCmdTrace::from_text("").filter_markers(false);
        assert_eq!(unmarked.parse().unwrap().state(), RegionState::InsideRegion);
    }

    #[test]
    fn test_stop_marker_ends_stream() {
        let text = "\
\x20bash-1 [000] 1.0: before: a=1
 bash-1 [000] 1.5: print: TRACE_MARKER_START
 bash-1 [000] 2.0: inside: a=2
 bash-1 [000] 2.5: print: TRACE_MARKER_STOP
 bash-1 [000] 3.0: after: a=3
";
        let trace = TraceCmdTrace::from_text(text);
        let mut events = trace.parse().unwrap();

        assert_eq!(events.next().unwrap().unwrap().name(), "inside");
        assert!(events.next().is_none());
        assert_eq!(events.state(), RegionState::Done);
    }

    #[test]
    fn test_missing_stop_marker_keeps_events() {
        let text = "\
\x20bash-1 [000] 1.5: print: TRACE_MARKER_START
 bash-1 [000] 2.0: one: a=2
 bash-1 [001] 2.1: two: a=3
";
        let trace = TraceCmdTrace::from_text(text);
        assert_eq!(names(&trace), vec!["one", "two"]);
    }

    #[test]
    fn test_header_and_empty_cpu_discarded() {
        let text = "\
version = 6
cpus=4
CPU 2 is empty
 bash-1 [000] 1.0: ev: a=1
";
        let trace = TraceCmdTrace::from_text(text).filter_markers(false);
        assert_eq!(names(&trace), vec!["ev"]);
    }

    #[test]
    fn test_name_filter_is_whole_string() {
        let text = "\
\x20bash-1 [000] 1.0: sched_switch: a:1 [120] R ==> b:2 [100]
 bash-1 [000] 1.1: sched_switch_extra: a=1
 bash-1 [000] 1.2: sched_wakeup: pid=3
";
        let trace = TraceCmdTrace::from_text(text)
            .filter_markers(false)
            .with_event_names(["sched_switch|sched_wakeup"])
            .unwrap();

        assert_eq!(names(&trace), vec!["sched_switch", "sched_wakeup"]);
    }

    #[test]
    fn test_invalid_name_filter() {
        let result = TraceCmdTrace::from_text("").with_event_names(["sched_(switch"]);
        assert!(matches!(result, Err(TraceError::InvalidPattern { .. })));
    }

    #[test]
    fn test_oversized_cpu_id_skipped() {
        let text = "\
\x20bash-1 [99999999999] 1.0: ev: a=1
 bash-1 [001] 1.1: ev: a=2
";
        let trace = TraceCmdTrace::from_text(text).filter_markers(false);
        let events: Vec<Event> = trace.parse().unwrap().map(|e| e.unwrap()).collect();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].reporting_cpu_id(), Some(1));
    }

    #[test]
    fn test_has_start_marker_memoized() {
        let trace = TraceCmdTrace::from_text(" x-1 [000] 1.0: print: TRACE_MARKER_START\n");
        assert!(trace.has_start_marker().unwrap());
        assert_eq!(trace.start_marker.get(), Some(&true));
        assert!(trace.has_start_marker().unwrap());

        let plain = TraceCmdTrace::from_text(" x-1 [000] 1.0: ev: a=1\n");
        assert!(!plain.has_start_marker().unwrap());
    }

    #[test]
    fn test_with_config() {
        let config = ReaderConfig {
            event_names: vec!["ev".to_string()],
            filter_markers: false,
        };
        let source = TextSource::from(" x-1 [000] 1.0: ev: a=1\n");
        let trace = TraceCmdTrace::with_config(source, config).unwrap();

        assert!(!trace.filters_markers());
        assert_eq!(trace.event_names(), &["ev".to_string()]);
        assert_eq!(names(&trace), vec!["ev"]);
    }

    #[test]
    fn test_read_error_yielded_once_then_stream_ends() {
        let first = " bash-1 [000] 1.0: ev: a=1\n";
        let source = FailingSource {
            text: " bash-1 [000] 1.0: ev: a=1\n bash-1 [000] 2.0: ev: a=2\n",
            fail_at: first.len(),
        };
        let trace = TraceCmdTrace::new(source).filter_markers(false);
        let mut events = trace.parse().unwrap();

        assert_eq!(events.next().unwrap().unwrap().name(), "ev");
        assert!(matches!(events.next(), Some(Err(TraceError::Read(_)))));
        assert!(events.next().is_none());
        assert!(events.next().is_none());
        assert_eq!(events.state(), RegionState::Done);
    }

    #[test]
    fn test_nothing_read_after_stop_marker() {
        let upto_stop = "\
\x20x-1 [000] 1.0: print: TRACE_MARKER_START
 bash-1 [000] 2.0: ev: a=1
 x-1 [000] 3.0: print: TRACE_MARKER_STOP
";
        let source = FailingSource {
            text: "\
\x20x-1 [000] 1.0: print: TRACE_MARKER_START
 bash-1 [000] 2.0: ev: a=1
 x-1 [000] 3.0: print: TRACE_MARKER_STOP
 bash-1 [000] 4.0: after: a=2
",
            fail_at: upto_stop.len(),
        };
        let trace = TraceCmdTrace::new(source);
        let events: Vec<Result<Event, TraceError>> = trace.parse().unwrap().collect();

        // Any read past the stop line would surface as an Err item.
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().name(), "ev");
    }
}
