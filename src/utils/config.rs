//! Configuration and constants for the trace-cmd report format.

/// Token injected into a trace to mark the start of the interesting region
pub const TRACE_MARKER_START: &str = "TRACE_MARKER_START";

/// Token injected into a trace to mark the end of the interesting region
pub const TRACE_MARKER_STOP: &str = "TRACE_MARKER_STOP";

/// Name given to the synthetic event emitted for dropped-events notices
pub const DROPPED_EVENTS_NAME: &str = "DROPPED EVENTS DETECTED";

/// Field under which a dropped-events notice stores its CPU
pub const DROPPED_EVENTS_CPU_FIELD: &str = "cpu_id";

// Line patterns for the report format.
//
//       <idle>-0     [000]  3284.126993: sched_rq_runnable_load: cpu=0 load=54
//          |           |         |              |                |
//        thread       cpu    timestamp        name              body
pub const TRACE_EVENT_PATTERN: &str = concat!(
    r"^\s+(?P<thread>\S+.*?\S+)\s+\[(?P<cpu_id>\d+)\]\s+(?P<ts>[\d.]+):",
    r"\s+(?P<name>[^:]+):\s+(?P<body>.*?)\s*$",
);
pub const HEADER_PATTERN: &str = r"^\s*(?:version|cpus)\s*=\s*([\d.]+)\s*$";
pub const DROPPED_EVENTS_PATTERN: &str = r"CPU:(?P<cpu_id>\d+) \[\d*\s*EVENTS DROPPED\]";
pub const EMPTY_CPU_PATTERN: &str = r"CPU \d+ is empty";

/// Legacy `sched_switch` body, used when the body has exactly two `=`
pub const SCHED_SWITCH_LEGACY_PATTERN: &str = concat!(
    r"(?P<prev_comm>\S.*):(?P<prev_pid>\d+) \[(?P<prev_prio>\d+)\] (?P<status>\S+)",
    r" ==> ",
    r"(?P<next_comm>\S.*):(?P<next_pid>\d+) \[(?P<next_prio>\d+)\]",
);
