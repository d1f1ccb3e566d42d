use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;
use trace_cmd_report::parser::{Event, FieldValue, TextSource, Timestamp, TraceCmdTrace};
use trace_cmd_report::utils::TraceError;

const MARKED_TRACE: &str = "\
version = 6
CPU 3 is empty
cpus=4
           <...>-1450  [001]   100.000001: sched_wakeup: comm=early pid=1 prio=120 target_cpu=001
  trace-cmd-1449  [000]   100.500000: print:                tracing_mark_write: TRACE_MARKER_START
          <idle>-0     [000]  3284.126993: sched_rq_runnable_load: cpu=0 load=54
            bash-1234  [002]  3284.127100: sched_switch: bash:1234 [120] S ==> swapper/2:0 [120]
CPU:3 [42 EVENTS DROPPED]
this line is garbage
          <idle>-0     [001]  3284.130000: cpu_idle:             state=4294967295 cpu_id=1
  trace-cmd-1449  [000]  3285.000000: print:                tracing_mark_write: TRACE_MARKER_STOP
          <idle>-0     [000]  3286.000000: cpu_idle:             state=1 cpu_id=0
";

fn collect(trace: &TraceCmdTrace<TextSource>) -> Vec<Event> {
    trace
        .parse()
        .unwrap()
        .map(|e| e.expect("read should not fail"))
        .collect()
}

fn trace_file(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_marked_region_events() {
    let events = collect(&TraceCmdTrace::from_text(MARKED_TRACE));
    let names: Vec<&str> = events.iter().map(|e| e.name()).collect();

    assert_eq!(
        names,
        vec![
            "sched_rq_runnable_load",
            "sched_switch",
            "DROPPED EVENTS DETECTED",
            "cpu_idle",
        ]
    );
}

#[test]
fn test_header_fields_match_line() {
    let events = collect(&TraceCmdTrace::from_text(MARKED_TRACE));
    let first = events[0].as_trace().unwrap();

    assert_eq!(first.thread(), "<idle>-0");
    assert_eq!(first.reporting_cpu_id(), 0);
    assert_eq!(first.timestamp(), &Timestamp::Seconds(3284.126993));
    assert_eq!(first.name(), "sched_rq_runnable_load");
    assert_eq!(first.raw_text(), "cpu=0 load=54");
    assert_eq!(first.field("cpu").unwrap(), &FieldValue::Int(0));
    assert_eq!(first.field("load").unwrap(), &FieldValue::Int(54));
}

#[test]
fn test_sched_switch_uses_registered_parser() {
    let events = collect(&TraceCmdTrace::from_text(MARKED_TRACE));
    let switch = &events[1];

    assert_eq!(switch.thread(), Some("bash-1234"));
    assert_eq!(switch.field("prev_comm").unwrap().as_str(), Some("bash"));
    assert_eq!(switch.field("prev_pid").unwrap().as_int(), Some(1234));
    assert_eq!(switch.field("status").unwrap().as_str(), Some("S"));
    assert_eq!(switch.field("next_comm").unwrap().as_str(), Some("swapper/2"));
    assert_eq!(switch.field("next_pid").unwrap().as_int(), Some(0));
}

#[test]
fn test_dropped_events_line() {
    let trace = TraceCmdTrace::from_text("CPU:3 [42 EVENTS DROPPED]\n").filter_markers(false);
    let events = collect(&trace);

    assert_eq!(events.len(), 1);
    let dropped = events[0].as_dropped().unwrap();
    assert_eq!(dropped.cpu_id(), 3);
    assert_eq!(events[0].field("cpu_id").unwrap().as_int(), Some(3));
    assert_eq!(events[0].thread(), None);
    assert_eq!(events[0].reporting_cpu_id(), None);
    assert_eq!(events[0].timestamp(), None);
}

#[test]
fn test_lines_outside_markers_not_yielded() {
    let events = collect(&TraceCmdTrace::from_text(MARKED_TRACE));

    assert!(events.iter().all(|e| e.field("comm").is_err()));
    assert!(events
        .iter()
        .filter_map(|e| e.timestamp().and_then(Timestamp::as_secs))
        .all(|ts| ts > 100.5 && ts < 3285.0));
}

#[test]
fn test_without_marker_filtering() {
    let trace = TraceCmdTrace::from_text(MARKED_TRACE).filter_markers(false);
    let names: Vec<String> = collect(&trace).iter().map(|e| e.name().to_string()).collect();

    assert_eq!(names.first().map(String::as_str), Some("sched_wakeup"));
    assert_eq!(names.last().map(String::as_str), Some("cpu_idle"));
    assert_eq!(names.iter().filter(|n| *n == "print").count(), 2);
    assert_eq!(names.len(), 8);
}

#[test]
fn test_name_filter() {
    let trace = TraceCmdTrace::from_text(MARKED_TRACE)
        .with_event_names(["sched_switch"])
        .unwrap();
    let events = collect(&trace);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name(), "sched_switch");
}

#[test]
fn test_malformed_line_does_not_stop_stream() {
    let text = "\
garbage before
   not [an] event
 bash-1 [000] 1.0: ev: a=1
%%%%
 bash-1 [000] 2.0: ev: a=2
";
    let trace = TraceCmdTrace::from_text(text).filter_markers(false);
    let events = collect(&trace);

    assert_eq!(events.len(), 2);
    assert_eq!(events[1].field("a").unwrap().as_int(), Some(2));
}

#[test]
fn test_unknown_body_yields_event_with_empty_fields() {
    let text =
        " kworker/0:1-42 [000] 5.0: workqueue_execute_start: work struct ffff8800 function foo\n";
    let trace = TraceCmdTrace::from_text(text).filter_markers(false);
    let events = collect(&trace);

    assert_eq!(events.len(), 1);
    assert!(events[0].fields().is_empty());
    assert!(matches!(events[0].field("function"), Err(TraceError::NoSuchField(_))));
}

#[test]
fn test_two_readers_yield_identical_sequences() {
    let file = trace_file(MARKED_TRACE);

    let a: Vec<Event> = TraceCmdTrace::from_path(file.path())
        .parse()
        .unwrap()
        .map(Result::unwrap)
        .collect();
    let b: Vec<Event> = TraceCmdTrace::from_path(file.path())
        .parse()
        .unwrap()
        .map(Result::unwrap)
        .collect();

    assert_eq!(a, b);
    assert_eq!(a.len(), 4);
}

#[test]
fn test_has_start_marker_does_not_disturb_parse() {
    let file = trace_file(MARKED_TRACE);
    let trace = TraceCmdTrace::from_path(file.path());

    let mut events = trace.parse().unwrap();
    let first = events.next().unwrap().unwrap();

    assert!(trace.has_start_marker().unwrap());

    let rest: Vec<Event> = events.map(Result::unwrap).collect();
    assert_eq!(first.name(), "sched_rq_runnable_load");
    assert_eq!(rest.len(), 3);
}

#[test]
fn test_early_abandonment() {
    let file = trace_file(MARKED_TRACE);
    let trace = TraceCmdTrace::from_path(file.path()).filter_markers(false);

    let first_two: Vec<Event> = trace.parse().unwrap().take(2).map(Result::unwrap).collect();
    assert_eq!(first_two.len(), 2);

    // A fresh pass starts over from the first line.
    let again = trace.parse().unwrap().next().unwrap().unwrap();
    assert_eq!(again, first_two[0]);
}

#[test]
fn test_missing_file_is_fatal() {
    let trace = TraceCmdTrace::from_path("/definitely/not/here/trace.txt");

    assert!(matches!(trace.parse(), Err(TraceError::Open { .. })));
    assert!(matches!(trace.has_start_marker(), Err(TraceError::Open { .. })));
}

#[test]
fn test_custom_parser_registration() {
    let text = " irq/5-1 [000] 1.0: irq_handler_entry: irq=5 name=timer\n";
    let mut trace = TraceCmdTrace::from_text(text).filter_markers(false);
    trace
        .register_parser("irq_handler_entry", r"irq=(?P<irq>\d+) name=(?P<handler>\S+)")
        .unwrap();

    let events = collect(&trace);

    assert_eq!(events[0].field("irq").unwrap().as_int(), Some(5));
    assert_eq!(events[0].field("handler").unwrap().as_str(), Some("timer"));
    assert!(events[0].field("name").is_err());
}
