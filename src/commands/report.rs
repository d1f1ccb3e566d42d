//! Report command implementations.
//!
//! The parse command:
//! 1. Opens the trace-cmd report
//! 2. Checks for a start marker when marker filtering is on
//! 3. Streams events through the reader
//! 4. Writes each event as a JSON line

use super::models::ParseArgs;
use crate::output::{create_event_file, EventWriter};
use crate::parser::{compile_name_filter, LineSource, TraceCmdTrace};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io::Write;
use std::path::Path;
use std::time::Instant;

/// Execute the parse command
///
/// **Public** - main entry point called from main.rs
///
/// # Returns
/// Number of events written
///
/// # Errors
/// * Invalid event name patterns
/// * Trace file cannot be opened or read
/// * Output cannot be written
pub fn execute_parse(args: &ParseArgs) -> Result<usize> {
    let start_time = Instant::now();

    info!("Parsing trace: {}", args.input.display());

    let trace = TraceCmdTrace::from_path(args.input.clone())
        .filter_markers(args.filter_markers)
        .with_event_names(args.event_names.clone())
        .context("Invalid event name pattern")?;

    if args.filter_markers
        && !trace
            .has_start_marker()
            .context("Failed to scan trace for markers")?
    {
        warn!(
            "No {} in {}; no events will be emitted (try --no-markers)",
            crate::utils::config::TRACE_MARKER_START,
            args.input.display()
        );
    }

    let count = match &args.output {
        Some(path) => {
            let writer = create_event_file(path).context("Failed to create output file")?;
            let count = stream_events(&trace, writer, args.limit)?;
            info!("✓ {} events written to: {}", count, path.display());
            count
        }
        None => {
            let stdout = std::io::stdout();
            stream_events(&trace, EventWriter::new(stdout.lock()), args.limit)?
        }
    };

    let elapsed = start_time.elapsed();
    info!("Parse completed in {:.2}s", elapsed.as_secs_f64());

    Ok(count)
}

/// Pull events from `trace` into `writer`, stopping after `limit`
///
/// **Public** - reusable with any line source or writer
pub fn stream_events<S, W>(
    trace: &TraceCmdTrace<S>,
    mut writer: EventWriter<W>,
    limit: Option<usize>,
) -> Result<usize>
where
    S: LineSource,
    W: Write,
{
    let events = trace
        .parse()
        .with_context(|| format!("Failed to open trace {}", trace.source().describe()))?;

    for event in events.take(limit.unwrap_or(usize::MAX)) {
        let event = event.context("Failed while reading trace")?;
        writer
            .write_event(&event)
            .context("Failed to write event")?;
    }

    debug!("Streamed {} events, flushing", writer.written());

    writer.finish().context("Failed to flush output")
}

/// Execute the markers command
///
/// **Public** - reports whether the trace carries a start marker
pub fn execute_markers(input: &Path) -> Result<bool> {
    let trace = TraceCmdTrace::from_path(input);
    let found = trace
        .has_start_marker()
        .with_context(|| format!("Failed to scan {}", input.display()))?;

    println!(
        "{}: start marker {}",
        input.display(),
        if found { "present" } else { "absent" }
    );

    Ok(found)
}

/// Validate parse arguments
///
/// **Public** - can be called before execute_parse for early validation
pub fn validate_args(args: &ParseArgs) -> Result<()> {
    if args.input.as_os_str().is_empty() {
        anyhow::bail!("Input path cannot be empty");
    }

    if args.limit == Some(0) {
        anyhow::bail!("limit must be greater than 0");
    }

    for name in &args.event_names {
        if name.is_empty() {
            anyhow::bail!("Event name pattern cannot be empty");
        }
        compile_name_filter(name)
            .with_context(|| format!("Invalid event name pattern '{}'", name))?;
    }

    if let Some(output) = &args.output {
        if output.as_os_str().is_empty() {
            anyhow::bail!("Output path cannot be empty");
        }
    }

    Ok(())
}
