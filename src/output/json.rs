//! JSON Lines event output writer.
//!
//! Writes one serialized event per line, so output can be consumed as a
//! stream just like the trace it came from.

use crate::parser::Event;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Streams events to a writer as JSON Lines
///
/// **Public** - used by the parse command
pub struct EventWriter<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> EventWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Serialize one event followed by a newline
    ///
    /// # Errors
    /// * `OutputError::SerializationFailed` - event could not be serialized
    /// * `OutputError::WriteFailed` - I/O error during write
    pub fn write_event(&mut self, event: &Event) -> Result<(), OutputError> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Number of events written so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and return the number of events written
    pub fn finish(mut self) -> Result<usize, OutputError> {
        self.writer.flush()?;
        Ok(self.written)
    }
}

/// Open a JSON Lines output file, creating parent directories
///
/// **Public** - main entry point for file output
///
/// # Errors
/// * `OutputError::InvalidPath` - Path is empty or a directory, or its parent
///   cannot be created
/// * `OutputError::WriteFailed` - File cannot be created
pub fn create_event_file(
    output_path: impl AsRef<Path>,
) -> Result<EventWriter<BufWriter<File>>, OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing events to: {}", output_path.display());

    validate_output_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let file = File::create(output_path)?;
    Ok(EventWriter::new(BufWriter::new(file)))
}

/// Write a complete slice of events to a file
///
/// **Public** - convenience for callers that already hold the events
pub fn write_events(
    events: &[Event],
    output_path: impl AsRef<Path>,
) -> Result<usize, OutputError> {
    let mut writer = create_event_file(output_path)?;
    for event in events {
        writer.write_event(event)?;
    }
    writer.finish()
}

/// Validate that output path is writable
///
/// **Private** - internal validation
fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}
