//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while reading and parsing a trace
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Failed to open trace source {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read trace source: {0}")]
    Read(#[from] std::io::Error),

    #[error("Malformed event header: {0}")]
    MalformedHeader(String),

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("No such field: {0}")]
    NoSuchField(String),
}

/// Failure reported by a body parser
///
/// Never escapes event construction; see `TraceEvent::new`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Body parse failed: {0}")]
pub struct BodyParseError(pub String);

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
