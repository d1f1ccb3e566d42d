use std::path::PathBuf;

/// Arguments for the parse command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ParseArgs {
    /// trace-cmd report text file
    pub input: PathBuf,

    /// Event name patterns to keep (empty = all)
    pub event_names: Vec<String>,

    /// Only emit events between the trace markers
    pub filter_markers: bool,

    /// Stop after this many events
    pub limit: Option<usize>,

    /// Output path for JSON Lines (None = stdout)
    pub output: Option<PathBuf>,
}

impl Default for ParseArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::from("trace.txt"),
            event_names: Vec::new(),
            filter_markers: true,
            limit: None,
            output: None,
        }
    }
}
