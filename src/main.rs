//! trace-cmd report CLI
//!
//! Streams events out of `trace-cmd report` text files as JSON Lines.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use trace_cmd_report::commands::{execute_markers, execute_parse, validate_args, ParseArgs};
use trace_cmd_report::utils::config::{TRACE_MARKER_START, TRACE_MARKER_STOP};

/// trace-report - structured events from trace-cmd report output
#[derive(Parser, Debug)]
#[command(name = "trace-report")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a report and print its events as JSON Lines
    Parse {
        /// trace-cmd report text file
        #[arg(short, long)]
        file: PathBuf,

        /// Event name pattern to keep (repeatable, whole-name regex)
        #[arg(short, long = "event")]
        events: Vec<String>,

        /// Emit events from the whole file, ignoring trace markers
        #[arg(long)]
        no_markers: bool,

        /// Stop after this many events
        #[arg(short, long)]
        limit: Option<usize>,

        /// Write JSON Lines here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report whether a trace contains a start marker
    Markers {
        /// trace-cmd report text file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Parse {
            file,
            events,
            no_markers,
            limit,
            output,
        } => {
            let args = ParseArgs {
                input: file,
                event_names: events,
                filter_markers: !no_markers,
                limit,
                output,
            };

            validate_args(&args)?;
            execute_parse(&args)?;
        }

        Commands::Markers { file } => {
            execute_markers(&file)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}

/// Display version information
///
/// **Private** - internal command implementation
fn display_version() {
    println!("trace-report v{}", env!("CARGO_PKG_VERSION"));
    println!("Markers: {} / {}", TRACE_MARKER_START, TRACE_MARKER_STOP);
    println!();
    println!("Streaming parser for trace-cmd report output.");
}
