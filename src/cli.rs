//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// stepgraph - explorable step-decomposition of math solutions
#[derive(Parser)]
#[command(
    name = "sg",
    about = "Decompose a math solution into explorable steps",
    version,
    after_help = "Logs are written to: ~/.local/share/stepgraph/logs/stepgraph.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Submit a solution for decomposition and print the steps
    Solve {
        /// The solution text to analyze
        text: String,

        /// Also expand the given top-level step (repeatable)
        #[arg(short, long = "expand", value_name = "STEP")]
        expand: Vec<usize>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Inspect the cached analysis history
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

/// History subcommands
#[derive(Subcommand)]
pub enum HistoryCommand {
    /// List cached analyses, most recent first
    List {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the cached steps of one analysis
    Show {
        /// Entry id (from `sg history list`)
        id: i64,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Remove all cached analyses
    Clear,
}

/// Output format for printing commands
#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stepgraph")
        .join("logs")
        .join("stepgraph.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_path_location() {
        assert!(get_log_path().ends_with("stepgraph/logs/stepgraph.log"));
    }

    #[test]
    fn test_output_format_from_str() {
        assert!(matches!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json)));
        assert!(matches!("TEXT".parse::<OutputFormat>(), Ok(OutputFormat::Text)));
        assert!("csv".parse::<OutputFormat>().is_err());
    }
}
