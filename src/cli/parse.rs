//! CLI parse: clap types for Folio. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Folio CLI - dependency-ordered, validated document generation
#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Schedule, generate and validate multi-section documents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file layered over the workspace configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the generation queue and print it
    Plan {
        /// Task pool file (TOML with [[task]] tables, or a JSON array)
        #[arg(long)]
        tasks: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Generate every task in queue order
    Run {
        /// Task pool file (TOML with [[task]] tables, or a JSON array)
        #[arg(long)]
        tasks: PathBuf,
        /// Concurrent task workers (overrides orchestrator.workers)
        #[arg(long)]
        workers: Option<usize>,
        /// Directory for finalized <task>.md documents
        #[arg(long)]
        out: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Completion cache commands
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Remove every entry from the durable cache tier
    Clear,
}
