//! StreamDB CLI
//!
//! Command-line tools for StreamDB store maintenance.
//!
//! # Commands
//!
//! - `inspect` - Display store statistics and headers
//! - `verify` - Check the log against the stream index
//! - `dump-log` - Dump log entries for debugging
//! - `streams` - List streams and their versions

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// StreamDB command-line store tools.
#[derive(Parser)]
#[command(name = "streamdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display store statistics and headers
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check every log entry against the stream index
    Verify,

    /// Dump log entries for debugging
    DumpLog {
        /// Maximum number of entries to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Start from this log position
        #[arg(short, long, default_value = "0")]
        offset: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List streams with their current and snapshot versions
    Streams {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Store path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Store path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::DumpLog {
            limit,
            offset,
            format,
        } => {
            let path = cli.path.ok_or("Store path required for dump-log")?;
            commands::dump_log::run(&path, limit, offset, &format)?;
        }
        Commands::Streams { format } => {
            let path = cli.path.ok_or("Store path required for streams")?;
            commands::streams::run(&path, &format)?;
        }
        Commands::Version => {
            println!("StreamDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("StreamDB Core v{}", streamdb_core::VERSION);
        }
    }

    Ok(())
}
