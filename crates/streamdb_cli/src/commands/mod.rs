//! CLI command implementations.

pub mod dump_log;
pub mod inspect;
pub mod streams;
pub mod verify;

use std::path::Path;
use streamdb_core::{Config, LogStore};

/// Opens an existing store, running recovery.
pub fn open_existing(path: &Path) -> Result<LogStore, Box<dyn std::error::Error>> {
    if !path.join("events.log").exists() {
        return Err(format!("No store found at {:?}", path).into());
    }
    let config = Config::default().create_if_missing(false);
    Ok(LogStore::open_with_config(path, config)?)
}

/// Formats a byte count for humans.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
