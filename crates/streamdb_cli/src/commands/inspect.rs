//! Inspect command implementation.

use super::{format_size, open_existing};
use serde::Serialize;
use std::path::Path;
use streamdb_core::LogStore;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Log size in bytes.
    pub log_size: u64,
    /// Stream index journal size in bytes.
    pub stream_index_size: u64,
    /// Header journal size in bytes.
    pub header_index_size: u64,
    /// Durable append position header.
    pub append_position: u64,
    /// Durable unpublished checkpoint header.
    pub unpublished_checkpoint: u64,
    /// Number of stream index keys.
    pub indexed_keys: usize,
    /// Number of streams with events.
    pub stream_count: usize,
    /// Number of unpublished events.
    pub unpublished_events: usize,
    /// Position of the earliest unpublished event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earliest_unpublished: Option<u64>,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    let result = inspect(path, &store)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    store.close()?;
    Ok(())
}

fn inspect(path: &Path, store: &LogStore) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let stats = store.stats()?;
    let headers = store.headers()?;
    let file_size = |name: &str| std::fs::metadata(path.join(name)).map_or(0, |m| m.len());

    Ok(InspectResult {
        path: path.display().to_string(),
        log_size: stats.log_size,
        stream_index_size: file_size("streams.idx"),
        header_index_size: file_size("headers.idx"),
        append_position: headers.append_position,
        unpublished_checkpoint: headers.unpublished_checkpoint,
        indexed_keys: stats.indexed_keys,
        stream_count: store.list_streams()?.len(),
        unpublished_events: stats.unpublished_events,
        earliest_unpublished: stats.earliest_unpublished,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("StreamDB Store Inspection");
    println!("=========================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Storage:");
    println!("  Log size:          {} bytes", format_size(result.log_size));
    println!(
        "  Stream index size: {} bytes",
        format_size(result.stream_index_size)
    );
    println!(
        "  Header index size: {} bytes",
        format_size(result.header_index_size)
    );
    println!();
    println!("Headers:");
    println!("  Append position:        {}", result.append_position);
    println!("  Unpublished checkpoint: {}", result.unpublished_checkpoint);
    println!();
    println!("Streams:");
    println!("  Streams:      {}", result.stream_count);
    println!("  Indexed keys: {}", result.indexed_keys);
    println!();
    println!("Outbox:");
    println!("  Unpublished events: {}", result.unpublished_events);
    if let Some(position) = result.earliest_unpublished {
        println!("  Earliest at:        {}", position);
    }
}
