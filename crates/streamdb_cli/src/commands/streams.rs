//! Streams command implementation.

use super::open_existing;
use serde::Serialize;
use std::path::Path;
use streamdb_core::{EventStore, EventStream, LogStore, OpenMode};

/// One stream in the listing.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StreamInfo {
    /// Stream name.
    pub name: String,
    /// Highest event version.
    pub version: i32,
    /// Version of the latest snapshot, 0 if none.
    pub snapshot_version: i32,
}

/// Runs the streams command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    let streams = list(&store)?;
    store.close()?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&streams)?);
        }
        _ => {
            println!("Streams ({} total)", streams.len());
            println!("================");
            for stream in &streams {
                println!(
                    "  {:40} v{} (snapshot v{})",
                    stream.name, stream.version, stream.snapshot_version
                );
            }
        }
    }

    Ok(())
}

fn list(store: &LogStore) -> Result<Vec<StreamInfo>, Box<dyn std::error::Error>> {
    let mut streams = Vec::new();
    for name in store.list_streams()? {
        let Some(stream) = store.get_stream(&name, OpenMode::Open)? else {
            continue;
        };
        streams.push(StreamInfo {
            version: stream.get_current_version()?,
            snapshot_version: stream.get_snapshot_version()?,
            name,
        });
    }
    Ok(streams)
}
