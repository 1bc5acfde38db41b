//! Dump log command implementation.
//!
//! Reads the log file directly, without taking the store lock or running
//! recovery, so it also works on a store that fails to open.

use serde::Serialize;
use std::path::Path;
use streamdb_core::log::{BinaryLog, LogEntry};
use streamdb_core::RecordKind;
use streamdb_storage::FileBackend;
use tracing::debug;

/// Log entry representation for output.
#[derive(Debug, Serialize)]
pub struct LogEntryInfo {
    /// Position (and clock) of the entry.
    pub position: u64,
    /// Entry kind.
    pub kind: String,
    /// Stream name.
    pub stream: String,
    /// Version within the stream.
    pub version: i32,
    /// Whether the published bit is set.
    pub published: bool,
    /// Payload size in bytes.
    pub data_size: usize,
    /// First bytes of the payload, hex-encoded.
    pub data_preview: String,
}

impl From<LogEntry> for LogEntryInfo {
    fn from(entry: LogEntry) -> Self {
        let preview = &entry.data[..16.min(entry.data.len())];
        Self {
            position: entry.position,
            kind: match entry.kind {
                RecordKind::Event => "event",
                RecordKind::Snapshot => "snapshot",
            }
            .to_string(),
            data_preview: hex_encode(preview),
            data_size: entry.data.len(),
            stream: entry.stream,
            version: entry.version,
            published: entry.published,
        }
    }
}

/// Runs the dump-log command.
pub fn run(
    path: &Path,
    limit: Option<usize>,
    start_offset: u64,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_path = path.join("events.log");

    if !log_path.exists() {
        return Err("Log file not found".into());
    }

    let log = BinaryLog::open(Box::new(FileBackend::open(&log_path)?), false)?;
    let (entries, error) = read_entries(&log, start_offset, limit);
    debug!(count = entries.len(), start_offset, "read log entries");

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            print_text_output(&entries);
        }
    }

    match error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Reads entries until the limit, the end of the log, or the first error.
fn read_entries(
    log: &BinaryLog,
    start_offset: u64,
    limit: Option<usize>,
) -> (Vec<LogEntryInfo>, Option<String>) {
    let mut entries = Vec::new();
    for entry in log.entries_from(start_offset).take(limit.unwrap_or(usize::MAX)) {
        match entry {
            Ok(entry) => entries.push(LogEntryInfo::from(entry)),
            Err(e) => return (entries, Some(e.to_string())),
        }
    }
    (entries, None)
}

fn print_text_output(entries: &[LogEntryInfo]) {
    println!("Log Entries ({} total)", entries.len());
    println!("================");
    println!();

    for entry in entries {
        print!(
            "[{:08}] {:8} {} v{}",
            entry.position, entry.kind, entry.stream, entry.version
        );
        if entry.published {
            print!(" published");
        }
        print!(" data={} bytes", entry.data_size);
        if !entry.data_preview.is_empty() {
            print!(" ({}...)", entry.data_preview);
        }
        println!();
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamdb_storage::InMemoryBackend;

    #[test]
    fn dump_stops_at_limit_and_errors() {
        let mut log = BinaryLog::open(Box::new(InMemoryBackend::new()), false).unwrap();
        for v in 1..=3 {
            log.append_entry(LogEntry::new(RecordKind::Event, "s", v, vec![0xAB]))
                .unwrap();
        }

        let (entries, error) = read_entries(&log, 0, Some(2));
        assert_eq!(entries.len(), 2);
        assert!(error.is_none());
        assert_eq!(entries[0].data_preview, "ab");
        assert_eq!(entries[1].kind, "event");

        let (entries, error) = read_entries(&log, 2, None);
        assert!(entries.is_empty());
        assert!(error.is_some());
    }
}
