//! Offline consistency check of log and index.

use crate::error::CoreResult;
use crate::index::StreamIndex;
use crate::log::BinaryLog;
use crate::types::RecordKind;
use std::collections::HashMap;

/// Result of walking the whole log against the stream index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Entries read from the log.
    pub entries: u64,
    /// Event entries.
    pub events: u64,
    /// Snapshot entries.
    pub snapshots: u64,
    /// Unpublished event entries.
    pub unpublished: u64,
    /// Distinct streams with at least one event.
    pub streams: usize,
    /// Bytes of log that were walked.
    pub log_size: u64,
    /// Problems found, in log order.
    pub problems: Vec<String>,
}

impl VerifyReport {
    /// Returns true if no problems were found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Walks every log entry and checks that
/// - each entry decodes
/// - each entry is indexed at its own position
/// - event versions of every stream are contiguous from 1
/// - the index holds no keys without a log entry
///
/// Corrupt entries end the walk and are reported as problems; only I/O
/// failures are returned as errors.
pub(crate) fn verify(log: &BinaryLog, index: &StreamIndex) -> CoreResult<VerifyReport> {
    let mut report = VerifyReport {
        log_size: log.len(),
        ..VerifyReport::default()
    };
    let mut last_versions: HashMap<String, i32> = HashMap::new();
    let mut indexed = 0usize;

    for entry in log.entries_from(0) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.is_fatal() => {
                report.problems.push(e.to_string());
                break;
            }
            Err(e) => return Err(e),
        };
        report.entries += 1;

        match index.lookup(&entry.stream, entry.kind, entry.version)? {
            Some(position) if position == entry.position => indexed += 1,
            Some(position) => report.problems.push(format!(
                "{:?} '{}' v{} at {} is indexed at {}",
                entry.kind, entry.stream, entry.version, entry.position, position
            )),
            None => report.problems.push(format!(
                "{:?} '{}' v{} at {} is not indexed",
                entry.kind, entry.stream, entry.version, entry.position
            )),
        }

        match entry.kind {
            RecordKind::Snapshot => report.snapshots += 1,
            RecordKind::Event => {
                report.events += 1;
                if !entry.published {
                    report.unpublished += 1;
                }
                let last = last_versions.entry(entry.stream.clone()).or_insert(0);
                if entry.version != *last + 1 {
                    report.problems.push(format!(
                        "event '{}' v{} at {} follows v{}",
                        entry.stream, entry.version, entry.position, last
                    ));
                }
                *last = entry.version;
            }
        }
    }

    if index.len() > indexed {
        report.problems.push(format!(
            "index holds {} keys but only {} match log entries",
            index.len(),
            indexed
        ));
    }
    report.streams = last_versions.len();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use crate::log::LogEntry;
    use streamdb_storage::InMemoryBackend;

    fn setup() -> (BinaryLog, StreamIndex) {
        (
            BinaryLog::open(Box::new(InMemoryBackend::new()), false).unwrap(),
            StreamIndex::new(Box::new(MemoryIndex::new()), Box::new(MemoryIndex::new())),
        )
    }

    fn append(log: &mut BinaryLog, index: &mut StreamIndex, kind: RecordKind, stream: &str, v: i32) {
        let entry = log
            .append_entry(LogEntry::new(kind, stream, v, b"d".to_vec()))
            .unwrap();
        index.insert_entry(stream, kind, v, entry.position).unwrap();
    }

    #[test]
    fn consistent_store_passes() {
        let (mut log, mut index) = setup();
        append(&mut log, &mut index, RecordKind::Event, "a", 1);
        append(&mut log, &mut index, RecordKind::Event, "b", 1);
        append(&mut log, &mut index, RecordKind::Snapshot, "a", 1);
        append(&mut log, &mut index, RecordKind::Event, "a", 2);

        let report = verify(&log, &index).unwrap();
        assert!(report.is_ok(), "{:?}", report.problems);
        assert_eq!(report.entries, 4);
        assert_eq!(report.events, 3);
        assert_eq!(report.snapshots, 1);
        assert_eq!(report.streams, 2);
        assert_eq!(report.unpublished, 3);
    }

    #[test]
    fn missing_index_entry_and_gap_reported() {
        let (mut log, mut index) = setup();
        append(&mut log, &mut index, RecordKind::Event, "a", 1);
        log.append_entry(LogEntry::new(RecordKind::Event, "a", 3, vec![]))
            .unwrap();

        let report = verify(&log, &index).unwrap();
        assert_eq!(report.problems.len(), 2);
        assert!(report.problems[0].contains("not indexed"));
        assert!(report.problems[1].contains("follows v1"));
    }

    #[test]
    fn dangling_index_key_reported() {
        let (mut log, mut index) = setup();
        append(&mut log, &mut index, RecordKind::Event, "a", 1);
        index.insert_entry("ghost", RecordKind::Event, 1, 4096).unwrap();

        let report = verify(&log, &index).unwrap();
        assert!(!report.is_ok());
        assert!(report.problems[0].contains("index holds 2 keys"));
    }
}
