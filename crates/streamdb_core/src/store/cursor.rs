//! Per-stream cursor state.
//!
//! A cursor caches a contiguous window of version to position mappings
//! for one stream, plus the entries it has already materialized. The
//! window always ends at the highest version the cursor has seen:
//!
//! ```text
//! versions:   1   2   3 [ 4   5   6   7 ]
//!                         ^window_start ^max_version
//! ```
//!
//! Cursors live inside the store state and are only touched under the
//! store lock.

use crate::error::{CoreError, CoreResult};
use crate::index::StreamIndex;
use crate::log::{BinaryLog, LogEntry};
use crate::stats::StoreCounters;
use crate::store::outbox::Outbox;
use crate::types::{EventRecord, ExpectedVersion, NewEvent, RecordKind, SnapshotRecord};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnapshotState {
    Unknown,
    Missing,
    At { version: i32, position: u64 },
}

#[derive(Debug)]
pub(crate) struct StreamCursor {
    name: String,
    /// Whether `max_version` reflects at least one index query.
    synced: bool,
    window_start: i32,
    /// `positions[i]` is the position of version `window_start + i`.
    positions: Vec<u64>,
    max_version: i32,
    entries: BTreeMap<i32, EventRecord>,
    snapshot: SnapshotState,
    snapshot_cache: Option<SnapshotRecord>,
}

impl StreamCursor {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            synced: false,
            window_start: 1,
            positions: Vec::new(),
            max_version: 0,
            entries: BTreeMap::new(),
            snapshot: SnapshotState::Unknown,
            snapshot_cache: None,
        }
    }

    /// Queries versions beyond the current maximum and appends them to the
    /// window. Returns the current version.
    pub(crate) fn current_version(&mut self, index: &StreamIndex) -> CoreResult<i32> {
        let from = self.max_version + 1;
        let found = index.find_events(&self.name, from)?;
        if self.positions.is_empty() {
            self.window_start = from;
        }
        self.extend(from, found)?;
        self.synced = true;
        Ok(self.max_version)
    }

    /// Re-queries `[from, ..]` and replaces the window.
    fn reload_from(&mut self, index: &StreamIndex, from: i32) -> CoreResult<()> {
        let found = index.find_events(&self.name, from)?;
        if found.is_empty() {
            // Nothing at or after `from`; only a full scan can tell the
            // current version, so leave the window alone.
            return Ok(());
        }

        debug!(stream = %self.name, from, "reloading stream window");
        let previous_max = self.max_version;
        self.window_start = from;
        self.positions.clear();
        self.max_version = from - 1;
        self.extend(from, found)?;
        if self.synced && self.max_version < previous_max {
            return Err(CoreError::index_corruption(format!(
                "stream '{}' shrank from version {} to {}",
                self.name, previous_max, self.max_version
            )));
        }
        self.synced = true;
        Ok(())
    }

    fn extend(&mut self, from: i32, found: Vec<(i32, u64)>) -> CoreResult<()> {
        let mut expected = from;
        for (version, position) in found {
            if version != expected {
                return Err(CoreError::corrupt_entry(
                    position,
                    format!(
                        "stream '{}' has version {} where {} was expected",
                        self.name, version, expected
                    ),
                ));
            }
            self.positions.push(position);
            self.max_version = version;
            expected += 1;
        }
        Ok(())
    }

    /// Makes the window cover `[min_version, current]`.
    fn cover(&mut self, index: &StreamIndex, min_version: i32) -> CoreResult<()> {
        let needs_reload = if self.synced {
            min_version < self.window_start && min_version <= self.max_version
        } else {
            min_version > 1
        };
        if needs_reload {
            self.reload_from(index, min_version)
        } else {
            self.current_version(index).map(|_| ())
        }
    }

    fn position_of(&self, version: i32) -> Option<u64> {
        let offset = usize::try_from(version - self.window_start).ok()?;
        self.positions.get(offset).copied()
    }

    pub(crate) fn events(
        &mut self,
        index: &StreamIndex,
        log: &BinaryLog,
        counters: &StoreCounters,
        min_version: i32,
    ) -> CoreResult<Vec<EventRecord>> {
        let min_version = min_version.max(1);
        self.cover(index, min_version)?;
        if !self.synced || min_version > self.max_version {
            return Ok(Vec::new());
        }

        let mut events = Vec::with_capacity((self.max_version - min_version + 1) as usize);
        for version in min_version..=self.max_version {
            if let Some(cached) = self.entries.get(&version) {
                events.push(cached.clone());
                continue;
            }

            let position = self.position_of(version).ok_or_else(|| {
                CoreError::index_corruption(format!(
                    "stream '{}' window does not cover version {}",
                    self.name, version
                ))
            })?;
            let entry = self.read_own(log, position, RecordKind::Event, version)?;
            counters.record_read();
            let record = entry.into_event();
            self.entries.insert(version, record.clone());
            events.push(record);
        }
        Ok(events)
    }

    fn read_own(
        &self,
        log: &BinaryLog,
        position: u64,
        kind: RecordKind,
        version: i32,
    ) -> CoreResult<LogEntry> {
        let entry = log.read_entry(position)?.ok_or_else(|| {
            CoreError::corrupt_entry(position, "index points at the end of the log")
        })?;
        if entry.kind != kind || entry.stream != self.name || entry.version != version {
            return Err(CoreError::corrupt_entry(
                position,
                format!(
                    "index expected {:?} '{}' v{} but log holds {:?} '{}' v{}",
                    kind, self.name, version, entry.kind, entry.stream, entry.version
                ),
            ));
        }
        Ok(entry)
    }

    pub(crate) fn save_events(
        &mut self,
        log: &mut BinaryLog,
        index: &mut StreamIndex,
        outbox: &mut Outbox,
        counters: &StoreCounters,
        expected: ExpectedVersion,
        events: Vec<NewEvent>,
    ) -> CoreResult<Vec<EventRecord>> {
        let current = self.current_version(index)?;
        if let ExpectedVersion::Exactly(expected) = expected {
            if expected != current {
                return Err(CoreError::UnexpectedVersion {
                    expected,
                    actual: current,
                });
            }
        }

        let count = i32::try_from(events.len())
            .ok()
            .filter(|n| current.checked_add(*n).is_some())
            .ok_or_else(|| CoreError::invalid_argument("too many events for one stream"))?;

        // Reject the whole batch before anything reaches the log.
        let entries: Vec<LogEntry> = events
            .into_iter()
            .zip(current + 1..=current + count)
            .map(|(event, version)| {
                let mut entry = LogEntry::new(RecordKind::Event, self.name.as_str(), version, event.data);
                entry.published = event.published;
                entry.validate().map(|()| entry)
            })
            .collect::<CoreResult<_>>()?;

        let mut saved = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = log.append_entry(entry)?;
            index.insert_entry(&self.name, RecordKind::Event, entry.version, entry.position)?;
            counters.record_event(entry.next_position() - entry.position);

            if self.positions.is_empty() {
                self.window_start = entry.version;
            }
            self.positions.push(entry.position);
            self.max_version = entry.version;

            let record = entry.into_event();
            if !record.published {
                outbox.insert(record.clone());
            }
            self.entries.insert(record.version, record.clone());
            saved.push(record);
        }

        debug!(
            stream = %self.name,
            count = saved.len(),
            version = self.max_version,
            "appended events"
        );
        Ok(saved)
    }

    fn load_snapshot_state(&mut self, index: &StreamIndex) -> CoreResult<SnapshotState> {
        if self.snapshot == SnapshotState::Unknown {
            self.snapshot = match index.find_snapshot(&self.name)? {
                Some((version, position)) => SnapshotState::At { version, position },
                None => SnapshotState::Missing,
            };
        }
        Ok(self.snapshot)
    }

    pub(crate) fn snapshot_version(&mut self, index: &StreamIndex) -> CoreResult<i32> {
        Ok(match self.load_snapshot_state(index)? {
            SnapshotState::At { version, .. } => version,
            _ => 0,
        })
    }

    pub(crate) fn snapshot(
        &mut self,
        index: &StreamIndex,
        log: &BinaryLog,
        counters: &StoreCounters,
    ) -> CoreResult<Option<SnapshotRecord>> {
        let SnapshotState::At { version, position } = self.load_snapshot_state(index)? else {
            return Ok(None);
        };
        if let Some(cached) = self.snapshot_cache.as_ref().filter(|s| s.version == version) {
            return Ok(Some(cached.clone()));
        }

        let record = self
            .read_own(log, position, RecordKind::Snapshot, version)?
            .into_snapshot();
        counters.record_read();
        self.snapshot_cache = Some(record.clone());
        Ok(Some(record))
    }

    pub(crate) fn save_snapshot(
        &mut self,
        log: &mut BinaryLog,
        index: &mut StreamIndex,
        counters: &StoreCounters,
        snapshot: SnapshotRecord,
    ) -> CoreResult<bool> {
        if snapshot.stream != self.name {
            return Err(CoreError::invalid_argument(format!(
                "snapshot for stream '{}' saved through stream '{}'",
                snapshot.stream, self.name
            )));
        }
        if snapshot.version <= self.snapshot_version(index)? {
            counters.record_ignored_snapshot();
            return Ok(false);
        }

        let entry = LogEntry::new(
            RecordKind::Snapshot,
            self.name.as_str(),
            snapshot.version,
            snapshot.data,
        );
        let entry = log.append_entry(entry)?;
        index.insert_entry(&self.name, RecordKind::Snapshot, entry.version, entry.position)?;
        counters.record_snapshot(entry.next_position() - entry.position);

        debug!(stream = %self.name, version = entry.version, "saved snapshot");
        self.snapshot = SnapshotState::At {
            version: entry.version,
            position: entry.position,
        };
        self.snapshot_cache = Some(entry.into_snapshot());
        Ok(true)
    }

    /// Refreshes the published flag of a cached entry.
    pub(crate) fn mark_published(&mut self, version: i32) {
        if let Some(entry) = self.entries.get_mut(&version) {
            entry.published = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use streamdb_storage::InMemoryBackend;

    struct Parts {
        log: BinaryLog,
        index: StreamIndex,
        outbox: Outbox,
        counters: StoreCounters,
    }

    fn parts() -> Parts {
        Parts {
            log: BinaryLog::open(Box::new(InMemoryBackend::new()), false).unwrap(),
            index: StreamIndex::new(Box::new(MemoryIndex::new()), Box::new(MemoryIndex::new())),
            outbox: Outbox::new(),
            counters: StoreCounters::new(),
        }
    }

    fn append(p: &mut Parts, cursor: &mut StreamCursor, n: usize) -> Vec<EventRecord> {
        let events = (0..n).map(|i| NewEvent::new(vec![i as u8])).collect();
        cursor
            .save_events(
                &mut p.log,
                &mut p.index,
                &mut p.outbox,
                &p.counters,
                ExpectedVersion::Any,
                events,
            )
            .unwrap()
    }

    #[test]
    fn fresh_cursor_sees_existing_events() {
        let mut p = parts();
        let mut writer = StreamCursor::new("s");
        append(&mut p, &mut writer, 5);

        let mut reader = StreamCursor::new("s");
        assert_eq!(reader.current_version(&p.index).unwrap(), 5);
        let events = reader.events(&p.index, &p.log, &p.counters, 0).unwrap();
        let versions: Vec<i32> = events.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn window_jumps_backward() {
        let mut p = parts();
        let mut writer = StreamCursor::new("s");
        append(&mut p, &mut writer, 6);

        let mut reader = StreamCursor::new("s");
        let tail = reader.events(&p.index, &p.log, &p.counters, 4).unwrap();
        assert_eq!(tail.len(), 3);
        assert_eq!(reader.window_start, 4);

        let all = reader.events(&p.index, &p.log, &p.counters, 2).unwrap();
        assert_eq!(all.first().map(|e| e.version), Some(2));
        assert_eq!(all.len(), 5);
        assert_eq!(reader.window_start, 2);
    }

    #[test]
    fn window_extends_forward_after_foreign_append() {
        let mut p = parts();
        let mut writer = StreamCursor::new("s");
        let mut reader = StreamCursor::new("s");
        append(&mut p, &mut writer, 2);
        assert_eq!(reader.current_version(&p.index).unwrap(), 2);

        append(&mut p, &mut writer, 3);
        let events = reader.events(&p.index, &p.log, &p.counters, 3).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(reader.current_version(&p.index).unwrap(), 5);
    }

    #[test]
    fn events_past_current_version_are_empty() {
        let mut p = parts();
        let mut writer = StreamCursor::new("s");
        append(&mut p, &mut writer, 2);

        let mut reader = StreamCursor::new("s");
        assert!(reader.events(&p.index, &p.log, &p.counters, 9).unwrap().is_empty());
        assert_eq!(reader.current_version(&p.index).unwrap(), 2);
    }

    #[test]
    fn version_gap_is_corruption() {
        let mut p = parts();
        p.index.insert_entry("s", RecordKind::Event, 1, 0).unwrap();
        p.index.insert_entry("s", RecordKind::Event, 3, 40).unwrap();

        let mut cursor = StreamCursor::new("s");
        assert!(matches!(
            cursor.current_version(&p.index),
            Err(CoreError::CorruptEntry { position: 40, .. })
        ));
    }

    #[test]
    fn index_pointing_at_wrong_entry_is_corruption() {
        let mut p = parts();
        let mut other = StreamCursor::new("other");
        let saved = append(&mut p, &mut other, 1);
        p.index
            .insert_entry("s", RecordKind::Event, 1, saved[0].clock.as_u64())
            .unwrap();

        let mut cursor = StreamCursor::new("s");
        assert!(matches!(
            cursor.events(&p.index, &p.log, &p.counters, 1),
            Err(CoreError::CorruptEntry { .. })
        ));
    }

    #[test]
    fn oversized_batch_writes_nothing() {
        let mut p = parts();
        let mut cursor = StreamCursor::new("s");
        let events = vec![NewEvent::new(vec![1]), NewEvent::new(vec![0; 70_000])];
        let result = cursor.save_events(
            &mut p.log,
            &mut p.index,
            &mut p.outbox,
            &p.counters,
            ExpectedVersion::Any,
            events,
        );

        assert!(matches!(result, Err(CoreError::InvalidArgument { .. })));
        assert!(p.log.is_empty());
        assert_eq!(cursor.current_version(&p.index).unwrap(), 0);
    }

    #[test]
    fn published_events_skip_outbox() {
        let mut p = parts();
        let mut cursor = StreamCursor::new("s");
        cursor
            .save_events(
                &mut p.log,
                &mut p.index,
                &mut p.outbox,
                &p.counters,
                ExpectedVersion::Exactly(0),
                vec![NewEvent::new(b"a".to_vec()).published(), NewEvent::new(b"b".to_vec())],
            )
            .unwrap();

        let pending = p.outbox.events();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].version, 2);
    }

    #[test]
    fn snapshot_for_other_stream_rejected() {
        let mut p = parts();
        let mut cursor = StreamCursor::new("s");
        let result = cursor.save_snapshot(
            &mut p.log,
            &mut p.index,
            &p.counters,
            SnapshotRecord::new("t", 1, vec![]),
        );
        assert!(matches!(result, Err(CoreError::InvalidArgument { .. })));
    }
}
