//! Store state shared by the store and its stream handles.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::index::{Headers, StreamIndex};
use crate::log::{is_aligned, BinaryLog, ReadOutcome};
use crate::store::cursor::StreamCursor;
use crate::store::outbox::Outbox;
use crate::types::RecordKind;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Everything a store mutates, guarded by one lock.
#[derive(Debug)]
pub(crate) struct StoreState {
    pub(crate) config: Config,
    pub(crate) log: BinaryLog,
    pub(crate) index: StreamIndex,
    pub(crate) outbox: Outbox,
    pub(crate) cursors: HashMap<String, StreamCursor>,
    closed: bool,
}

/// What recovery found while walking the log.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecoveryReport {
    pub(crate) start: u64,
    pub(crate) entries: u64,
    pub(crate) unpublished: usize,
    pub(crate) reindexed: u64,
    pub(crate) truncated: bool,
}

impl StoreState {
    /// Builds the state and runs recovery.
    pub(crate) fn recover(config: Config, log: BinaryLog, index: StreamIndex) -> CoreResult<Self> {
        let mut state = Self {
            config,
            log,
            index,
            outbox: Outbox::new(),
            cursors: HashMap::new(),
            closed: false,
        };
        let report = state.replay()?;
        state.persist_headers(state.config.sync_on_close)?;

        info!(
            log_size = state.log.len(),
            start = report.start,
            entries = report.entries,
            unpublished = report.unpublished,
            reindexed = report.reindexed,
            truncated = report.truncated,
            "store recovered"
        );
        Ok(state)
    }

    /// Walks the log from the earlier durable header, rebuilding the
    /// outbox and any index entries lost past the durable append position.
    fn replay(&mut self) -> CoreResult<RecoveryReport> {
        let headers = self.index.read_headers()?;
        let log_len = self.log.len();
        for (name, value) in [
            ("append position", headers.append_position),
            ("unpublished checkpoint", headers.unpublished_checkpoint),
        ] {
            if value > log_len || !is_aligned(value) {
                return Err(CoreError::invalid_format(format!(
                    "{name} header {value} does not fit a log of {log_len} bytes"
                )));
            }
        }

        let start = headers.unpublished_checkpoint.min(headers.append_position);
        let mut report = RecoveryReport {
            start,
            ..RecoveryReport::default()
        };
        let mut position = start;

        loop {
            let outcome = match self.log.read_outcome(position) {
                Err(CoreError::CorruptEntry { message: reason, .. })
                    if position >= headers.append_position =>
                {
                    warn!(position, %reason, "undecodable entry past the durable append position");
                    ReadOutcome::Torn
                }
                other => other?,
            };
            let entry = match outcome {
                ReadOutcome::Entry(entry) => entry,
                ReadOutcome::End => break,
                ReadOutcome::Torn if position >= headers.append_position => {
                    self.log.truncate_torn_tail(position)?;
                    report.truncated = true;
                    break;
                }
                ReadOutcome::Torn => {
                    return Err(CoreError::corrupt_entry(
                        position,
                        "entry before the durable append position is cut short",
                    ));
                }
            };
            report.entries += 1;

            if position >= headers.append_position
                && self.reindex(position, &entry.stream, entry.kind, entry.version)?
            {
                report.reindexed += 1;
            }

            position = entry.next_position();
            if entry.kind == RecordKind::Event && !entry.published {
                self.outbox.insert(entry.into_event());
                report.unpublished += 1;
            }
        }

        if report.reindexed > 0 {
            warn!(
                count = report.reindexed,
                from = headers.append_position,
                "re-indexed log entries missing from the stream index"
            );
        }
        Ok(report)
    }

    /// Ensures the entry at `position` is indexed. Returns true if it was
    /// missing.
    fn reindex(
        &mut self,
        position: u64,
        stream: &str,
        kind: RecordKind,
        version: i32,
    ) -> CoreResult<bool> {
        match self.index.lookup(stream, kind, version)? {
            None => {
                self.index.insert_entry(stream, kind, version, position)?;
                Ok(true)
            }
            Some(indexed) if indexed == position => Ok(false),
            Some(indexed) => Err(CoreError::corrupt_entry(
                position,
                format!(
                    "{kind:?} '{stream}' v{version} is indexed at {indexed} but logged at {position}"
                ),
            )),
        }
    }

    /// Headers as they would be persisted now.
    pub(crate) fn current_headers(&self) -> Headers {
        let append_position = self.log.append_position();
        Headers {
            append_position,
            unpublished_checkpoint: self.outbox.earliest().unwrap_or(append_position),
        }
    }

    /// Flushes the log and stream keys, then records the headers that
    /// describe them.
    ///
    /// With `durable`, the log and stream keys are fsynced before the
    /// headers are written, and the headers are fsynced last. A durable
    /// append position never points past durable log bytes.
    pub(crate) fn persist_headers(&mut self, durable: bool) -> CoreResult<()> {
        let headers = self.current_headers();
        if durable {
            self.log.sync()?;
        } else {
            self.log.flush()?;
        }
        self.index.flush_streams(durable)?;
        self.index.write_headers(&headers)?;
        self.index.flush_headers(durable)?;
        debug!(
            append_position = headers.append_position,
            unpublished_checkpoint = headers.unpublished_checkpoint,
            durable,
            "persisted store headers"
        );
        Ok(())
    }

    pub(crate) fn ensure_open(&self) -> CoreResult<()> {
        if self.closed {
            Err(CoreError::StoreClosed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    /// Persists headers and releases cached cursors. Idempotent.
    pub(crate) fn close(&mut self) -> CoreResult<()> {
        if self.closed {
            return Ok(());
        }

        self.persist_headers(self.config.sync_on_close)?;
        self.closed = true;
        self.cursors.clear();

        info!(
            log_size = self.log.len(),
            unpublished = self.outbox.len(),
            "store closed"
        );
        Ok(())
    }

    /// Splits the state into the cursor for `name` and the parts it
    /// works against, creating the cursor on first use.
    pub(crate) fn stream_parts(&mut self, name: &str) -> StreamParts<'_> {
        let cursor = self
            .cursors
            .entry(name.to_string())
            .or_insert_with(|| StreamCursor::new(name));
        StreamParts {
            cursor,
            log: &mut self.log,
            index: &mut self.index,
            outbox: &mut self.outbox,
        }
    }
}

/// Disjoint borrows of the state used by one stream operation.
pub(crate) struct StreamParts<'a> {
    pub(crate) cursor: &'a mut StreamCursor,
    pub(crate) log: &'a mut BinaryLog,
    pub(crate) index: &'a mut StreamIndex,
    pub(crate) outbox: &'a mut Outbox,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{FileIndex, MemoryIndex};
    use crate::log::LogEntry;
    use crate::testing::{first, last, OpLog, RecordingBackend};
    use streamdb_storage::InMemoryBackend;

    fn log_with(entries: Vec<LogEntry>) -> (Vec<u8>, Vec<u64>) {
        let mut bytes = Vec::new();
        let mut positions = Vec::new();
        for entry in entries {
            let position = bytes.len() as u64;
            positions.push(position);
            bytes.extend(entry.encode(position).unwrap());
        }
        (bytes, positions)
    }

    fn empty_index() -> StreamIndex {
        StreamIndex::new(Box::new(MemoryIndex::new()), Box::new(MemoryIndex::new()))
    }

    fn event(stream: &str, version: i32) -> LogEntry {
        LogEntry::new(RecordKind::Event, stream, version, b"e".to_vec())
    }

    #[test]
    fn recovery_rebuilds_outbox_and_index() {
        let mut published = event("a", 2);
        published.published = true;
        let (bytes, positions) = log_with(vec![event("a", 1), published, event("b", 1)]);

        let log = BinaryLog::open(Box::new(InMemoryBackend::with_data(bytes)), false).unwrap();
        let state = StoreState::recover(Config::default(), log, empty_index()).unwrap();

        let pending: Vec<u64> = state.outbox.events().iter().map(|e| e.clock.as_u64()).collect();
        assert_eq!(pending, vec![positions[0], positions[2]]);
        assert_eq!(state.index.len(), 3);
        assert_eq!(
            state.index.read_headers().unwrap(),
            Headers {
                append_position: state.log.len(),
                unpublished_checkpoint: positions[0],
            }
        );
    }

    #[test]
    fn header_past_log_end_is_invalid() {
        let mut index = empty_index();
        index
            .write_headers(&Headers {
                append_position: 1024,
                unpublished_checkpoint: 0,
            })
            .unwrap();
        let log = BinaryLog::open(Box::new(InMemoryBackend::new()), false).unwrap();

        let result = StoreState::recover(Config::default(), log, index);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn conflicting_index_entry_is_corruption() {
        let (bytes, _) = log_with(vec![event("a", 1)]);
        let mut index = empty_index();
        index.insert_entry("a", RecordKind::Event, 1, 4096).unwrap();

        let log = BinaryLog::open(Box::new(InMemoryBackend::with_data(bytes)), false).unwrap();
        let result = StoreState::recover(Config::default(), log, index);
        assert!(matches!(result, Err(CoreError::CorruptEntry { position: 0, .. })));
    }

    #[test]
    fn torn_tail_is_truncated() {
        let (mut bytes, _) = log_with(vec![event("a", 1)]);
        let complete = bytes.len() as u64;
        bytes.extend_from_slice(&[1, 1, 0, 1, 0, 0]);

        let log = BinaryLog::open(Box::new(InMemoryBackend::with_data(bytes)), false).unwrap();
        let state = StoreState::recover(Config::default(), log, empty_index()).unwrap();
        assert_eq!(state.log.len(), complete);
    }

    #[test]
    fn close_is_idempotent() {
        let log = BinaryLog::open(Box::new(InMemoryBackend::new()), false).unwrap();
        let mut state = StoreState::recover(Config::default(), log, empty_index()).unwrap();

        state.close().unwrap();
        state.close().unwrap();
        assert!(matches!(state.ensure_open(), Err(CoreError::StoreClosed)));
    }

    #[test]
    fn zero_filled_tail_is_truncated() {
        let (mut bytes, _) = log_with(vec![event("a", 1)]);
        let complete = bytes.len() as u64;
        bytes.extend_from_slice(&[0u8; 20]);

        let log = BinaryLog::open(Box::new(InMemoryBackend::with_data(bytes)), false).unwrap();
        let state = StoreState::recover(Config::default(), log, empty_index()).unwrap();
        assert_eq!(state.log.len(), complete);
        assert_eq!(state.outbox.len(), 1);
        assert_eq!(state.index.read_headers().unwrap().append_position, complete);
    }

    #[test]
    fn corrupt_entry_before_append_header_is_fatal() {
        let (mut bytes, positions) = log_with(vec![event("a", 1), event("a", 2)]);
        let mut index = empty_index();
        index.insert_entry("a", RecordKind::Event, 1, positions[0]).unwrap();
        index.insert_entry("a", RecordKind::Event, 2, positions[1]).unwrap();
        index
            .write_headers(&Headers {
                append_position: bytes.len() as u64,
                unpublished_checkpoint: 0,
            })
            .unwrap();
        bytes[positions[1] as usize..].fill(0);

        let log = BinaryLog::open(Box::new(InMemoryBackend::with_data(bytes)), false).unwrap();
        let result = StoreState::recover(Config::default(), log, index);
        assert!(matches!(
            result,
            Err(CoreError::CorruptEntry { position, .. }) if position == positions[1]
        ));
    }

    fn recording_state(config: Config, ops: &OpLog) -> StoreState {
        let log = BinaryLog::open(Box::new(RecordingBackend::new("log", ops)), false).unwrap();
        let index = StreamIndex::new(
            Box::new(FileIndex::open(Box::new(RecordingBackend::new("streams", ops)), false).unwrap()),
            Box::new(FileIndex::open(Box::new(RecordingBackend::new("headers", ops)), false).unwrap()),
        );
        let mut state = StoreState::recover(config, log, index).unwrap();
        let entry = state.log.append_entry(event("a", 1)).unwrap();
        state
            .index
            .insert_entry("a", RecordKind::Event, 1, entry.position)
            .unwrap();
        ops.lock().clear();
        state
    }

    #[test]
    fn durable_close_syncs_log_before_headers() {
        let ops = OpLog::default();
        let mut state = recording_state(Config::default(), &ops);

        state.close().unwrap();
        let ops = ops.lock().clone();
        let headers_written = first(&ops, "headers:append").unwrap();
        assert!(first(&ops, "log:sync").unwrap() < headers_written, "{ops:?}");
        assert!(first(&ops, "streams:sync").unwrap() < headers_written, "{ops:?}");
        assert!(
            last(&ops, "headers:sync").unwrap() > last(&ops, "headers:append").unwrap(),
            "{ops:?}"
        );
    }

    #[test]
    fn close_without_sync_only_flushes() {
        let ops = OpLog::default();
        let mut state = recording_state(Config::default().sync_on_close(false), &ops);

        state.close().unwrap();
        let ops = ops.lock().clone();
        assert!(ops.iter().all(|op| !op.ends_with(":sync")), "{ops:?}");
        assert!(first(&ops, "log:flush").unwrap() < first(&ops, "headers:append").unwrap());
    }
}
