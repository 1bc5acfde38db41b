//! File-backed event store and recovery.

use crate::config::Config;
use crate::dir::StoreDir;
use crate::error::{CoreError, CoreResult};
use crate::index::{FileIndex, Headers, MemoryIndex, OrderedIndex, StreamIndex};
use crate::log::{is_aligned, BinaryLog, LogEntry, MAX_KEY_LEN};
use crate::stats::{StoreCounters, StoreStats};
use crate::store::cursor::StreamCursor;
use crate::store::since::EventsSince;
use crate::store::state::StoreState;
use crate::store::stream::LogStream;
use crate::store::verify::{verify, VerifyReport};
use crate::store::{EventStore, EventStream};
use crate::types::{Clock, EventRecord, OpenMode};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use streamdb_storage::StorageBackend;
use tracing::{info, warn};

/// The event store handle.
///
/// `LogStore` is the primary entry point of StreamDB. It owns:
/// - the binary log (source of truth for events and snapshots)
/// - the stream index and the durable headers
/// - the outbox of unpublished events
/// - one cached [`LogStream`] per opened stream name
///
/// # Opening a Store
///
/// ```rust,ignore
/// use streamdb_core::{EventStore, EventStream, ExpectedVersion, LogStore, NewEvent, OpenMode};
/// use std::path::Path;
///
/// let store = LogStore::open(Path::new("my_store"))?;
/// let stream = store.get_stream("order-17", OpenMode::Create)?.unwrap();
/// stream.save_events(ExpectedVersion::Exactly(0), vec![NewEvent::new(b"placed".to_vec())])?;
///
/// for mut event in store.get_unpublished_events()? {
///     // deliver, then acknowledge
///     store.mark_as_published(&mut event)?;
/// }
/// store.close()?;
/// ```
///
/// # In-Memory Stores
///
/// For testing, use `LogStore::open_in_memory()`.
pub struct LogStore {
    state: Arc<Mutex<StoreState>>,
    handles: Mutex<HashMap<String, Arc<LogStream>>>,
    counters: Arc<StoreCounters>,
    /// Store directory (holds the lock). None for stores built from parts.
    dir: Option<StoreDir>,
}

impl LogStore {
    /// Opens a store from a directory path with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another process has the store locked (`DatabaseLocked`)
    /// - Recovery finds a corrupt entry (`CorruptEntry`) or index
    ///   (`IndexCorruption`)
    /// - I/O errors occur
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a store from a directory path with custom configuration.
    ///
    /// ```rust,ignore
    /// use streamdb_core::{Config, LogStore};
    /// use std::path::Path;
    ///
    /// let config = Config::default().sync_on_append(false);
    /// let store = LogStore::open_with_config(Path::new("my_store"), config)?;
    /// ```
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        use streamdb_storage::FileBackend;

        let dir = StoreDir::open(path, config.create_if_missing)?;

        if !config.create_if_missing && dir.is_new_store() {
            return Err(CoreError::invalid_format(
                "store does not exist and create_if_missing is false",
            ));
        }
        if config.error_if_exists && !dir.is_new_store() {
            return Err(CoreError::invalid_format(
                "store already exists and error_if_exists is true",
            ));
        }

        let log_backend = FileBackend::open_with_create_dirs(&dir.log_path())?;
        let stream_journal = FileBackend::open_with_create_dirs(&dir.stream_index_path())?;
        let header_journal = FileBackend::open_with_create_dirs(&dir.header_index_path())?;

        let streams = FileIndex::open(Box::new(stream_journal), config.sync_on_append)?;
        let headers = FileIndex::open(Box::new(header_journal), config.sync_on_append)?;

        info!(path = %dir.path().display(), "opening store");
        let mut store = Self::with_parts(
            config,
            Box::new(log_backend),
            Box::new(streams),
            Box::new(headers),
        )?;
        store.dir = Some(dir);
        Ok(store)
    }

    /// Builds a store over the given backends and runs recovery.
    ///
    /// This is a lower-level constructor for pre-configured backends. For
    /// most use cases, prefer [`LogStore::open`].
    pub fn with_parts(
        config: Config,
        log_backend: Box<dyn StorageBackend>,
        stream_index: Box<dyn OrderedIndex>,
        header_index: Box<dyn OrderedIndex>,
    ) -> CoreResult<Self> {
        let log = BinaryLog::open(log_backend, config.sync_on_append)?;
        let index = StreamIndex::new(stream_index, header_index);
        let state = StoreState::recover(config, log, index)?;

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            handles: Mutex::new(HashMap::new()),
            counters: Arc::new(StoreCounters::new()),
            dir: None,
        })
    }

    /// Opens a fresh in-memory store for testing.
    ///
    /// Data is lost when the store is dropped.
    pub fn open_in_memory() -> CoreResult<Self> {
        use streamdb_storage::InMemoryBackend;
        Self::with_parts(
            Config::default(),
            Box::new(InMemoryBackend::new()),
            Box::new(MemoryIndex::new()),
            Box::new(MemoryIndex::new()),
        )
    }

    /// Returns the handle for `name`, opened according to `mode`.
    ///
    /// Same as [`EventStore::get_stream`] but returns the concrete handle.
    pub fn stream(&self, name: &str, mode: OpenMode) -> CoreResult<Option<Arc<LogStream>>> {
        if name.is_empty() || name.len() > MAX_KEY_LEN {
            return Err(CoreError::invalid_argument(format!(
                "stream name must be 1 to {MAX_KEY_LEN} bytes, got {}",
                name.len()
            )));
        }

        {
            let mut state = self.state.lock();
            state.ensure_open()?;
            let exists = state.index.stream_exists(name)?;
            match mode {
                OpenMode::Create if exists => {
                    return Err(CoreError::StreamAlreadyExists {
                        name: name.to_string(),
                    })
                }
                OpenMode::OpenExisting if !exists => {
                    return Err(CoreError::StreamDoesNotExist {
                        name: name.to_string(),
                    })
                }
                OpenMode::Open if !exists => return Ok(None),
                _ => {}
            }
            state
                .cursors
                .entry(name.to_string())
                .or_insert_with(|| StreamCursor::new(name));
        }

        let handle = self
            .handles
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(LogStream::new(
                    name,
                    Arc::clone(&self.state),
                    Arc::clone(&self.counters),
                ))
            })
            .clone();
        Ok(Some(handle))
    }

    /// Returns the names of all streams with at least one event.
    pub fn list_streams(&self) -> CoreResult<Vec<String>> {
        let state = self.state.lock();
        state.ensure_open()?;
        state.index.list_streams()
    }

    /// Reads up to `limit` log entries starting at `position`.
    pub fn read_entries(&self, position: u64, limit: usize) -> CoreResult<Vec<LogEntry>> {
        let state = self.state.lock();
        state.ensure_open()?;
        state
            .log
            .entries_from(position)
            .take(limit)
            .collect()
    }

    /// Returns the durable headers as last persisted.
    pub fn headers(&self) -> CoreResult<Headers> {
        let state = self.state.lock();
        state.ensure_open()?;
        state.index.read_headers()
    }

    /// Checks the whole log against the stream index.
    pub fn verify(&self) -> CoreResult<VerifyReport> {
        let state = self.state.lock();
        state.ensure_open()?;
        verify(&state.log, &state.index)
    }

    /// Returns store statistics.
    pub fn stats(&self) -> CoreResult<StoreStats> {
        let state = self.state.lock();
        state.ensure_open()?;
        let stats = StoreStats {
            log_size: state.log.len(),
            indexed_keys: state.index.len(),
            unpublished_events: state.outbox.len(),
            earliest_unpublished: state.outbox.earliest(),
            cached_streams: state.cursors.len(),
            ..StoreStats::default()
        };
        Ok(stats.with_counters(&self.counters))
    }

    /// Persists headers and flushes log and index without closing.
    pub fn flush(&self) -> CoreResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        let durable = state.config.sync_on_close;
        state.persist_headers(durable)
    }

    /// Closes the store.
    ///
    /// Records the append position and the earliest unpublished position,
    /// then flushes. Later calls on the store or its stream handles return
    /// [`CoreError::StoreClosed`]. Closing twice is a no-op.
    pub fn close(&self) -> CoreResult<()> {
        self.state.lock().close()?;
        self.handles.lock().clear();
        Ok(())
    }

    /// Checks if the store is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.state.lock().is_closed()
    }

    /// Returns the store directory, if file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(StoreDir::path)
    }
}

impl EventStore for LogStore {
    fn get_unpublished_events(&self) -> CoreResult<Vec<EventRecord>> {
        let state = self.state.lock();
        state.ensure_open()?;
        Ok(state.outbox.events())
    }

    fn get_stream(&self, name: &str, mode: OpenMode) -> CoreResult<Option<Arc<dyn EventStream>>> {
        Ok(self
            .stream(name, mode)?
            .map(|stream| stream as Arc<dyn EventStream>))
    }

    fn mark_as_published(&self, event: &mut EventRecord) -> CoreResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.ensure_open()?;

        let Some(position) = state.outbox.position_of(&event.stream, event.version) else {
            return Ok(());
        };
        state.log.mark_published(position)?;
        state.outbox.remove(&event.stream, event.version);
        if let Some(cursor) = state.cursors.get_mut(&event.stream) {
            cursor.mark_published(event.version);
        }
        event.published = true;
        self.counters.record_publish();
        Ok(())
    }

    fn get_since(&self, clock: Clock) -> CoreResult<EventsSince> {
        {
            let state = self.state.lock();
            state.ensure_open()?;
            let size = state.log.len();
            if clock.as_u64() > size || !is_aligned(clock.as_u64()) {
                return Err(CoreError::PositionOutOfRange {
                    position: clock.as_u64(),
                    size,
                });
            }
        }
        Ok(EventsSince::new(
            Arc::clone(&self.state),
            Arc::clone(&self.counters),
            clock,
        ))
    }
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore")
            .field("path", &self.path())
            .field("is_open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl Drop for LogStore {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close store on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{HeaderKey, StreamKey};
    use crate::types::{ExpectedVersion, NewEvent, RecordKind, SnapshotRecord};
    use streamdb_storage::InMemoryBackend;
    use tempfile::tempdir;

    fn create_store() -> LogStore {
        LogStore::open_in_memory().unwrap()
    }

    fn events(payloads: &[&str]) -> Vec<NewEvent> {
        payloads.iter().map(|p| NewEvent::new(p.as_bytes())).collect()
    }

    fn payloads(records: &[EventRecord]) -> Vec<String> {
        records
            .iter()
            .map(|r| String::from_utf8(r.data.clone()).unwrap())
            .collect()
    }

    #[test]
    fn open_in_memory() {
        let store = create_store();
        assert!(store.is_open());
        assert!(store.get_unpublished_events().unwrap().is_empty());
        assert_eq!(store.stats().unwrap().log_size, 0);
    }

    #[test]
    fn append_and_reopen_preserves_stream() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store");

        let saved = {
            let store = LogStore::open(&path).unwrap();
            let stream = store.get_stream("order", OpenMode::Create).unwrap().unwrap();
            let saved = stream
                .save_events(ExpectedVersion::Exactly(0), events(&["a", "b", "c"]))
                .unwrap();
            store.close().unwrap();
            saved
        };

        let store = LogStore::open(&path).unwrap();
        let stream = store
            .get_stream("order", OpenMode::OpenExisting)
            .unwrap()
            .unwrap();
        assert_eq!(stream.get_current_version().unwrap(), 3);
        assert_eq!(stream.get_events(0).unwrap(), saved);
        assert_eq!(payloads(&stream.get_events(2).unwrap()), vec!["b", "c"]);
    }

    #[test]
    fn unexpected_version_carries_both_versions() {
        let store = create_store();
        let stream = store.get_stream("s", OpenMode::Create).unwrap().unwrap();
        stream
            .save_events(ExpectedVersion::Any, events(&["1", "2"]))
            .unwrap();

        let err = stream
            .save_events(ExpectedVersion::Exactly(1), events(&["x"]))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnexpectedVersion {
                expected: 1,
                actual: 2
            }
        ));

        let saved = stream
            .save_events(ExpectedVersion::Any, events(&["3"]))
            .unwrap();
        assert_eq!(saved[0].version, 3);
    }

    #[test]
    fn older_snapshot_is_ignored() {
        let store = create_store();
        let stream = store.get_stream("s", OpenMode::Create).unwrap().unwrap();
        assert_eq!(stream.get_snapshot_version().unwrap(), 0);
        assert_eq!(stream.get_snapshot().unwrap(), None);

        assert!(stream
            .save_snapshot(SnapshotRecord::new("s", 5, b"five".to_vec()))
            .unwrap());
        assert!(!stream
            .save_snapshot(SnapshotRecord::new("s", 5, b"again".to_vec()))
            .unwrap());
        assert!(!stream
            .save_snapshot(SnapshotRecord::new("s", 3, b"three".to_vec()))
            .unwrap());

        let snapshot = stream.get_snapshot().unwrap().unwrap();
        assert_eq!(snapshot.version, 5);
        assert_eq!(snapshot.data, b"five");
        assert_eq!(store.stats().unwrap().snapshots_ignored, 2);
    }

    #[test]
    fn close_and_reopen_restores_snapshot_and_outbox() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store");

        {
            let store = LogStore::open(&path).unwrap();
            let a = store.get_stream("a", OpenMode::Create).unwrap().unwrap();
            let b = store.get_stream("b", OpenMode::Create).unwrap().unwrap();
            a.save_events(ExpectedVersion::Any, events(&["a1", "a2"]))
                .unwrap();
            b.save_events(ExpectedVersion::Any, events(&["b1"])).unwrap();
            a.save_snapshot(SnapshotRecord::new("a", 2, b"state".to_vec()))
                .unwrap();

            let mut first = store.get_unpublished_events().unwrap().remove(0);
            store.mark_as_published(&mut first).unwrap();
            assert!(first.published);
        }

        let store = LogStore::open(&path).unwrap();
        let pending = store.get_unpublished_events().unwrap();
        assert_eq!(payloads(&pending), vec!["a2", "b1"]);

        let a = store.get_stream("a", OpenMode::OpenExisting).unwrap().unwrap();
        assert_eq!(a.get_snapshot().unwrap().unwrap().data, b"state");
        let events = a.get_events(1).unwrap();
        assert!(events[0].published);
        assert!(!events[1].published);
    }

    #[test]
    fn mark_as_published_is_idempotent() {
        let store = create_store();
        let stream = store.get_stream("s", OpenMode::Create).unwrap().unwrap();
        let mut saved = stream
            .save_events(ExpectedVersion::Any, events(&["x"]))
            .unwrap()
            .remove(0);

        store.mark_as_published(&mut saved).unwrap();
        store.mark_as_published(&mut saved).unwrap();
        assert!(saved.published);
        assert!(store.get_unpublished_events().unwrap().is_empty());
        assert!(stream.get_events(1).unwrap()[0].published);
        assert_eq!(store.stats().unwrap().events_published, 1);

        let mut unknown = saved.clone();
        unknown.version = 40;
        unknown.published = false;
        store.mark_as_published(&mut unknown).unwrap();
        assert!(!unknown.published);
    }

    #[test]
    fn get_since_spans_streams_in_clock_order() {
        let store = create_store();
        let a = store.get_stream("a", OpenMode::Create).unwrap().unwrap();
        let b = store.get_stream("b", OpenMode::Create).unwrap().unwrap();

        a.save_events(ExpectedVersion::Any, events(&["e1"])).unwrap();
        let e2 = b.save_events(ExpectedVersion::Any, events(&["e2"])).unwrap();
        a.save_snapshot(SnapshotRecord::new("a", 1, vec![])).unwrap();
        a.save_events(ExpectedVersion::Any, events(&["e3"])).unwrap();

        let since: Vec<EventRecord> = store
            .get_since(e2[0].clock)
            .unwrap()
            .collect::<CoreResult<_>>()
            .unwrap();
        assert_eq!(payloads(&since), vec!["e2", "e3"]);
        assert!(since[0].clock < since[1].clock);

        let all = store.get_since(Clock::ZERO).unwrap().count();
        assert_eq!(all, 3);
    }

    #[test]
    fn get_since_rejects_bad_clock() {
        let store = create_store();
        let stream = store.get_stream("s", OpenMode::Create).unwrap().unwrap();
        stream
            .save_events(ExpectedVersion::Any, events(&["x"]))
            .unwrap();

        assert!(matches!(
            store.get_since(Clock::new(2)),
            Err(CoreError::PositionOutOfRange { position: 2, .. })
        ));
        assert!(matches!(
            store.get_since(Clock::new(1 << 20)),
            Err(CoreError::PositionOutOfRange { .. })
        ));
        let end = Clock::new(store.stats().unwrap().log_size);
        assert_eq!(store.get_since(end).unwrap().count(), 0);
    }

    #[test]
    fn get_since_sees_later_appends() {
        let store = create_store();
        let stream = store.get_stream("s", OpenMode::Create).unwrap().unwrap();
        stream
            .save_events(ExpectedVersion::Any, events(&["1"]))
            .unwrap();

        let mut since = store.get_since(Clock::ZERO).unwrap();
        assert!(since.next().is_some());
        stream
            .save_events(ExpectedVersion::Any, events(&["2"]))
            .unwrap();
        let second = since.next().unwrap().unwrap();
        assert_eq!(second.version, 2);
        assert!(since.next().is_none());
    }

    #[test]
    fn open_modes() {
        let store = create_store();
        assert!(store.get_stream("s", OpenMode::Open).unwrap().is_none());
        assert!(matches!(
            store.get_stream("s", OpenMode::OpenExisting),
            Err(CoreError::StreamDoesNotExist { .. })
        ));

        let created = store.stream("s", OpenMode::Create).unwrap().unwrap();
        let again = store.stream("s", OpenMode::Create).unwrap().unwrap();
        assert!(Arc::ptr_eq(&created, &again));

        created
            .save_snapshot(SnapshotRecord::new("s", 1, vec![]))
            .unwrap();
        assert!(store.get_stream("s", OpenMode::Create).is_ok());

        created
            .save_events(ExpectedVersion::Any, events(&["x"]))
            .unwrap();
        assert!(matches!(
            store.get_stream("s", OpenMode::Create),
            Err(CoreError::StreamAlreadyExists { .. })
        ));
        let opened = store.stream("s", OpenMode::Open).unwrap().unwrap();
        assert!(Arc::ptr_eq(&created, &opened));
        assert_eq!(opened.get_name(), "s");
    }

    #[test]
    fn invalid_stream_names_rejected() {
        let store = create_store();
        assert!(matches!(
            store.get_stream("", OpenMode::Open),
            Err(CoreError::InvalidArgument { .. })
        ));
        let long = "x".repeat(256);
        assert!(matches!(
            store.get_stream(&long, OpenMode::Open),
            Err(CoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn operations_after_close_fail() {
        let store = create_store();
        let stream = store.get_stream("s", OpenMode::Create).unwrap().unwrap();
        store.close().unwrap();
        store.close().unwrap();

        assert!(!store.is_open());
        assert!(matches!(
            store.get_unpublished_events(),
            Err(CoreError::StoreClosed)
        ));
        assert!(matches!(
            stream.get_current_version(),
            Err(CoreError::StoreClosed)
        ));
        assert!(matches!(
            store.get_since(Clock::ZERO),
            Err(CoreError::StoreClosed)
        ));
    }

    #[test]
    fn lost_index_tail_is_rebuilt() {
        let first = LogEntry::new(RecordKind::Event, "s", 1, b"1".to_vec());
        let second = LogEntry::new(RecordKind::Event, "s", 2, b"2".to_vec());
        let mut bytes = first.encode(0).unwrap();
        let second_at = bytes.len() as u64;
        bytes.extend(second.encode(second_at).unwrap());

        // Index and headers were persisted after the first append only.
        let mut streams = MemoryIndex::new();
        streams
            .insert(&StreamKey::encode("s", RecordKind::Event, 1).unwrap(), 0)
            .unwrap();
        let mut headers = MemoryIndex::new();
        headers
            .insert(&HeaderKey::AppendPosition.to_bytes(), second_at)
            .unwrap();
        headers
            .insert(&HeaderKey::UnpublishedCheckpoint.to_bytes(), 0)
            .unwrap();

        let store = LogStore::with_parts(
            Config::default(),
            Box::new(InMemoryBackend::with_data(bytes)),
            Box::new(streams),
            Box::new(headers),
        )
        .unwrap();

        let stream = store.get_stream("s", OpenMode::OpenExisting).unwrap().unwrap();
        assert_eq!(stream.get_current_version().unwrap(), 2);
        assert_eq!(payloads(&stream.get_events(1).unwrap()), vec!["1", "2"]);
        assert_eq!(store.get_unpublished_events().unwrap().len(), 2);
        assert!(store.verify().unwrap().is_ok());
    }

    #[test]
    fn corrupt_terminator_fails_reads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store");
        {
            let store = LogStore::open(&path).unwrap();
            let stream = store.get_stream("s", OpenMode::Create).unwrap().unwrap();
            stream
                .save_events(ExpectedVersion::Any, events(&["abc"]))
                .unwrap();
            let mut event = store.get_unpublished_events().unwrap().remove(0);
            store.mark_as_published(&mut event).unwrap();
        }

        let log_path = path.join("events.log");
        let mut bytes = std::fs::read(&log_path).unwrap();
        let terminator_at = crate::log::HEADER_SIZE + 1 + 3;
        assert_eq!(bytes[terminator_at], crate::log::TERMINATOR);
        bytes[terminator_at] = 0;
        std::fs::write(&log_path, bytes).unwrap();

        let store = LogStore::open(&path).unwrap();
        let stream = store.get_stream("s", OpenMode::OpenExisting).unwrap().unwrap();
        let err = stream.get_events(1).unwrap_err();
        assert!(matches!(err, CoreError::CorruptEntry { position: 0, .. }));
        assert!(!store.verify().unwrap().is_ok());
    }

    #[test]
    fn second_open_is_locked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store");
        let _store = LogStore::open(&path).unwrap();
        assert!(matches!(
            LogStore::open(&path),
            Err(CoreError::DatabaseLocked)
        ));
    }

    #[test]
    fn error_if_exists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store");
        LogStore::open(&path).unwrap().close().unwrap();

        let result = LogStore::open_with_config(&path, Config::default().error_if_exists(true));
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn flush_persists_headers() {
        let store = create_store();
        let stream = store.get_stream("s", OpenMode::Create).unwrap().unwrap();
        let saved = stream
            .save_events(ExpectedVersion::Any, events(&["x", "y"]))
            .unwrap();
        store.flush().unwrap();

        let headers = store.headers().unwrap();
        assert_eq!(headers.append_position, store.stats().unwrap().log_size);
        assert_eq!(headers.unpublished_checkpoint, saved[0].clock.as_u64());
    }

    #[test]
    fn read_entries_pages_through_log() {
        let store = create_store();
        let stream = store.get_stream("s", OpenMode::Create).unwrap().unwrap();
        stream
            .save_events(ExpectedVersion::Any, events(&["1", "2", "3"]))
            .unwrap();

        let page = store.read_entries(0, 2).unwrap();
        assert_eq!(page.len(), 2);
        let rest = store.read_entries(page[1].next_position(), 10).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].version, 3);
        assert_eq!(store.list_streams().unwrap(), vec!["s".to_string()]);
    }

    #[test]
    fn concurrent_appends_stay_contiguous() {
        use std::thread;

        let store = create_store();
        let stream = store.stream("shared", OpenMode::Create).unwrap().unwrap();
        let mut handles = vec![];
        for t in 0..4 {
            let stream = Arc::clone(&stream);
            handles.push(thread::spawn(move || {
                for i in 0..25 {
                    let payload = format!("{t}-{i}");
                    stream
                        .save_events(ExpectedVersion::Any, events(&[payload.as_str()]))
                        .unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let all = stream.get_events(1).unwrap();
        assert_eq!(all.len(), 100);
        for (i, event) in all.iter().enumerate() {
            assert_eq!(event.version, i as i32 + 1);
        }
        assert_eq!(store.get_unpublished_events().unwrap().len(), 100);
        assert!(store.verify().unwrap().is_ok());
    }
}
