//! Stream handles handed out by [`LogStore`](super::LogStore).

use crate::error::CoreResult;
use crate::stats::StoreCounters;
use crate::store::state::StoreState;
use crate::store::EventStream;
use crate::types::{EventRecord, ExpectedVersion, NewEvent, SnapshotRecord};
use parking_lot::Mutex;
use std::sync::Arc;

/// A handle to one stream of a [`LogStore`](super::LogStore).
///
/// Handles share the store state; every call takes the store lock. The
/// store caches one handle per stream name, so repeated
/// `get_stream` calls return the same handle.
pub struct LogStream {
    name: String,
    state: Arc<Mutex<StoreState>>,
    counters: Arc<StoreCounters>,
}

impl LogStream {
    pub(crate) fn new(
        name: impl Into<String>,
        state: Arc<Mutex<StoreState>>,
        counters: Arc<StoreCounters>,
    ) -> Self {
        Self {
            name: name.into(),
            state,
            counters,
        }
    }
}

impl EventStream for LogStream {
    fn get_current_version(&self) -> CoreResult<i32> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        let parts = state.stream_parts(&self.name);
        parts.cursor.current_version(parts.index)
    }

    fn get_name(&self) -> &str {
        &self.name
    }

    fn get_snapshot(&self) -> CoreResult<Option<SnapshotRecord>> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        let parts = state.stream_parts(&self.name);
        parts.cursor.snapshot(parts.index, parts.log, &self.counters)
    }

    fn get_snapshot_version(&self) -> CoreResult<i32> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        let parts = state.stream_parts(&self.name);
        parts.cursor.snapshot_version(parts.index)
    }

    fn get_events(&self, min_version: i32) -> CoreResult<Vec<EventRecord>> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        let parts = state.stream_parts(&self.name);
        parts
            .cursor
            .events(parts.index, parts.log, &self.counters, min_version)
    }

    fn save_events(
        &self,
        expected_version: ExpectedVersion,
        events: Vec<NewEvent>,
    ) -> CoreResult<Vec<EventRecord>> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        let parts = state.stream_parts(&self.name);
        parts.cursor.save_events(
            parts.log,
            parts.index,
            parts.outbox,
            &self.counters,
            expected_version,
            events,
        )
    }

    fn save_snapshot(&self, snapshot: SnapshotRecord) -> CoreResult<bool> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        let parts = state.stream_parts(&self.name);
        parts
            .cursor
            .save_snapshot(parts.log, parts.index, &self.counters, snapshot)
    }
}

impl std::fmt::Debug for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStream")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
