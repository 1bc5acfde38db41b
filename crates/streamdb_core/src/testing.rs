//! Test helpers shared across modules.

use parking_lot::Mutex;
use std::sync::Arc;
use streamdb_storage::{InMemoryBackend, StorageBackend, StorageResult};

/// Shared, ordered record of mutating backend calls such as `"log:sync"`.
pub(crate) type OpLog = Arc<Mutex<Vec<String>>>;

/// In-memory backend that records every mutating call under a label.
pub(crate) struct RecordingBackend {
    label: &'static str,
    inner: InMemoryBackend,
    ops: OpLog,
}

impl RecordingBackend {
    pub(crate) fn new(label: &'static str, ops: &OpLog) -> Self {
        Self {
            label,
            inner: InMemoryBackend::new(),
            ops: Arc::clone(ops),
        }
    }

    fn record(&self, op: &str) {
        self.ops.lock().push(format!("{}:{op}", self.label));
    }
}

impl StorageBackend for RecordingBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        self.record("append");
        self.inner.append(data)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        self.record("write_at");
        self.inner.write_at(offset, data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.record("flush");
        self.inner.flush()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.record("sync");
        self.inner.sync()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.record("truncate");
        self.inner.truncate(new_size)
    }
}

/// Index of the first recorded `op`, if any.
pub(crate) fn first(ops: &[String], op: &str) -> Option<usize> {
    ops.iter().position(|o| o == op)
}

/// Index of the last recorded `op`, if any.
pub(crate) fn last(ops: &[String], op: &str) -> Option<usize> {
    ops.iter().rposition(|o| o == op)
}
