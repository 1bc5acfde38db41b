//! Store statistics.
//!
//! Counters are atomic and shared between a store and its stream handles,
//! so they can be read while operations are in progress.
//!
//! ```rust,ignore
//! use streamdb_core::LogStore;
//!
//! let store = LogStore::open_in_memory()?;
//! // ... append events ...
//! let stats = store.stats()?;
//! println!("appended: {}", stats.events_appended);
//! println!("unpublished: {}", stats.unpublished_events);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters for one open store.
#[derive(Debug, Default)]
pub struct StoreCounters {
    events_appended: AtomicU64,
    snapshots_saved: AtomicU64,
    snapshots_ignored: AtomicU64,
    events_published: AtomicU64,
    entries_read: AtomicU64,
    bytes_appended: AtomicU64,
}

impl StoreCounters {
    /// Creates a new counter set.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_event(&self, bytes: u64) {
        self.events_appended.fetch_add(1, Ordering::Relaxed);
        self.bytes_appended.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_snapshot(&self, bytes: u64) {
        self.snapshots_saved.fetch_add(1, Ordering::Relaxed);
        self.bytes_appended.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_ignored_snapshot(&self) {
        self.snapshots_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_publish(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_read(&self) {
        self.entries_read.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of events appended since open.
    pub fn events_appended(&self) -> u64 {
        self.events_appended.load(Ordering::Relaxed)
    }

    /// Returns the number of snapshots written since open.
    pub fn snapshots_saved(&self) -> u64 {
        self.snapshots_saved.load(Ordering::Relaxed)
    }

    /// Returns the number of snapshots ignored as stale.
    pub fn snapshots_ignored(&self) -> u64 {
        self.snapshots_ignored.load(Ordering::Relaxed)
    }

    /// Returns the number of publish acknowledgements that flipped a bit.
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    /// Returns the number of entries read from the log.
    pub fn entries_read(&self) -> u64 {
        self.entries_read.load(Ordering::Relaxed)
    }

    /// Returns the number of log bytes appended since open.
    pub fn bytes_appended(&self) -> u64 {
        self.bytes_appended.load(Ordering::Relaxed)
    }
}

/// A point-in-time view of a store.
///
/// Gauges are read under the store lock; counters are cumulative since the
/// store was opened.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Log length in bytes, which is also the next append position.
    pub log_size: u64,
    /// Number of keys in the stream index.
    pub indexed_keys: usize,
    /// Number of events in the outbox.
    pub unpublished_events: usize,
    /// Position of the earliest unpublished event.
    pub earliest_unpublished: Option<u64>,
    /// Number of stream cursors cached by the store.
    pub cached_streams: usize,
    /// Events appended since open.
    pub events_appended: u64,
    /// Snapshots written since open.
    pub snapshots_saved: u64,
    /// Snapshots ignored as stale since open.
    pub snapshots_ignored: u64,
    /// Events acknowledged as published since open.
    pub events_published: u64,
    /// Entries read from the log since open.
    pub entries_read: u64,
    /// Log bytes appended since open.
    pub bytes_appended: u64,
}

impl StoreStats {
    pub(crate) fn with_counters(mut self, counters: &StoreCounters) -> Self {
        self.events_appended = counters.events_appended();
        self.snapshots_saved = counters.snapshots_saved();
        self.snapshots_ignored = counters.snapshots_ignored();
        self.events_published = counters.events_published();
        self.entries_read = counters.entries_read();
        self.bytes_appended = counters.bytes_appended();
        self
    }
}
