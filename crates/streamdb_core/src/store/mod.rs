//! Event store orchestration.
//!
//! [`LogStore`] ties the binary log and the stream index together. It
//! recovers the outbox on open, hands out [`LogStream`] handles, and
//! serializes every mutation through one lock.
//!
//! # Contracts
//!
//! [`EventStore`] and [`EventStream`] are the seams consumers program
//! against (aggregate repositories and catch-up subscribers). `LogStore`
//! is the file-backed implementation.
//!
//! # Durability
//!
//! Appends reach the log before the index. Two headers in a separate
//! index record the durable append position and the earliest unpublished
//! position; recovery walks the log from the earlier of the two,
//! rebuilding the outbox and re-indexing entries past the append position.

mod cursor;
mod log_store;
mod outbox;
mod since;
mod state;
mod stream;
mod verify;

pub use log_store::LogStore;
pub use since::EventsSince;
pub use stream::LogStream;
pub use verify::VerifyReport;

use crate::error::CoreResult;
use crate::types::{
    Clock, EventRecord, ExpectedVersion, NewEvent, OpenMode, SnapshotRecord,
};
use std::sync::Arc;

/// A store of event streams with an outbox of unpublished events.
pub trait EventStore: Send + Sync {
    /// Returns a copy of the outbox, ordered by clock.
    fn get_unpublished_events(&self) -> CoreResult<Vec<EventRecord>>;

    /// Opens a stream according to `mode`.
    ///
    /// Returns `Ok(None)` only for [`OpenMode::Open`] on a stream without
    /// events.
    ///
    /// # Errors
    ///
    /// - [`crate::CoreError::StreamAlreadyExists`] for `Create` on a stream
    ///   with events
    /// - [`crate::CoreError::StreamDoesNotExist`] for `OpenExisting` on a
    ///   stream without events
    fn get_stream(&self, name: &str, mode: OpenMode) -> CoreResult<Option<Arc<dyn EventStream>>>;

    /// Acknowledges delivery of an event.
    ///
    /// Sets `event.published` and removes the event from the outbox. Events
    /// that are not in the outbox are left untouched.
    fn mark_as_published(&self, event: &mut EventRecord) -> CoreResult<()>;

    /// Returns the events of all streams from `clock` on, in clock order.
    fn get_since(&self, clock: Clock) -> CoreResult<EventsSince>;
}

/// One stream of versioned events and snapshots.
pub trait EventStream: Send + Sync {
    /// Returns the highest event version, or 0 for an empty stream.
    fn get_current_version(&self) -> CoreResult<i32>;

    /// Returns the stream name.
    fn get_name(&self) -> &str;

    /// Returns the latest snapshot.
    fn get_snapshot(&self) -> CoreResult<Option<SnapshotRecord>>;

    /// Returns the version of the latest snapshot, or 0 if there is none.
    fn get_snapshot_version(&self) -> CoreResult<i32>;

    /// Returns events with version `>= min_version`, in version order.
    fn get_events(&self, min_version: i32) -> CoreResult<Vec<EventRecord>>;

    /// Appends events at the next versions.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::UnexpectedVersion`] if
    /// `expected_version` is `Exactly(v)` and the stream is not at `v`.
    fn save_events(
        &self,
        expected_version: ExpectedVersion,
        events: Vec<NewEvent>,
    ) -> CoreResult<Vec<EventRecord>>;

    /// Stores a snapshot. Returns `false` if a snapshot at the same or a
    /// later version already exists.
    fn save_snapshot(&self, snapshot: SnapshotRecord) -> CoreResult<bool>;
}
