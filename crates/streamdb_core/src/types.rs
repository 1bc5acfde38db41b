//! Core type definitions for StreamDB.

use std::fmt;

/// Global ordering value for log entries.
///
/// The clock of an entry is its byte position in the log, so clocks are
/// strictly increasing across all streams of one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Clock(pub u64);

impl Clock {
    /// The clock of the first entry in a store.
    pub const ZERO: Self = Self(0);

    /// Creates a clock from a raw log position.
    #[must_use]
    pub const fn new(position: u64) -> Self {
        Self(position)
    }

    /// Returns the raw value, which is also the log position.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clock:{}", self.0)
    }
}

/// Kind of record stored in the log.
///
/// The discriminant is written both into the low bits of the entry flags
/// and into the composite index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum RecordKind {
    /// Point-in-time snapshot of a stream.
    Snapshot = 0,
    /// Domain event.
    Event = 1,
}

impl RecordKind {
    /// Converts a byte to a record kind.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Snapshot),
            1 => Some(Self::Event),
            _ => None,
        }
    }

    /// Converts the record kind to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Optimistic concurrency expectation for [`crate::EventStream::save_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Append regardless of the current stream version.
    Any,
    /// Append only if the stream is currently at this version.
    Exactly(i32),
}

/// How [`crate::EventStore::get_stream`] treats existing and missing streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Fail if the stream already holds events.
    Create,
    /// Fail if the stream holds no events.
    OpenExisting,
    /// Return `None` if the stream holds no events.
    Open,
}

/// A stored event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Stream the event belongs to.
    pub stream: String,
    /// Version within the stream, starting at 1.
    pub version: i32,
    /// Whether the event has been delivered downstream.
    pub published: bool,
    /// Global clock assigned on append.
    pub clock: Clock,
    /// Opaque event payload.
    pub data: Vec<u8>,
}

/// A stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    /// Stream the snapshot belongs to.
    pub stream: String,
    /// Stream version the snapshot was taken at.
    pub version: i32,
    /// Opaque snapshot payload.
    pub data: Vec<u8>,
}

impl SnapshotRecord {
    /// Creates a new snapshot record.
    pub fn new(stream: impl Into<String>, version: i32, data: Vec<u8>) -> Self {
        Self {
            stream: stream.into(),
            version,
            data,
        }
    }
}

/// An event to be appended to a stream.
///
/// Version and clock are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    /// Opaque event payload.
    pub data: Vec<u8>,
    /// Events saved as published never enter the outbox.
    pub published: bool,
}

impl NewEvent {
    /// Creates an unpublished event.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            published: false,
        }
    }

    /// Marks the event as already delivered.
    #[must_use]
    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }
}
