//! # StreamDB Core
//!
//! Embedded event-sourcing storage engine.
//!
//! This crate provides:
//! - An append-only binary log of events and snapshots
//! - A composite-key stream index over an ordered byte index
//! - Crash recovery of the index tail and of the outbox
//! - Stream handles with optimistic-concurrency appends
//! - Catch-up reads across all streams in global clock order
//!
//! ## Key Invariants
//!
//! - Log positions strictly increase and are 4-byte aligned
//! - The clock of an event is its log position
//! - Event versions of a stream are contiguous from 1
//! - The outbox only shrinks through `mark_as_published`
//! - Every index entry points at an existing log entry
//!
//! ## Example
//!
//! ```rust
//! use streamdb_core::{EventStore, EventStream, ExpectedVersion, LogStore, NewEvent, OpenMode};
//!
//! let store = LogStore::open_in_memory().unwrap();
//! let stream = store.get_stream("order-17", OpenMode::Create).unwrap().unwrap();
//! stream
//!     .save_events(ExpectedVersion::Exactly(0), vec![NewEvent::new(b"placed".to_vec())])
//!     .unwrap();
//! assert_eq!(stream.get_current_version().unwrap(), 1);
//! assert_eq!(store.get_unpublished_events().unwrap().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dir;
mod error;
pub mod index;
pub mod log;
mod stats;
mod store;
#[cfg(test)]
mod testing;
mod types;

pub use config::Config;
pub use dir::StoreDir;
pub use error::{CoreError, CoreResult};
pub use stats::{StoreCounters, StoreStats};
pub use store::{EventStore, EventStream, EventsSince, LogStore, LogStream, VerifyReport};
pub use types::{
    Clock, EventRecord, ExpectedVersion, NewEvent, OpenMode, RecordKind, SnapshotRecord,
};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
