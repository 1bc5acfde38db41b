//! Append-only binary log of events and snapshots.
//!
//! The log is the source of truth for a store. Every entry is
//! self-describing, so the log can be walked from any entry boundary
//! without consulting the index.
//!
//! ## Entry Format
//!
//! ```text
//! | flags (1) | key len (1) | data len (2) | version (4) | clock (8) | key | data | 0xE7 | filler (0-3) |
//! ```
//!
//! ## Corruption Policy
//!
//! - **Bad terminator or filler**: `Err(CorruptEntry)`, never tolerated
//! - **Unknown record kind**: `Err(CorruptEntry)`
//! - **Entry cut short at the tail**: reported by `read_entry` as
//!   `CorruptEntry`; recovery truncates it as a torn write
//!
//! ## Invariants
//!
//! - Positions strictly increase and are 4-byte aligned
//! - The clock of an entry equals its position
//! - Written bytes are never modified, except the published bit (0 to 1 only)

mod binary_log;
mod entry;
mod iterator;

pub(crate) use binary_log::ReadOutcome;
pub use binary_log::BinaryLog;
pub use entry::{
    align, encoded_len, is_aligned, EntryHeader, LogEntry, ALIGNMENT, FILLER, HEADER_SIZE,
    MAX_DATA_LEN, MAX_KEY_LEN, PUBLISHED_FLAG, TERMINATOR,
};
pub use iterator::LogIterator;
