//! Ordered indexes and the composite stream index.
//!
//! The log is the source of truth; the index maps
//! `(stream, kind, version)` to the log position of an entry so a stream
//! can be read without walking the log.
//!
//! # Components
//!
//! - [`OrderedIndex`]: byte-keyed ordered map (insert, update, range select)
//! - [`MemoryIndex`]: `BTreeMap` implementation
//! - [`FileIndex`]: `MemoryIndex` made durable by a checksummed journal
//! - [`StreamKey`] / [`HeaderKey`]: key encodings
//! - [`StreamIndex`]: stream lookups and header persistence on top of two
//!   ordered indexes

mod file;
mod key;
mod memory;
mod stream_index;
mod traits;

pub use file::FileIndex;
pub use key::{HeaderKey, StreamKey};
pub use memory::MemoryIndex;
pub use stream_index::{Headers, StreamIndex};
pub use traits::OrderedIndex;
