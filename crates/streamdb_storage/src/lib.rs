//! # StreamDB Storage
//!
//! Byte stores under the StreamDB event log and index journals.
//!
//! A store directory holds three of them: `events.log`, `streams.idx` and
//! `headers.idx`. Each is a [`StorageBackend`]; StreamDB owns the formats.
//!
//! - [`FileBackend`] keeps the bytes in an OS file
//! - [`InMemoryBackend`] keeps them in a `Vec<u8>`, for in-memory stores and tests
//!
//! ```rust
//! use streamdb_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut journal = InMemoryBackend::new();
//! let first = journal.append(b"record-1").unwrap();
//! let second = journal.append(b"record-2").unwrap();
//! assert_eq!((first, second), (0, 8));
//! assert_eq!(journal.read_at(second, 8).unwrap(), b"record-2");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
