//! Error types for StreamDB core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in StreamDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] streamdb_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A stream was opened with `Create` but already holds events.
    #[error("stream already exists: {name}")]
    StreamAlreadyExists {
        /// Name of the stream.
        name: String,
    },

    /// A stream was opened with `OpenExisting` but holds no events.
    #[error("stream does not exist: {name}")]
    StreamDoesNotExist {
        /// Name of the stream.
        name: String,
    },

    /// Optimistic concurrency check failed.
    #[error("unexpected stream version: expected {expected}, actual {actual}")]
    UnexpectedVersion {
        /// Version the caller expected.
        expected: i32,
        /// Version actually stored.
        actual: i32,
    },

    /// A log entry failed validation while being read.
    ///
    /// This indicates on-disk corruption and must not be retried.
    #[error("corrupt log entry at position {position}: {message}")]
    CorruptEntry {
        /// Log position of the entry.
        position: u64,
        /// Description of the corruption.
        message: String,
    },

    /// The index journal failed validation.
    #[error("index corruption: {message}")]
    IndexCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// A log position does not point at an entry boundary.
    #[error("position {position} is out of range (log size {size})")]
    PositionOutOfRange {
        /// Requested position.
        position: u64,
        /// Current log size.
        size: u64,
    },

    /// Index insert on a key that is already present.
    #[error("duplicate index key")]
    DuplicateKey,

    /// Index update on a key that is not present.
    #[error("missing index key")]
    MissingKey,

    /// An argument was rejected before anything was written.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// Invalid store format or inconsistent durable headers.
    #[error("invalid store format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Store directory is already open in another process.
    #[error("store locked: another process has exclusive access")]
    DatabaseLocked,

    /// Store has been closed.
    #[error("store is closed")]
    StoreClosed,
}

impl CoreError {
    /// Creates a corrupt entry error.
    pub fn corrupt_entry(position: u64, message: impl Into<String>) -> Self {
        Self::CorruptEntry {
            position,
            message: message.into(),
        }
    }

    /// Creates an index corruption error.
    pub fn index_corruption(message: impl Into<String>) -> Self {
        Self::IndexCorruption {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Returns true for errors that indicate on-disk corruption.
    ///
    /// Callers should stop using the store after a fatal error.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CorruptEntry { .. } | Self::IndexCorruption { .. }
        )
    }
}
