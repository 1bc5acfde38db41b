//! Store directory management.
//!
//! This module handles the file system layout for StreamDB:
//!
//! ```text
//! <store_path>/
//! ├─ LOCK              # Advisory lock for single-process access
//! ├─ events.log        # Append-only binary log of events and snapshots
//! ├─ streams.idx       # Composite-key stream index journal
//! └─ headers.idx       # Append-position / unpublished-checkpoint journal
//! ```
//!
//! The LOCK file ensures only one process can open the store at a time.

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const LOG_FILE: &str = "events.log";
const STREAM_INDEX_FILE: &str = "streams.idx";
const HEADER_INDEX_FILE: &str = "headers.idx";

/// Manages the store directory structure and file locking.
///
/// The `StoreDir` holds an exclusive lock on the directory for as long as
/// it lives. The lock is released when the lock file handle is dropped.
#[derive(Debug)]
pub struct StoreDir {
    path: PathBuf,
    _lock_file: File,
}

impl StoreDir {
    /// Opens or creates a store directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - Another process holds the lock (returns `DatabaseLocked`)
    /// - I/O errors occur
    pub fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::invalid_format(format!(
                    "store directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(CoreError::invalid_format(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_path = path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::DatabaseLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the path to the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path to the binary log.
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.path.join(LOG_FILE)
    }

    /// Returns the path to the stream index journal.
    #[must_use]
    pub fn stream_index_path(&self) -> PathBuf {
        self.path.join(STREAM_INDEX_FILE)
    }

    /// Returns the path to the header index journal.
    #[must_use]
    pub fn header_index_path(&self) -> PathBuf {
        self.path.join(HEADER_INDEX_FILE)
    }

    /// Checks if this is a new (empty) store directory.
    #[must_use]
    pub fn is_new_store(&self) -> bool {
        !self.log_path().exists() && !self.header_index_path().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let store_path = temp.path().join("new_store");

        let dir = StoreDir::open(&store_path, true).unwrap();
        assert!(store_path.is_dir());
        assert!(dir.is_new_store());
    }

    #[test]
    fn open_fails_if_not_exists_and_no_create() {
        let temp = tempdir().unwrap();
        let result = StoreDir::open(&temp.path().join("missing"), false);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn lock_prevents_second_open() {
        let temp = tempdir().unwrap();
        let store_path = temp.path().join("locked");

        let _dir1 = StoreDir::open(&store_path, true).unwrap();
        let result = StoreDir::open(&store_path, true);
        assert!(matches!(result, Err(CoreError::DatabaseLocked)));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        let store_path = temp.path().join("reopen");

        {
            let _dir = StoreDir::open(&store_path, true).unwrap();
        }

        let _dir2 = StoreDir::open(&store_path, true).unwrap();
    }

    #[test]
    fn paths_are_correct() {
        let temp = tempdir().unwrap();
        let store_path = temp.path().join("paths");

        let dir = StoreDir::open(&store_path, true).unwrap();
        assert_eq!(dir.path(), store_path);
        assert_eq!(dir.log_path(), store_path.join("events.log"));
        assert_eq!(dir.stream_index_path(), store_path.join("streams.idx"));
        assert_eq!(dir.header_index_path(), store_path.join("headers.idx"));
    }
}
