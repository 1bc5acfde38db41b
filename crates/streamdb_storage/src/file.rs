//! File storage for the event log and index journals.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Byte store over one OS file.
///
/// The store keeps the logical length itself, so reads past what has been
/// appended fail fast without a `metadata` call. `read_at` takes `&self`:
/// the file handle sits behind a mutex because every positional access
/// seeks first.
///
/// `flush` hands buffered bytes to the OS. Only `sync` (and `truncate`)
/// reach the disk.
#[derive(Debug)]
pub struct FileBackend {
    file: Mutex<File>,
    len: u64,
}

impl FileBackend {
    /// Opens `path` for reading and writing, creating an empty file if
    /// needed. Existing bytes are kept.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file cannot be opened.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            file: Mutex::new(file),
            len,
        })
    }

    /// Like [`FileBackend::open`], creating missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if a directory or the file cannot be
    /// created.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    fn seek_to(file: &mut File, offset: u64) -> StorageResult<()> {
        file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        if offset.saturating_add(len as u64) > self.len {
            return Err(StorageError::ReadPastEnd {
                offset,
                len,
                size: self.len,
            });
        }

        let mut buffer = vec![0u8; len];
        if len > 0 {
            let mut file = self.file.lock();
            Self::seek_to(&mut file, offset)?;
            file.read_exact(&mut buffer)?;
        }
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let offset = self.len;
        if !data.is_empty() {
            let file = self.file.get_mut();
            Self::seek_to(file, offset)?;
            file.write_all(data)?;
            self.len += data.len() as u64;
        }
        Ok(offset)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        if offset.saturating_add(data.len() as u64) > self.len {
            return Err(StorageError::WritePastEnd {
                offset,
                len: data.len(),
                size: self.len,
            });
        }

        if !data.is_empty() {
            let file = self.file.get_mut();
            Self::seek_to(file, offset)?;
            file.write_all(data)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.get_mut().flush()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.len)
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file.get_mut().sync_data()?;
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        if new_size > self.len {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot grow a {} byte file to {new_size} by truncation", self.len),
            )));
        }

        let file = self.file.get_mut();
        file.set_len(new_size)?;
        file.sync_all()?;
        self.len = new_size;
        Ok(())
    }
}
