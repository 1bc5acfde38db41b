//! Heap-backed byte store.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};

/// Byte store held in a `Vec<u8>`.
///
/// Backs in-memory stores and recovery tests, which seed it with crafted
/// log or journal bytes through [`InMemoryBackend::with_data`].
///
/// ```rust
/// use streamdb_storage::{InMemoryBackend, StorageBackend};
///
/// let mut log = InMemoryBackend::new();
/// let at = log.append(&[0x01, 0x00, 0x00, 0xE7]).unwrap();
/// log.write_at(at, &[0x81]).unwrap();
/// assert_eq!(log.read_at(at, 1).unwrap(), vec![0x81]);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    bytes: Vec<u8>,
}

impl InMemoryBackend {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `bytes`, as if they had been appended.
    #[must_use]
    pub fn with_data(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let end = offset.saturating_add(len as u64);
        if end > self.len() {
            return Err(StorageError::ReadPastEnd {
                offset,
                len,
                size: self.len(),
            });
        }
        Ok(self.bytes[offset as usize..end as usize].to_vec())
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let offset = self.len();
        self.bytes.extend_from_slice(data);
        Ok(offset)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        let end = offset.saturating_add(data.len() as u64);
        if end > self.len() {
            return Err(StorageError::WritePastEnd {
                offset,
                len: data.len(),
                size: self.len(),
            });
        }
        self.bytes[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.len())
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        if new_size > self.len() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot grow a {} byte store to {new_size} by truncation", self.len()),
            )));
        }
        self.bytes.truncate(new_size as usize);
        Ok(())
    }
}
