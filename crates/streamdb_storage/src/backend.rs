//! The byte-store trait under the event log and index journals.

use crate::error::StorageResult;

/// Positional byte store.
///
/// The event log and both index journals sit on one of these each. The
/// store never interprets what it holds.
///
/// Writers only ever touch bytes in three ways:
/// - `append` at the end (new log entries, journal records)
/// - `write_at` over bytes already appended (the published flag)
/// - `truncate` back to a shorter length (a torn tail found on open)
///
/// `flush` hands bytes to the OS; `sync` makes them durable. Callers order
/// their `sync` calls themselves when one file describes another.
pub trait StorageBackend: Send + Sync {
    /// Reads exactly `len` bytes at `offset`.
    ///
    /// # Errors
    ///
    /// [`crate::StorageError::ReadPastEnd`] if the range runs past
    /// [`StorageBackend::size`], or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends `data` and returns the offset it starts at.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the write fails.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Overwrites bytes that were already appended. Never grows the store.
    ///
    /// # Errors
    ///
    /// [`crate::StorageError::WritePastEnd`] if the range runs past
    /// [`StorageBackend::size`], or an I/O error.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()>;

    /// Hands buffered writes to the OS.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the flush fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Number of bytes held, which is also the offset of the next append.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the size cannot be read.
    fn size(&self) -> StorageResult<u64>;

    /// Makes every write so far durable.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Cuts the store back to `new_size` bytes, durably.
    ///
    /// # Errors
    ///
    /// Fails if `new_size` is larger than the current size, or on I/O error.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}
