//! Ordered index trait.

use crate::error::CoreResult;

/// An ordered map from byte keys to log positions.
///
/// Keys compare byte-lexicographically. The store uses two instances: one
/// for composite stream keys and one for the two durable headers.
///
/// # Implementors
///
/// - [`super::MemoryIndex`] - For testing and in-memory stores
/// - [`super::FileIndex`] - Journaled to a storage backend
pub trait OrderedIndex: Send {
    /// Inserts a new key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::DuplicateKey`] if the key is present.
    fn insert(&mut self, key: &[u8], value: u64) -> CoreResult<()>;

    /// Replaces the value of an existing key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::MissingKey`] if the key is absent.
    fn update(&mut self, key: &[u8], value: u64) -> CoreResult<()>;

    /// Returns all entries with `min <= key <= max`, in key order.
    ///
    /// An inverted range yields no entries.
    fn select(&self, min: &[u8], max: &[u8]) -> CoreResult<Vec<(Vec<u8>, u64)>>;

    /// Returns every entry in key order.
    fn scan(&self) -> CoreResult<Vec<(Vec<u8>, u64)>>;

    /// Returns the number of keys.
    fn len(&self) -> usize;

    /// Returns true if the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a single key.
    fn get(&self, key: &[u8]) -> CoreResult<Option<u64>> {
        Ok(self.select(key, key)?.into_iter().next().map(|(_, v)| v))
    }

    /// Flushes pending writes.
    fn flush(&mut self) -> CoreResult<()>;

    /// Flushes and fsyncs pending writes.
    fn sync(&mut self) -> CoreResult<()> {
        self.flush()
    }
}
