//! BTreeMap-backed ordered index.

use crate::error::{CoreError, CoreResult};
use crate::index::traits::OrderedIndex;
use std::collections::BTreeMap;
use std::ops::Bound;

/// In-memory ordered index.
///
/// Used directly by in-memory stores and as the lookup structure behind
/// [`super::FileIndex`].
#[derive(Debug, Default, Clone)]
pub struct MemoryIndex {
    entries: BTreeMap<Vec<u8>, u64>,
}

impl MemoryIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }
}

impl OrderedIndex for MemoryIndex {
    fn insert(&mut self, key: &[u8], value: u64) -> CoreResult<()> {
        if self.entries.contains_key(key) {
            return Err(CoreError::DuplicateKey);
        }
        self.entries.insert(key.to_vec(), value);
        Ok(())
    }

    fn update(&mut self, key: &[u8], value: u64) -> CoreResult<()> {
        match self.entries.get_mut(key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(CoreError::MissingKey),
        }
    }

    fn select(&self, min: &[u8], max: &[u8]) -> CoreResult<Vec<(Vec<u8>, u64)>> {
        // BTreeMap::range panics on an inverted range
        if min > max {
            return Ok(Vec::new());
        }
        Ok(self
            .entries
            .range::<[u8], _>((Bound::Included(min), Bound::Included(max)))
            .map(|(k, v)| (k.clone(), *v))
            .collect())
    }

    fn scan(&self) -> CoreResult<Vec<(Vec<u8>, u64)>> {
        Ok(self.entries.iter().map(|(k, v)| (k.clone(), *v)).collect())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn flush(&mut self) -> CoreResult<()> {
        Ok(())
    }
}
