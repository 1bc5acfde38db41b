//! In-memory outbox of unpublished events.

use crate::types::EventRecord;
use std::collections::{BTreeMap, HashMap};

/// Unpublished events, indexed by log position and by stream version.
///
/// Both maps always hold the same set of events.
#[derive(Debug, Default)]
pub(crate) struct Outbox {
    by_position: BTreeMap<u64, EventRecord>,
    by_key: HashMap<(String, i32), u64>,
}

impl Outbox {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers an unpublished event.
    pub(crate) fn insert(&mut self, event: EventRecord) {
        let position = event.clock.as_u64();
        self.by_key
            .insert((event.stream.clone(), event.version), position);
        self.by_position.insert(position, event);
    }

    /// Returns the log position of an unpublished event.
    pub(crate) fn position_of(&self, stream: &str, version: i32) -> Option<u64> {
        // HashMap<(String, i32), _> cannot be queried with a borrowed tuple
        self.by_key.get(&(stream.to_string(), version)).copied()
    }

    /// Removes an event from both maps.
    pub(crate) fn remove(&mut self, stream: &str, version: i32) -> Option<EventRecord> {
        let position = self.by_key.remove(&(stream.to_string(), version))?;
        self.by_position.remove(&position)
    }

    /// Position of the earliest unpublished event.
    pub(crate) fn earliest(&self) -> Option<u64> {
        self.by_position.keys().next().copied()
    }

    /// Copies the outbox in clock order.
    pub(crate) fn events(&self) -> Vec<EventRecord> {
        self.by_position.values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_position.len()
    }
}
