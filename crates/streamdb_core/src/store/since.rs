//! Catch-up reads in global clock order.

use crate::error::CoreResult;
use crate::stats::StoreCounters;
use crate::store::state::StoreState;
use crate::types::{Clock, EventRecord, RecordKind};
use parking_lot::Mutex;
use std::sync::Arc;

/// Iterator over the events of every stream from a given clock.
///
/// Walks the log in physical order and skips snapshots. Each step holds
/// the store lock only while reading one entry, so writers make progress
/// between steps and events appended during iteration are picked up.
///
/// The iterator is fused after an error or the end of the log. A new
/// iterator can be started from [`EventsSince::clock`] to resume.
pub struct EventsSince {
    state: Arc<Mutex<StoreState>>,
    counters: Arc<StoreCounters>,
    position: u64,
    finished: bool,
}

impl EventsSince {
    pub(crate) fn new(
        state: Arc<Mutex<StoreState>>,
        counters: Arc<StoreCounters>,
        clock: Clock,
    ) -> Self {
        Self {
            state,
            counters,
            position: clock.as_u64(),
            finished: false,
        }
    }

    /// Clock of the next entry to be read.
    #[must_use]
    pub fn clock(&self) -> Clock {
        Clock::new(self.position)
    }

    fn step(&mut self) -> CoreResult<Option<EventRecord>> {
        loop {
            let entry = {
                let state = self.state.lock();
                state.ensure_open()?;
                state.log.read_entry(self.position)?
            };
            let Some(entry) = entry else {
                return Ok(None);
            };

            self.counters.record_read();
            self.position = entry.next_position();
            if entry.kind == RecordKind::Event {
                return Ok(Some(entry.into_event()));
            }
        }
    }
}

impl Iterator for EventsSince {
    type Item = CoreResult<EventRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.step() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl std::fmt::Debug for EventsSince {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventsSince")
            .field("position", &self.position)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
