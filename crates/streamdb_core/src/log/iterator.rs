//! Sequential traversal over log entries.

use crate::error::CoreResult;
use crate::log::binary_log::BinaryLog;
use crate::log::entry::LogEntry;

/// An iterator over log entries in physical order.
///
/// Each step is an independent positional read: the iterator only remembers
/// the position of the next entry, taken from the previous entry's
/// [`LogEntry::next_position`].
///
/// Iteration stops at the end of the log. After an error the iterator is
/// fused and returns `None`.
pub struct LogIterator<'a> {
    log: &'a BinaryLog,
    position: u64,
    finished: bool,
}

impl<'a> LogIterator<'a> {
    pub(crate) fn new(log: &'a BinaryLog, position: u64) -> Self {
        Self {
            log,
            position,
            finished: false,
        }
    }

    /// Returns the position the next call to `next` will read.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl Iterator for LogIterator<'_> {
    type Item = CoreResult<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.log.read_entry(self.position) {
            Ok(Some(entry)) => {
                self.position = entry.next_position();
                Some(Ok(entry))
            }
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
