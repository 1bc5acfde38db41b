//! Positional reader and appender over the binary log.

use crate::error::{CoreError, CoreResult};
use crate::log::entry::{is_aligned, EntryHeader, LogEntry, HEADER_SIZE, PUBLISHED_FLAG};
use crate::log::iterator::LogIterator;
use streamdb_storage::StorageBackend;
use tracing::warn;

/// Result of reading at a position, before tail handling is applied.
#[derive(Debug)]
pub(crate) enum ReadOutcome {
    /// A complete, valid entry.
    Entry(LogEntry),
    /// Clean end of the log.
    End,
    /// The entry starting here extends past the end of the log.
    Torn,
}

/// Append-only log of self-describing entries.
///
/// `BinaryLog` owns the append cursor. Entries are never rewritten except
/// for the published bit, which only ever goes from 0 to 1.
pub struct BinaryLog {
    backend: Box<dyn StorageBackend>,
    append_position: u64,
    sync_on_append: bool,
}

impl BinaryLog {
    /// Opens a log over the given backend.
    ///
    /// The append cursor is placed at the current end of the backend.
    pub fn open(backend: Box<dyn StorageBackend>, sync_on_append: bool) -> CoreResult<Self> {
        let append_position = backend.size()?;
        Ok(Self {
            backend,
            append_position,
            sync_on_append,
        })
    }

    /// Returns the position the next entry will be written at.
    #[must_use]
    pub fn append_position(&self) -> u64 {
        self.append_position
    }

    /// Returns the current log length in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.append_position
    }

    /// Returns true if the log holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.append_position == 0
    }

    fn check_position(&self, position: u64) -> CoreResult<()> {
        if position > self.append_position || !is_aligned(position) {
            return Err(CoreError::PositionOutOfRange {
                position,
                size: self.append_position,
            });
        }
        Ok(())
    }

    pub(crate) fn read_outcome(&self, position: u64) -> CoreResult<ReadOutcome> {
        self.check_position(position)?;
        if position == self.append_position {
            return Ok(ReadOutcome::End);
        }

        let available = self.append_position - position;
        if available < HEADER_SIZE as u64 {
            return Ok(ReadOutcome::Torn);
        }

        let header_bytes = self.backend.read_at(position, HEADER_SIZE)?;
        let header = EntryHeader::parse(position, &header_bytes)?;
        let entry_len = header.entry_len();
        if entry_len > available {
            return Ok(ReadOutcome::Torn);
        }

        let body = self
            .backend
            .read_at(position + HEADER_SIZE as u64, entry_len as usize - HEADER_SIZE)?;
        Ok(ReadOutcome::Entry(header.decode_body(position, &body)?))
    }

    /// Reads the entry at `position`.
    ///
    /// Returns `Ok(None)` when `position` is the end of the log. The next
    /// entry starts at [`LogEntry::next_position`].
    ///
    /// # Errors
    ///
    /// - [`CoreError::PositionOutOfRange`] if `position` is misaligned or
    ///   past the end
    /// - [`CoreError::CorruptEntry`] if the entry fails validation or is cut
    ///   short by the end of the log
    pub fn read_entry(&self, position: u64) -> CoreResult<Option<LogEntry>> {
        match self.read_outcome(position)? {
            ReadOutcome::Entry(entry) => Ok(Some(entry)),
            ReadOutcome::End => Ok(None),
            ReadOutcome::Torn => Err(CoreError::corrupt_entry(
                position,
                "entry extends past end of log",
            )),
        }
    }

    /// Appends an entry at the append cursor.
    ///
    /// The entry's position (and therefore its clock) is assigned here and
    /// the cursor advances to the next aligned boundary. With
    /// `sync_on_append` the entry is fsynced before this returns.
    pub fn append_entry(&mut self, mut entry: LogEntry) -> CoreResult<LogEntry> {
        let position = self.append_position;
        let bytes = entry.encode(position)?;

        let written_at = self.backend.append(&bytes)?;
        if written_at != position {
            return Err(CoreError::invalid_format(format!(
                "log append landed at {written_at}, expected {position}"
            )));
        }
        if self.sync_on_append {
            self.sync()?;
        }

        entry.position = position;
        self.append_position = position + bytes.len() as u64;
        Ok(entry)
    }

    /// Sets the published bit of the entry at `position`.
    ///
    /// Returns `false` without writing if the bit is already set.
    pub fn mark_published(&mut self, position: u64) -> CoreResult<bool> {
        self.check_position(position)?;
        if position == self.append_position {
            return Err(CoreError::PositionOutOfRange {
                position,
                size: self.append_position,
            });
        }

        let flags = self.backend.read_at(position, 1)?[0];
        if flags & PUBLISHED_FLAG != 0 {
            return Ok(false);
        }

        self.backend.write_at(position, &[flags | PUBLISHED_FLAG])?;
        if self.sync_on_append {
            self.sync()?;
        }
        Ok(true)
    }

    /// Drops a partially written entry at the tail of the log.
    pub(crate) fn truncate_torn_tail(&mut self, position: u64) -> CoreResult<()> {
        warn!(
            position,
            size = self.append_position,
            "dropping partially written entry at end of log"
        );
        self.backend.truncate(position)?;
        self.append_position = position;
        Ok(())
    }

    /// Returns an iterator over entries starting at `position`.
    #[must_use]
    pub fn entries_from(&self, position: u64) -> LogIterator<'_> {
        LogIterator::new(self, position)
    }

    /// Flushes pending writes.
    pub fn flush(&mut self) -> CoreResult<()> {
        self.backend.flush()?;
        Ok(())
    }

    /// Flushes and fsyncs the log.
    pub fn sync(&mut self) -> CoreResult<()> {
        self.backend.flush()?;
        self.backend.sync()?;
        Ok(())
    }
}

impl std::fmt::Debug for BinaryLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryLog")
            .field("append_position", &self.append_position)
            .field("sync_on_append", &self.sync_on_append)
            .finish_non_exhaustive()
    }
}
