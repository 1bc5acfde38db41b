//! Log entry layout and serialization.
//!
//! ```text
//! | flags (1) | key len (1) | data len (2) | version (4) | clock (8) | key | data | 0xE7 | filler (0-3) |
//! ```
//!
//! All integers are big-endian. Bit 7 of `flags` is the published flag,
//! the low bits hold the [`RecordKind`]. Entries are padded with `0x00`
//! filler bytes so every entry starts on a 4-byte boundary.

use crate::error::{CoreError, CoreResult};
use crate::types::{Clock, EventRecord, RecordKind, SnapshotRecord};

/// Size of the fixed entry header.
pub const HEADER_SIZE: usize = 16;

/// Byte written after the data of every entry.
pub const TERMINATOR: u8 = 0xE7;

/// Byte used to pad entries to the alignment boundary.
pub const FILLER: u8 = 0x00;

/// Entry alignment in bytes.
pub const ALIGNMENT: u64 = 4;

/// Published bit in the flags byte.
pub const PUBLISHED_FLAG: u8 = 0x80;

/// Mask selecting the record kind from the flags byte.
pub const KIND_MASK: u8 = 0x7F;

/// Longest stream key an entry can hold.
pub const MAX_KEY_LEN: usize = u8::MAX as usize;

/// Largest payload an entry can hold.
pub const MAX_DATA_LEN: usize = u16::MAX as usize;

/// Rounds a position up to the next entry boundary.
#[must_use]
pub const fn align(position: u64) -> u64 {
    (position + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

/// Returns true if `position` is on an entry boundary.
#[must_use]
pub const fn is_aligned(position: u64) -> bool {
    position % ALIGNMENT == 0
}

/// Total on-disk length of an entry, including terminator and filler.
#[must_use]
pub const fn encoded_len(key_len: usize, data_len: usize) -> u64 {
    align((HEADER_SIZE + key_len + data_len + 1) as u64)
}

/// A single entry of the binary log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Byte offset of the entry. Also its clock.
    pub position: u64,
    /// Whether the entry has been delivered downstream.
    pub published: bool,
    /// Event or snapshot.
    pub kind: RecordKind,
    /// Stream key.
    pub stream: String,
    /// Version within the stream.
    pub version: i32,
    /// Opaque payload.
    pub data: Vec<u8>,
}

impl LogEntry {
    /// Creates an entry that has not been appended yet.
    pub fn new(kind: RecordKind, stream: impl Into<String>, version: i32, data: Vec<u8>) -> Self {
        Self {
            position: 0,
            published: false,
            kind,
            stream: stream.into(),
            version,
            data,
        }
    }

    /// Returns the clock of the entry.
    #[must_use]
    pub const fn clock(&self) -> Clock {
        Clock::new(self.position)
    }

    /// Position of the entry that follows this one.
    #[must_use]
    pub fn next_position(&self) -> u64 {
        self.position + encoded_len(self.stream.len(), self.data.len())
    }

    /// Checks key and data lengths against the field widths.
    pub fn validate(&self) -> CoreResult<()> {
        if self.stream.len() > MAX_KEY_LEN {
            return Err(CoreError::invalid_argument(format!(
                "stream key too long: {} bytes exceeds maximum of {} bytes",
                self.stream.len(),
                MAX_KEY_LEN
            )));
        }
        if self.data.len() > MAX_DATA_LEN {
            return Err(CoreError::invalid_argument(format!(
                "entry payload too large: {} bytes exceeds maximum of {} bytes",
                self.data.len(),
                MAX_DATA_LEN
            )));
        }
        if self.version < 0 {
            return Err(CoreError::invalid_argument(format!(
                "negative version {}",
                self.version
            )));
        }
        Ok(())
    }

    /// Serializes the entry as it is written at `position`.
    ///
    /// The clock field is written as `position`.
    pub fn encode(&self, position: u64) -> CoreResult<Vec<u8>> {
        self.validate()?;

        let total = encoded_len(self.stream.len(), self.data.len()) as usize;
        let mut buf = Vec::with_capacity(total);

        let mut flags = self.kind.as_byte();
        if self.published {
            flags |= PUBLISHED_FLAG;
        }
        buf.push(flags);
        buf.push(self.stream.len() as u8);
        buf.extend_from_slice(&(self.data.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.version.to_be_bytes());
        buf.extend_from_slice(&position.to_be_bytes());
        buf.extend_from_slice(self.stream.as_bytes());
        buf.extend_from_slice(&self.data);
        buf.push(TERMINATOR);
        buf.resize(total, FILLER);

        Ok(buf)
    }

    /// Converts an event entry into its domain record.
    #[must_use]
    pub fn into_event(self) -> EventRecord {
        EventRecord {
            clock: self.clock(),
            stream: self.stream,
            version: self.version,
            published: self.published,
            data: self.data,
        }
    }

    /// Converts a snapshot entry into its domain record.
    #[must_use]
    pub fn into_snapshot(self) -> SnapshotRecord {
        SnapshotRecord {
            stream: self.stream,
            version: self.version,
            data: self.data,
        }
    }
}

/// The fixed-size part of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    /// Whether the published bit is set.
    pub published: bool,
    /// Record kind from the low flag bits.
    pub kind: RecordKind,
    /// Length of the stream key.
    pub key_len: usize,
    /// Length of the payload.
    pub data_len: usize,
    /// Stream version.
    pub version: i32,
    /// Clock written at append time.
    pub clock: u64,
}

impl EntryHeader {
    /// Parses a header read at `position`.
    pub fn parse(position: u64, bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(CoreError::corrupt_entry(position, "short header"));
        }

        let flags = bytes[0];
        let kind = RecordKind::from_byte(flags & KIND_MASK).ok_or_else(|| {
            CoreError::corrupt_entry(position, format!("unknown record kind {}", flags & KIND_MASK))
        })?;
        let key_len = bytes[1] as usize;
        let data_len = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        let version = i32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let clock = u64::from_be_bytes([
            bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
        ]);

        Ok(Self {
            published: flags & PUBLISHED_FLAG != 0,
            kind,
            key_len,
            data_len,
            version,
            clock,
        })
    }

    /// Total on-disk length of the entry this header starts.
    #[must_use]
    pub const fn entry_len(&self) -> u64 {
        encoded_len(self.key_len, self.data_len)
    }

    /// Decodes the body that follows the header and verifies the trailer.
    ///
    /// `body` holds everything after the header up to the next boundary.
    pub fn decode_body(&self, position: u64, body: &[u8]) -> CoreResult<LogEntry> {
        let trailer_start = self.key_len + self.data_len;
        let expected = self.entry_len() as usize - HEADER_SIZE;
        if body.len() != expected {
            return Err(CoreError::corrupt_entry(
                position,
                format!("body length {} does not match {}", body.len(), expected),
            ));
        }

        if self.clock != position {
            return Err(CoreError::corrupt_entry(
                position,
                format!("clock {} does not match position", self.clock),
            ));
        }

        if body[trailer_start] != TERMINATOR {
            return Err(CoreError::corrupt_entry(
                position,
                format!("bad terminator byte 0x{:02x}", body[trailer_start]),
            ));
        }

        if body[trailer_start + 1..].iter().any(|&b| b != FILLER) {
            return Err(CoreError::corrupt_entry(position, "bad filler bytes"));
        }

        let stream = std::str::from_utf8(&body[..self.key_len])
            .map_err(|_| CoreError::corrupt_entry(position, "stream key is not UTF-8"))?
            .to_string();

        Ok(LogEntry {
            position,
            published: self.published,
            kind: self.kind,
            stream,
            version: self.version,
            data: body[self.key_len..trailer_start].to_vec(),
        })
    }
}
