//! Composite stream keys and header keys.
//!
//! ```text
//! | name len (2) | name (N) | kind (1) | version (4) |
//! ```
//!
//! Integers are big-endian, so byte-lexicographic order groups every key of
//! one stream and kind together, sorted by version. That makes "all events
//! of a stream from version N" a single contiguous range.

use crate::error::{CoreError, CoreResult};
use crate::types::RecordKind;

/// Length of the non-name part of a stream key.
const FIXED_LEN: usize = 2 + 1 + 4;

/// Decoded composite key of the stream index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamKey {
    /// Stream name.
    pub stream: String,
    /// Event or snapshot.
    pub kind: RecordKind,
    /// Version within the stream.
    pub version: i32,
}

impl StreamKey {
    /// Creates a new stream key.
    pub fn new(stream: impl Into<String>, kind: RecordKind, version: i32) -> Self {
        Self {
            stream: stream.into(),
            kind,
            version,
        }
    }

    /// Encodes a key without building a `StreamKey`.
    pub fn encode(stream: &str, kind: RecordKind, version: i32) -> CoreResult<Vec<u8>> {
        let name_len = u16::try_from(stream.len()).map_err(|_| {
            CoreError::invalid_argument(format!(
                "stream name too long for index key: {} bytes",
                stream.len()
            ))
        })?;

        let mut buf = Vec::with_capacity(FIXED_LEN + stream.len());
        buf.extend_from_slice(&name_len.to_be_bytes());
        buf.extend_from_slice(stream.as_bytes());
        buf.push(kind.as_byte());
        buf.extend_from_slice(&version.to_be_bytes());
        Ok(buf)
    }

    /// Serializes the key to bytes.
    pub fn to_bytes(&self) -> CoreResult<Vec<u8>> {
        Self::encode(&self.stream, self.kind, self.version)
    }

    /// Deserializes a key from bytes.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() < FIXED_LEN {
            return Err(CoreError::index_corruption("stream key too short"));
        }

        let name_len = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
        if bytes.len() != FIXED_LEN + name_len {
            return Err(CoreError::index_corruption(format!(
                "stream key length {} does not match name length {}",
                bytes.len(),
                name_len
            )));
        }

        let stream = std::str::from_utf8(&bytes[2..2 + name_len])
            .map_err(|_| CoreError::index_corruption("stream key name is not UTF-8"))?
            .to_string();
        let kind_byte = bytes[2 + name_len];
        let kind = RecordKind::from_byte(kind_byte).ok_or_else(|| {
            CoreError::index_corruption(format!("unknown record kind {kind_byte} in stream key"))
        })?;
        let v = &bytes[3 + name_len..];
        let version = i32::from_be_bytes([v[0], v[1], v[2], v[3]]);

        Ok(Self {
            stream,
            kind,
            version,
        })
    }
}

/// Keys of the header index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HeaderKey {
    /// Durable append position of the log.
    AppendPosition = 0,
    /// Position of the earliest entry that may still be unpublished.
    UnpublishedCheckpoint = 1,
}

impl HeaderKey {
    /// Encodes the header key as an 8-byte big-endian integer.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 8] {
        (self as u64).to_be_bytes()
    }
}
