//! Stream lookups over the composite-key index.

use crate::error::{CoreError, CoreResult};
use crate::index::key::{HeaderKey, StreamKey};
use crate::index::traits::OrderedIndex;
use crate::types::RecordKind;

/// Durable store headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Headers {
    /// Position the next log entry will be written at.
    pub append_position: u64,
    /// Earliest position that may hold an unpublished event.
    pub unpublished_checkpoint: u64,
}

/// Maps (stream, kind, version) to log positions.
///
/// Wraps two ordered indexes: one keyed by [`StreamKey`] bytes and one
/// holding the two [`HeaderKey`] entries.
pub struct StreamIndex {
    streams: Box<dyn OrderedIndex>,
    headers: Box<dyn OrderedIndex>,
}

impl StreamIndex {
    /// Creates a stream index over the given ordered indexes.
    pub fn new(streams: Box<dyn OrderedIndex>, headers: Box<dyn OrderedIndex>) -> Self {
        Self { streams, headers }
    }

    /// Returns `(version, position)` for every event of `stream` with
    /// version `>= min_version`, ordered by version.
    pub fn find_events(&self, stream: &str, min_version: i32) -> CoreResult<Vec<(i32, u64)>> {
        let min = StreamKey::encode(stream, RecordKind::Event, min_version.max(0))?;
        let max = StreamKey::encode(stream, RecordKind::Event, i32::MAX)?;
        self.streams
            .select(&min, &max)?
            .into_iter()
            .map(|(key, position)| Ok((StreamKey::from_bytes(&key)?.version, position)))
            .collect()
    }

    /// Returns `(version, position)` of the latest snapshot of `stream`.
    pub fn find_snapshot(&self, stream: &str) -> CoreResult<Option<(i32, u64)>> {
        let min = StreamKey::encode(stream, RecordKind::Snapshot, 0)?;
        let max = StreamKey::encode(stream, RecordKind::Snapshot, i32::MAX)?;
        match self.streams.select(&min, &max)?.pop() {
            Some((key, position)) => Ok(Some((StreamKey::from_bytes(&key)?.version, position))),
            None => Ok(None),
        }
    }

    /// Returns true if `stream` holds at least one event.
    pub fn stream_exists(&self, stream: &str) -> CoreResult<bool> {
        let min = StreamKey::encode(stream, RecordKind::Event, 0)?;
        let max = StreamKey::encode(stream, RecordKind::Event, 1)?;
        Ok(!self.streams.select(&min, &max)?.is_empty())
    }

    /// Returns the position indexed for a single key.
    pub fn lookup(&self, stream: &str, kind: RecordKind, version: i32) -> CoreResult<Option<u64>> {
        self.streams.get(&StreamKey::encode(stream, kind, version)?)
    }

    /// Indexes a newly appended log entry.
    pub fn insert_entry(
        &mut self,
        stream: &str,
        kind: RecordKind,
        version: i32,
        position: u64,
    ) -> CoreResult<()> {
        self.streams
            .insert(&StreamKey::encode(stream, kind, version)?, position)
    }

    /// Returns the names of all streams that hold events, in key order.
    pub fn list_streams(&self) -> CoreResult<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for (key, _) in self.streams.scan()? {
            let key = StreamKey::from_bytes(&key)?;
            if key.kind == RecordKind::Event && names.last() != Some(&key.stream) {
                names.push(key.stream);
            }
        }
        Ok(names)
    }

    /// Returns the number of stream keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Returns true if no stream keys are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Reads the durable headers, defaulting to zero for a new store.
    pub fn read_headers(&self) -> CoreResult<Headers> {
        let read = |key: HeaderKey| -> CoreResult<u64> {
            Ok(self.headers.get(&key.to_bytes())?.unwrap_or(0))
        };
        Ok(Headers {
            append_position: read(HeaderKey::AppendPosition)?,
            unpublished_checkpoint: read(HeaderKey::UnpublishedCheckpoint)?,
        })
    }

    /// Persists both headers, inserting them on first use.
    pub fn write_headers(&mut self, headers: &Headers) -> CoreResult<()> {
        self.write_header(HeaderKey::AppendPosition, headers.append_position)?;
        self.write_header(
            HeaderKey::UnpublishedCheckpoint,
            headers.unpublished_checkpoint,
        )
    }

    fn write_header(&mut self, key: HeaderKey, value: u64) -> CoreResult<()> {
        let key = key.to_bytes();
        match self.headers.insert(&key, value) {
            Err(CoreError::DuplicateKey) => self.headers.update(&key, value),
            other => other,
        }
    }

    /// Flushes the stream keys, fsyncing them when `durable`.
    pub fn flush_streams(&mut self, durable: bool) -> CoreResult<()> {
        if durable {
            self.streams.sync()
        } else {
            self.streams.flush()
        }
    }

    /// Flushes the headers, fsyncing them when `durable`.
    pub fn flush_headers(&mut self, durable: bool) -> CoreResult<()> {
        if durable {
            self.headers.sync()
        } else {
            self.headers.flush()
        }
    }
}

impl std::fmt::Debug for StreamIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamIndex")
            .field("stream_keys", &self.streams.len())
            .finish_non_exhaustive()
    }
}
