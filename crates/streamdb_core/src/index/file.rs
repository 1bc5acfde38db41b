//! Journaled ordered index.
//!
//! Every insert and update is appended to a journal on a storage backend
//! and replayed into a [`MemoryIndex`] on open.
//!
//! ## Journal Record Format
//!
//! ```text
//! | op (1) | key len (2) | key (N) | value (8) | crc32 (4) |
//! ```
//!
//! Integers are big-endian; the CRC covers everything before it.
//!
//! ## Replay Policy
//!
//! - **Truncated record at the tail**: crash mid-write, dropped with a warning
//! - **CRC mismatch / unknown op**: `Err(IndexCorruption)`
//! - **Insert of a present key / update of an absent key**: `Err(IndexCorruption)`
//!
//! Updates accumulate, so a journal with more records than keys is
//! compacted on open.

use crate::error::{CoreError, CoreResult};
use crate::index::memory::MemoryIndex;
use crate::index::traits::OrderedIndex;
use streamdb_storage::StorageBackend;
use tracing::{debug, warn};

const OP_INSERT: u8 = 1;
const OP_UPDATE: u8 = 2;

/// op (1) + key len (2)
const RECORD_PREFIX: usize = 3;

/// value (8) + crc (4)
const RECORD_SUFFIX: usize = 12;

/// Ordered index made durable by an append-only journal.
pub struct FileIndex {
    entries: MemoryIndex,
    journal: Box<dyn StorageBackend>,
    sync_on_write: bool,
}

impl FileIndex {
    /// Opens the index, replaying any existing journal.
    ///
    /// A journal holding more records than live keys (updated headers) is
    /// rewritten with one insert per key.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexCorruption`] if a complete journal record
    /// fails validation.
    pub fn open(mut journal: Box<dyn StorageBackend>, sync_on_write: bool) -> CoreResult<Self> {
        let size = journal.size()?;
        let data = journal.read_at(0, size as usize)?;
        let replayed = replay(&data)?;

        if replayed.valid_len < size {
            warn!(
                valid_len = replayed.valid_len,
                size, "dropping truncated record at end of index journal"
            );
            journal.truncate(replayed.valid_len)?;
        }

        debug!(
            keys = replayed.entries.len(),
            records = replayed.records,
            journal_bytes = replayed.valid_len,
            "index journal replayed"
        );

        let mut index = Self {
            entries: replayed.entries,
            journal,
            sync_on_write,
        };
        if replayed.records > index.entries.len() {
            index.compact()?;
        }
        Ok(index)
    }

    /// Rewrites the journal as one insert per live key.
    fn compact(&mut self) -> CoreResult<()> {
        let mut bytes = Vec::new();
        for (key, value) in self.entries.scan()? {
            bytes.extend(encode_record(OP_INSERT, &key, value)?);
        }

        self.journal.truncate(0)?;
        self.journal.append(&bytes)?;
        self.journal.sync()?;
        debug!(
            keys = self.entries.len(),
            journal_bytes = bytes.len(),
            "index journal compacted"
        );
        Ok(())
    }

    fn append_record(&mut self, op: u8, key: &[u8], value: u64) -> CoreResult<()> {
        let record = encode_record(op, key, value)?;
        self.journal.append(&record)?;
        if self.sync_on_write {
            self.journal.sync()?;
        }
        Ok(())
    }
}

fn encode_record(op: u8, key: &[u8], value: u64) -> CoreResult<Vec<u8>> {
    let key_len = u16::try_from(key.len())
        .map_err(|_| CoreError::invalid_argument("index key longer than 65535 bytes"))?;

    let mut record = Vec::with_capacity(RECORD_PREFIX + key.len() + RECORD_SUFFIX);
    record.push(op);
    record.extend_from_slice(&key_len.to_be_bytes());
    record.extend_from_slice(key);
    record.extend_from_slice(&value.to_be_bytes());
    let crc = crc32fast::hash(&record);
    record.extend_from_slice(&crc.to_be_bytes());
    Ok(record)
}

struct Replayed {
    entries: MemoryIndex,
    records: usize,
    valid_len: u64,
}

/// Replays journal bytes up to the first incomplete record.
fn replay(data: &[u8]) -> CoreResult<Replayed> {
    let mut index = MemoryIndex::new();
    let mut records = 0usize;
    let mut pos = 0usize;

    while pos < data.len() {
        let remaining = data.len() - pos;
        if remaining < RECORD_PREFIX {
            break;
        }

        let op = data[pos];
        let key_len = u16::from_be_bytes([data[pos + 1], data[pos + 2]]) as usize;
        let record_len = RECORD_PREFIX + key_len + RECORD_SUFFIX;
        if remaining < record_len {
            break;
        }

        let record = &data[pos..pos + record_len];
        let body_len = record_len - 4;
        let stored_crc = u32::from_be_bytes([
            record[body_len],
            record[body_len + 1],
            record[body_len + 2],
            record[body_len + 3],
        ]);
        let computed_crc = crc32fast::hash(&record[..body_len]);
        if stored_crc != computed_crc {
            return Err(CoreError::index_corruption(format!(
                "checksum mismatch at journal offset {pos}: expected {stored_crc:08x}, got {computed_crc:08x}"
            )));
        }

        let key = &record[RECORD_PREFIX..RECORD_PREFIX + key_len];
        let value_start = RECORD_PREFIX + key_len;
        let mut value_bytes = [0u8; 8];
        value_bytes.copy_from_slice(&record[value_start..value_start + 8]);
        let value = u64::from_be_bytes(value_bytes);

        let applied = match op {
            OP_INSERT => index.insert(key, value),
            OP_UPDATE => index.update(key, value),
            other => {
                return Err(CoreError::index_corruption(format!(
                    "unknown journal op {other} at offset {pos}"
                )))
            }
        };
        applied.map_err(|e| {
            CoreError::index_corruption(format!("journal record at offset {pos} rejected: {e}"))
        })?;

        records += 1;
        pos += record_len;
    }

    Ok(Replayed {
        entries: index,
        records,
        valid_len: pos as u64,
    })
}

impl OrderedIndex for FileIndex {
    fn insert(&mut self, key: &[u8], value: u64) -> CoreResult<()> {
        if self.entries.contains(key) {
            return Err(CoreError::DuplicateKey);
        }
        self.append_record(OP_INSERT, key, value)?;
        self.entries.insert(key, value)
    }

    fn update(&mut self, key: &[u8], value: u64) -> CoreResult<()> {
        if !self.entries.contains(key) {
            return Err(CoreError::MissingKey);
        }
        self.append_record(OP_UPDATE, key, value)?;
        self.entries.update(key, value)
    }

    fn select(&self, min: &[u8], max: &[u8]) -> CoreResult<Vec<(Vec<u8>, u64)>> {
        self.entries.select(min, max)
    }

    fn scan(&self) -> CoreResult<Vec<(Vec<u8>, u64)>> {
        self.entries.scan()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn flush(&mut self) -> CoreResult<()> {
        self.journal.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> CoreResult<()> {
        self.journal.flush()?;
        self.journal.sync()?;
        Ok(())
    }
}

impl std::fmt::Debug for FileIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileIndex")
            .field("keys", &self.entries.len())
            .field("sync_on_write", &self.sync_on_write)
            .finish_non_exhaustive()
    }
}
