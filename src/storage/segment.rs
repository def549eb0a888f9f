//! Segment
//!
//! One store + one index sharing a base offset, presenting an
//! offset-addressed append/read API.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SegmentConfig;
use crate::error::{LogError, Result};
use crate::record::Record;

use super::{Index, Store, INDEX_EXT, STORE_EXT};

/// A bounded (store, index) pair covering offsets `[base_offset, next_offset)`
pub struct Segment {
    /// First offset this segment may hold
    base_offset: u64,

    /// Offset the next append will receive
    next_offset: u64,

    /// Record bytes; shared with bulk readers
    store: Arc<Store>,

    /// Relative offset → store position
    index: Index,

    /// Rotation limits
    config: SegmentConfig,
}

impl Segment {
    /// Open or create the segment based at `base_offset` in `dir`
    ///
    /// On startup:
    /// 1. Open/create `<base>.store` and `<base>.index`
    /// 2. Drop index entries that a missing close left behind
    /// 3. Resume numbering from the last index entry
    pub fn open(dir: &Path, base_offset: u64, config: &SegmentConfig) -> Result<Self> {
        let store = Store::open(&Self::store_path(dir, base_offset))?;
        let mut index = Index::open(&Self::index_path(dir, base_offset), config.max_index_bytes)?;

        recover_index(&mut index, &store);

        let next_offset = match index.read(-1) {
            Ok((relative_offset, _)) => base_offset + u64::from(relative_offset) + 1,
            Err(LogError::EndOfData) => base_offset,
            Err(e) => return Err(e),
        };

        tracing::debug!(
            "Opened segment base={} next={} store_bytes={}",
            base_offset,
            next_offset,
            store.size()
        );

        Ok(Self {
            base_offset,
            next_offset,
            store: Arc::new(store),
            index,
            config: config.clone(),
        })
    }

    /// Append a record, stamping it with the next offset
    ///
    /// Index capacity is checked before any store bytes are written, so a
    /// full segment fails with `EndOfData` and leaves the store untouched.
    pub fn append<R: Record>(&mut self, record: &mut R) -> Result<u64> {
        let offset = self.next_offset;
        let relative_offset =
            u32::try_from(offset - self.base_offset).map_err(|_| LogError::EndOfData)?;
        if self.index.is_full() {
            return Err(LogError::EndOfData);
        }

        record.set_offset(offset);
        let payload = record.encode()?;

        let (_, position) = self.store.append(&payload)?;
        self.index.write(relative_offset, position)?;

        self.next_offset += 1;
        Ok(offset)
    }

    /// Read the record stored at `offset`
    pub fn read<R: Record>(&self, offset: u64) -> Result<R> {
        let relative = offset
            .checked_sub(self.base_offset)
            .and_then(|r| i64::try_from(r).ok())
            .ok_or(LogError::EndOfData)?;

        let (_, position) = self.index.read(relative)?;
        let payload = self.store.read(position)?;

        R::decode(&payload)
    }

    /// True once the store or index has reached its limit, or the index
    /// can't take another entry
    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.max_store_bytes
            || self.index.size() >= self.config.max_index_bytes
            || self.index.is_full()
    }

    /// True if `offset` falls in `[base_offset, next_offset)`
    pub fn contains(&self, offset: u64) -> bool {
        self.base_offset <= offset && offset < self.next_offset
    }

    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// Shared handle to the store, for raw bulk reads
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Close, then delete both backing files
    pub fn remove(self) -> Result<()> {
        let store_path = self.store.path().to_path_buf();
        let index_path = self.index.path().to_path_buf();

        let mut errors = Vec::new();
        if let Err(e) = self.close() {
            errors.push(e);
        }
        for path in [store_path, index_path] {
            if let Err(e) = fs::remove_file(&path) {
                errors.push(e.into());
            }
        }

        LogError::collect(errors)
    }

    /// Close the store, then the index (which truncates its file)
    ///
    /// Both are closed even if the first one fails.
    pub fn close(self) -> Result<()> {
        let mut errors = Vec::new();
        if let Err(e) = self.store.close() {
            errors.push(e);
        }
        if let Err(e) = self.index.close() {
            errors.push(e);
        }

        LogError::collect(errors)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// "<dir>/<base>.store"
    fn store_path(dir: &Path, base_offset: u64) -> PathBuf {
        dir.join(format!("{}{}", base_offset, STORE_EXT))
    }

    /// "<dir>/<base>.index"
    fn index_path(dir: &Path, base_offset: u64) -> PathBuf {
        dir.join(format!("{}{}", base_offset, INDEX_EXT))
    }
}

/// Shrink the index to its longest valid prefix
///
/// An index that was never closed still spans its pre-grown length, its
/// tail full of zeroed entries. Entry `i` is valid when it stores relative
/// offset `i` and a position past the previous entry's, inside the store.
/// The last surviving entry must also point at a complete record.
fn recover_index(index: &mut Index, store: &Store) {
    let store_size = store.size();
    let total = index.entries();

    let mut valid = 0u64;
    let mut previous: Option<u64> = None;
    while valid < total {
        let Ok((relative_offset, position)) = index.read(valid as i64) else {
            break;
        };
        let ordered = match previous {
            None => position == 0,
            Some(prev) => position > prev,
        };
        if u64::from(relative_offset) != valid || !ordered || position >= store_size {
            break;
        }
        previous = Some(position);
        valid += 1;
    }

    while valid > 0 {
        let complete = index
            .read(valid as i64 - 1)
            .and_then(|(_, position)| store.read(position))
            .is_ok();
        if complete {
            break;
        }
        valid -= 1;
    }

    if valid < total {
        tracing::warn!(
            "Index {} holds {} entries, only {} are valid; discarding the rest",
            index.path().display(),
            total,
            valid
        );
        index.truncate_entries(valid);
    }
}
