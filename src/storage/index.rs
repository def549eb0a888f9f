//! Index
//!
//! Fixed-width, memory-mapped table from relative record number to store
//! position. O(1) lookup, append-only.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut};

use crate::error::{LogError, Result};

use super::mmap::MappedFile;
use super::ENT_WIDTH;

/// Offset → position index of one segment
///
/// ## Invariants:
/// - `size` is a multiple of `ENT_WIDTH` and counts valid entries only
/// - Bytes of the map past `size` are backing space, never read as entries
///
/// ## Concurrency:
/// No internal locking. Writes need `&mut self`; the owning log only hands
/// out mutable access to the active segment under its exclusive lock.
pub struct Index {
    /// Path to the index file
    path: PathBuf,

    /// Pre-grown, mapped file
    mmap: MappedFile,

    /// Bytes of valid entries
    size: u64,
}

impl Index {
    /// Open or create an index file
    ///
    /// The logical size comes from the file length (a clean close leaves
    /// exactly `entries * ENT_WIDTH` bytes). The file is then grown to
    /// `max_index_bytes` (never shrunk) and mapped.
    pub fn open(path: &Path, max_index_bytes: u64) -> Result<Self> {
        if max_index_bytes < ENT_WIDTH {
            return Err(LogError::Config(format!(
                "index needs room for at least one {}-byte entry, got {} bytes",
                ENT_WIDTH, max_index_bytes
            )));
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;

        let file_len = file.metadata()?.len();
        // A torn trailing entry is not an entry
        let size = nearest_multiple(file_len, ENT_WIDTH);

        let mmap = MappedFile::grow_and_map(file, max_index_bytes.max(file_len))?;

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            size,
        })
    }

    /// Read entry number `entry`; a negative number means the last entry
    ///
    /// Returns `(relative_offset, position)`, or `EndOfData` if the index is
    /// empty or the entry lies past the last written one.
    pub fn read(&self, entry: i64) -> Result<(u32, u64)> {
        if self.size == 0 {
            return Err(LogError::EndOfData);
        }

        let entry = if entry < 0 {
            self.entries() - 1
        } else {
            entry as u64
        };

        let start = entry.checked_mul(ENT_WIDTH).ok_or(LogError::EndOfData)?;
        if start.saturating_add(ENT_WIDTH) > self.size {
            return Err(LogError::EndOfData);
        }

        let mut bytes = self
            .mmap
            .read_slice(start as usize, ENT_WIDTH as usize)
            .ok_or(LogError::EndOfData)?;

        let relative_offset = bytes.get_u32();
        let position = bytes.get_u64();

        Ok((relative_offset, position))
    }

    /// Append an entry
    ///
    /// Fails with `EndOfData` when the map has no room for one more entry.
    pub fn write(&mut self, relative_offset: u32, position: u64) -> Result<()> {
        if self.is_full() {
            return Err(LogError::EndOfData);
        }

        let mut entry = [0u8; ENT_WIDTH as usize];
        let mut buf = &mut entry[..];
        buf.put_u32(relative_offset);
        buf.put_u64(position);

        self.mmap.write_slice(self.size as usize, &entry)?;
        self.size += ENT_WIDTH;

        Ok(())
    }

    /// True if another entry would not fit in the mapped region
    pub fn is_full(&self) -> bool {
        (self.mmap.len() as u64) < self.size + ENT_WIDTH
    }

    /// Bytes of valid entries
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of valid entries
    pub fn entries(&self) -> u64 {
        self.size / ENT_WIDTH
    }

    /// Path to the index file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Forget every entry from `entries` onwards
    pub(crate) fn truncate_entries(&mut self, entries: u64) {
        self.size = self.size.min(entries * ENT_WIDTH);
    }

    /// Sync the map and the file, truncate the file to the valid entries
    /// and close it
    pub fn close(self) -> Result<()> {
        let size = self.size;
        self.mmap.close(size)?;

        tracing::debug!("Closed index {} ({} entries)", self.path.display(), size / ENT_WIDTH);
        Ok(())
    }
}

/// Largest multiple of `k` that is ≤ `j`
fn nearest_multiple(j: u64, k: u64) -> u64 {
    (j / k) * k
}
