//! Memory-mapped file
//!
//! A file grown to a fixed length and mapped read/write, shared mapping.
//! A live map can't be resized, so the file is grown *before* mapping and
//! shrunk back to its logical length only after the map is gone.

use std::fs::File;
use std::io;

use memmap2::MmapMut;

/// A read/write memory-mapped region over a pre-grown file
///
/// # Ownership & Lifetime
/// - Owns both the file descriptor and the map
/// - The map is dropped before the file is truncated on `close`
/// - Exactly one `MappedFile` per file; segments never share index files
pub(crate) struct MappedFile {
    file: File,
    mmap: MmapMut,
}

impl MappedFile {
    /// Grow `file` to `len` bytes and map the whole of it
    ///
    /// `file` must be opened read + write.
    pub fn grow_and_map(file: File, len: u64) -> io::Result<Self> {
        if len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot map an empty file",
            ));
        }

        file.set_len(len)?;

        // SAFETY: the file is exclusively owned by this MappedFile, its length
        // stays fixed while mapped (only `close` truncates, after dropping the
        // map) and every access below is bounds-checked against the map length.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self { file, mmap })
    }

    /// Mapped length in bytes
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Borrow `len` bytes starting at `offset`, or `None` if out of bounds
    pub fn read_slice(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let end = offset.checked_add(len)?;
        self.mmap.get(offset..end)
    }

    /// Copy `bytes` into the map at `offset`
    pub fn write_slice(&mut self, offset: usize, bytes: &[u8]) -> io::Result<()> {
        let end = offset
            .checked_add(bytes.len())
            .filter(|&end| end <= self.mmap.len())
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::UnexpectedEof, "write past end of map")
            })?;

        self.mmap[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Flush the map, sync the file, unmap, truncate to `logical_len`
    /// and close the descriptor.
    pub fn close(self, logical_len: u64) -> io::Result<()> {
        let Self { file, mmap } = self;

        mmap.flush()?;
        file.sync_all()?;
        drop(mmap);

        file.set_len(logical_len)?;
        file.sync_all()?;
        Ok(())
    }
}
