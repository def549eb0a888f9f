//! Store
//!
//! Append-only file of length-prefixed record payloads.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, BytesMut};
use parking_lot::Mutex;

use crate::error::{LogError, Result};

use super::LEN_WIDTH;

/// Append-only record file
///
/// ## Concurrency:
/// - Writer buffer and logical size live behind one mutex
/// - Reads take the same mutex because they flush the buffer first,
///   so a record is readable the moment `append` returns
pub struct Store {
    /// Path to the store file
    path: PathBuf,

    /// Buffered writer + logical size
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    /// File opened in append mode, wrapped for batching small writes
    writer: BufWriter<File>,

    /// Bytes logically written, including bytes still in the buffer
    size: u64,
}

impl Store {
    /// Open or create a store file
    ///
    /// The logical size starts at the current file length.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(StoreInner {
                writer: BufWriter::new(file),
                size,
            }),
        })
    }

    /// Append a payload
    ///
    /// Returns `(bytes_written, position)` where `position` is the store
    /// size before the write and `bytes_written` includes the length prefix.
    pub fn append(&self, payload: &[u8]) -> Result<(u64, u64)> {
        let mut inner = self.inner.lock();
        let position = inner.size;

        let mut frame = BytesMut::with_capacity(LEN_WIDTH as usize + payload.len());
        frame.put_u64(payload.len() as u64);
        frame.put_slice(payload);

        if let Err(e) = inner.writer.write_all(&frame) {
            if let Err(rollback) = inner.rollback_to(position) {
                tracing::warn!(
                    "Store {} could not discard a failed frame at {}: {}",
                    self.path.display(),
                    position,
                    rollback
                );
            }
            return Err(e.into());
        }

        let written = frame.len() as u64;
        inner.size += written;

        Ok((written, position))
    }

    /// Read the payload of the record starting at `position`
    pub fn read(&self, position: u64) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;

        let size = inner.size;
        let mut file = inner.writer.get_ref();
        file.seek(SeekFrom::Start(position))?;

        let mut prefix = [0u8; LEN_WIDTH as usize];
        file.read_exact(&mut prefix).map_err(eof_to_end_of_data)?;
        let len = (&prefix[..]).get_u64();

        // A length pointing past the end of the file can't be a real record
        let end = position
            .checked_add(LEN_WIDTH)
            .and_then(|p| p.checked_add(len))
            .ok_or(LogError::EndOfData)?;
        if end > size {
            return Err(LogError::EndOfData);
        }

        let mut payload = vec![0u8; len as usize];
        file.read_exact(&mut payload).map_err(eof_to_end_of_data)?;

        Ok(payload)
    }

    /// Raw positional read, bypassing the length-prefix framing
    ///
    /// Flushes pending writes first. Returns the number of bytes read,
    /// 0 once `offset` is at or past the end of the file.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;

        let mut file = inner.writer.get_ref();
        file.seek(SeekFrom::Start(offset))?;
        file.read(buf)
    }

    /// Logical size in bytes (buffered bytes included)
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    /// Path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered writes and sync the file to disk
    ///
    /// The descriptor itself is released when the last handle is dropped.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;
        inner.writer.get_ref().sync_all()?;

        tracing::debug!("Closed store {} ({} bytes)", self.path.display(), inner.size);
        Ok(())
    }
}

impl StoreInner {
    /// Drop every byte of a failed frame, from the buffer and from the file,
    /// keeping everything before `position`
    ///
    /// A failed `write_all` may leave part of the frame buffered, or flushed
    /// straight to the file when the frame is larger than the buffer.
    fn rollback_to(&mut self, position: u64) -> io::Result<()> {
        let fresh = BufWriter::new(self.writer.get_ref().try_clone()?);
        let (file, buffered) = std::mem::replace(&mut self.writer, fresh).into_parts();
        let buffered = buffered.unwrap_or_else(|panicked| panicked.into_inner());

        let on_disk = file.metadata()?.len();
        if on_disk > position {
            file.set_len(position)?;
        }

        // Earlier frames still waiting in the buffer go back into it
        let pending = (position.saturating_sub(on_disk) as usize).min(buffered.len());
        self.writer.write_all(&buffered[..pending])?;

        self.size = position;
        Ok(())
    }
}

fn eof_to_end_of_data(e: io::Error) -> LogError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        LogError::EndOfData
    } else {
        LogError::Io(e)
    }
}
