//! Log Reader
//!
//! Byte stream over every store of a log, for snapshots and replication.

use std::io::{self, Read};
use std::sync::Arc;

use crate::storage::Store;

/// Sequential reader concatenating the raw bytes of each store
///
/// Yields the on-disk framing untouched (length prefix + payload per
/// record), oldest segment first. Bytes are pulled from the stores on
/// demand; nothing is buffered beyond the caller's slice.
pub struct LogReader {
    /// Stores captured when the reader was created, oldest first
    stores: Vec<Arc<Store>>,

    /// Store currently being read
    current: usize,

    /// Byte position within the current store
    position: u64,
}

impl LogReader {
    pub(crate) fn new(stores: Vec<Arc<Store>>) -> Self {
        Self {
            stores,
            current: 0,
            position: 0,
        }
    }

    /// Restart from byte 0 of the first store
    pub fn rewind(&mut self) {
        self.current = 0;
        self.position = 0;
    }
}

impl Read for LogReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while let Some(store) = self.stores.get(self.current) {
            let n = store.read_at(buf, self.position)?;
            if n > 0 {
                self.position += n as u64;
                return Ok(n);
            }

            // This store is exhausted; move on to the next one
            self.current += 1;
            self.position = 0;
        }

        Ok(0)
    }
}
