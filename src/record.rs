//! Record definitions
//!
//! The log treats records as opaque payloads. It only needs to stamp the
//! assigned offset and turn the record into bytes and back.

use serde::{Deserialize, Serialize};

use crate::error::{LogError, Result};

/// Contract a value must satisfy to be stored in the log
pub trait Record: Sized {
    /// Offset assigned by the log (meaningless before append)
    fn offset(&self) -> u64;

    /// Called by the segment right before the record is encoded
    fn set_offset(&mut self, offset: u64);

    /// Serialize into the payload bytes written to the store
    fn encode(&self) -> Result<Vec<u8>>;

    /// Rebuild a record from store payload bytes
    fn decode(bytes: &[u8]) -> Result<Self>;
}

/// Default record type: a byte payload plus its log offset
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogRecord {
    /// Record payload
    pub value: Vec<u8>,

    /// Offset assigned on append
    pub offset: u64,
}

impl LogRecord {
    /// Create a record that has not been appended yet
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: value.into(),
            offset: 0,
        }
    }
}

impl Record for LogRecord {
    fn offset(&self) -> u64 {
        self.offset
    }

    fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| LogError::Serialization(e.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| LogError::Serialization(e.to_string()))
    }
}
