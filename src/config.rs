//! Configuration for the commit log
//!
//! Centralized configuration with sensible defaults.

use crate::error::{LogError, Result};
use crate::storage::ENT_WIDTH;

/// Default store/index rotation threshold, used when a limit is left at zero
pub const DEFAULT_MAX_BYTES: u64 = 1024;

/// Main configuration for a log instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Segment sizing and offset numbering
    pub segment: SegmentConfig,
}

/// Per-segment limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentConfig {
    /// Rotate once the store file reaches this many bytes
    pub max_store_bytes: u64,

    /// Rotate once the index reaches this many bytes.
    /// Also the length the index file is pre-grown to before mapping.
    pub max_index_bytes: u64,

    /// First offset of a brand-new log with no segments on disk
    pub initial_offset: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: DEFAULT_MAX_BYTES,
            max_index_bytes: DEFAULT_MAX_BYTES,
            initial_offset: 0,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Replace unset (zero) limits with defaults and reject limits
    /// that cannot hold a single index entry.
    pub fn normalized(mut self) -> Result<Self> {
        if self.segment.max_store_bytes == 0 {
            self.segment.max_store_bytes = DEFAULT_MAX_BYTES;
        }
        if self.segment.max_index_bytes == 0 {
            self.segment.max_index_bytes = DEFAULT_MAX_BYTES;
        }
        if self.segment.max_index_bytes < ENT_WIDTH {
            return Err(LogError::Config(format!(
                "max_index_bytes must be at least {} (one index entry), got {}",
                ENT_WIDTH, self.segment.max_index_bytes
            )));
        }
        Ok(self)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the store size that triggers rotation (in bytes)
    pub fn max_store_bytes(mut self, bytes: u64) -> Self {
        self.config.segment.max_store_bytes = bytes;
        self
    }

    /// Set the index size that triggers rotation (in bytes)
    pub fn max_index_bytes(mut self, bytes: u64) -> Self {
        self.config.segment.max_index_bytes = bytes;
        self
    }

    /// Set the starting offset of a brand-new log
    pub fn initial_offset(mut self, offset: u64) -> Self {
        self.config.segment.initial_offset = offset;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
