//! # segmentlog
//!
//! A segmented, append-only commit log:
//! - Records get monotonically increasing offsets and are read back by offset
//! - Each segment pairs a length-prefixed store file with a memory-mapped index
//! - Segments rotate when full and are dropped wholesale on truncation
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                            Log                              │
//! │          (RwLock over segments, offset routing)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!     ┌─────────────────┼──────────────────┐
//!     ▼                 ▼                  ▼
//! ┌─────────┐     ┌─────────┐        ┌───────────┐
//! │Segment 0│     │Segment N│  ...   │  Active   │
//! └────┬────┘     └─────────┘        │  Segment  │
//!      │                             └─────┬─────┘
//!      └──────────────┬────────────────────┘
//!          ┌──────────┴──────────┐
//!          ▼                     ▼
//!   ┌─────────────┐       ┌─────────────┐
//!   │    Store    │       │    Index    │
//!   │ (len+bytes) │       │   (mmap)    │
//!   └─────────────┘       └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod record;

pub mod storage;
pub mod log;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LogError, Result};
pub use config::{Config, SegmentConfig};
pub use record::{LogRecord, Record};
pub use log::{Log, LogReader};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of segmentlog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
