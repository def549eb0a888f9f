//! Storage Module
//!
//! On-disk building blocks of the log: one store file and one index file
//! per segment, both named by the segment's base offset.
//!
//! ## Responsibilities
//! - Append length-prefixed record payloads to the store
//! - Map relative record numbers to store positions through the index
//! - Pair a store and an index into an offset-addressed segment
//!
//! ## Store File Format (`<base_offset>.store`)
//! ```text
//! ┌────────────────────────────────────────┐
//! │ Record 1                               │
//! │ ┌──────────────┬─────────────────────┐ │
//! │ │ Len u64 BE(8)│   Payload (Len)     │ │
//! │ └──────────────┴─────────────────────┘ │
//! ├────────────────────────────────────────┤
//! │ Record 2 ... (contiguous, no padding)  │
//! └────────────────────────────────────────┘
//! ```
//!
//! ## Index File Format (`<base_offset>.index`)
//! ```text
//! ┌──────────────────────┬─────────────────────────┐
//! │ RelOffset u32 BE (4) │ Store Position u64 BE(8)│  entry 0
//! ├──────────────────────┼─────────────────────────┤
//! │ ...                  │ ...                     │  entry N-1
//! └──────────────────────┴─────────────────────────┘
//! ```
//! While open, the index file is grown to `max_index_bytes` and mapped;
//! a clean close truncates it back to `entries * 12` bytes.

mod index;
mod mmap;
mod segment;
mod store;

pub use index::Index;
pub use segment::Segment;
pub use store::Store;

// =============================================================================
// Shared Constants
// =============================================================================

/// Width of the store length prefix
pub const LEN_WIDTH: u64 = 8;

/// Width of the relative offset field of an index entry
pub const OFF_WIDTH: u64 = 4;

/// Width of the store position field of an index entry
pub const POS_WIDTH: u64 = 8;

/// Width of one index entry
pub const ENT_WIDTH: u64 = OFF_WIDTH + POS_WIDTH;

/// Store file extension
pub const STORE_EXT: &str = ".store";

/// Index file extension
pub const INDEX_EXT: &str = ".index";
