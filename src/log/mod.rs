//! Log Module
//!
//! The ordered collection of segments behind a single logical offset space.
//!
//! ## Responsibilities
//! - Discover and reopen existing segments on startup
//! - Route appends to the active (last) segment, rotate when it is maxed
//! - Route reads to the segment whose offset range holds the offset
//! - Drop whole segments below a retention cutoff
//! - Stream the raw bytes of every store for snapshots

mod reader;

pub use reader::LogReader;

use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{LogError, Result};
use crate::record::Record;
use crate::storage::{Segment, INDEX_EXT};

/// A segmented, append-only commit log
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (append/truncate/reset): exclusive `segments` lock
///   - Offsets are assigned in lock order, gapless and monotonic
/// - **Reads** (read/lowest/highest/reader): shared `segments` lock
///   - Each store serializes its own flush-then-read internally
///
/// ## Invariants:
/// - `segments` is sorted by base offset, ranges contiguous, never empty
///   between operations
/// - The last segment is the active (writable) one
pub struct Log {
    /// Directory holding every `<base>.store` / `<base>.index` pair
    dir: PathBuf,

    /// Normalized configuration
    config: Config,

    /// Segments ordered by base offset
    segments: RwLock<Vec<Segment>>,
}

impl Log {
    /// Open or create a log in `dir`
    ///
    /// On startup:
    /// 1. Normalize the config (zero limits → defaults)
    /// 2. Create the directory if it doesn't exist
    /// 3. Reopen every segment found, ordered by base offset
    /// 4. Create the first segment at `initial_offset` if there were none
    pub fn open(dir: impl AsRef<Path>, config: Config) -> Result<Self> {
        let config = config.normalized()?;
        let dir = dir.as_ref().to_path_buf();

        let segments = Self::load_segments(&dir, &config)?;

        tracing::info!(
            "Opened log {} with {} segment(s), offsets [{}, {})",
            dir.display(),
            segments.len(),
            segments.first().map(|s| s.base_offset()).unwrap_or(0),
            segments.last().map(|s| s.next_offset()).unwrap_or(0)
        );

        Ok(Self {
            dir,
            config,
            segments: RwLock::new(segments),
        })
    }

    /// Append a record, returning its offset
    ///
    /// The record's offset field is set before it is encoded.
    pub fn append<R: Record>(&self, record: &mut R) -> Result<u64> {
        let mut segments = self.segments.write();

        let active = self.writable_segment(&mut segments)?;
        let offset = active.append(record)?;
        let maxed = active.is_maxed();

        if maxed {
            match Segment::open(&self.dir, offset + 1, &self.config.segment) {
                Ok(segment) => {
                    tracing::info!("Rotated log {} to segment {}", self.dir.display(), offset + 1);
                    segments.push(segment);
                }
                // The next append retries the rotation and reports the failure
                Err(e) => tracing::warn!("Segment rotation at {} failed: {}", offset + 1, e),
            }
        }

        Ok(offset)
    }

    /// Read the record at `offset`
    pub fn read<R: Record>(&self, offset: u64) -> Result<R> {
        let segments = self.segments.read();

        let segment = segments
            .iter()
            .find(|s| s.contains(offset))
            .ok_or(LogError::OffsetNotFound(offset))?;

        segment.read(offset)
    }

    /// Base offset of the oldest segment
    pub fn lowest_offset(&self) -> u64 {
        self.segments
            .read()
            .first()
            .map(|s| s.base_offset())
            .unwrap_or(self.config.segment.initial_offset)
    }

    /// Offset of the newest record, or 0 if nothing was ever appended
    pub fn highest_offset(&self) -> u64 {
        self.segments
            .read()
            .last()
            .map(|s| s.next_offset())
            .unwrap_or(0)
            .saturating_sub(1)
    }

    /// Remove every segment whose records all lie at or below `offset`
    ///
    /// Whole segments only: a segment with any offset above `offset` stays.
    /// Files are deleted immediately.
    pub fn truncate(&self, offset: u64) -> Result<()> {
        let mut segments = self.segments.write();

        let frontier = segments
            .last()
            .map(|s| s.next_offset())
            .unwrap_or(self.config.segment.initial_offset);
        let cutoff = offset.saturating_add(1);

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *segments)
            .into_iter()
            .partition(|s| s.next_offset() <= cutoff);
        *segments = kept;

        let removed_count = removed.len();
        let mut errors = Vec::new();
        for segment in removed {
            if let Err(e) = segment.remove() {
                errors.push(e);
            }
        }

        // Keep the log writable without reusing truncated offsets
        if segments.is_empty() {
            match Segment::open(&self.dir, frontier, &self.config.segment) {
                Ok(segment) => segments.push(segment),
                Err(e) => errors.push(e),
            }
        }

        tracing::info!(
            "Truncated log {} at offset {}: removed {} segment(s)",
            self.dir.display(),
            offset,
            removed_count
        );

        LogError::collect(errors)
    }

    /// Delete everything and start over as a brand-new log
    pub fn reset(&self) -> Result<()> {
        let mut segments = self.segments.write();

        let mut errors = Vec::new();
        if let Err(e) = Self::close_segments(std::mem::take(&mut *segments)) {
            errors.push(e);
        }
        if let Err(e) = remove_dir(&self.dir) {
            errors.push(e);
        }

        match Self::load_segments(&self.dir, &self.config) {
            Ok(fresh) => *segments = fresh,
            Err(e) => errors.push(e),
        }

        tracing::info!("Reset log {}", self.dir.display());
        LogError::collect(errors)
    }

    /// Sequential stream over the raw bytes of every store, oldest first
    pub fn reader(&self) -> LogReader {
        let segments = self.segments.read();
        LogReader::new(segments.iter().map(|s| Arc::clone(s.store())).collect())
    }

    /// Close every segment
    ///
    /// All segments are closed even if some fail; failures are aggregated.
    pub fn close(self) -> Result<()> {
        tracing::info!("Closing log {}", self.dir.display());
        Self::close_segments(self.segments.into_inner())
    }

    /// Close the log and delete its directory
    pub fn remove(self) -> Result<()> {
        let dir = self.dir.clone();

        let mut errors = Vec::new();
        if let Err(e) = self.close() {
            errors.push(e);
        }
        if let Err(e) = remove_dir(&dir) {
            errors.push(e);
        }

        LogError::collect(errors)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of open segments
    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    /// `[base_offset, next_offset)` of every segment, oldest first
    pub fn segment_ranges(&self) -> Vec<Range<u64>> {
        self.segments
            .read()
            .iter()
            .map(|s| s.base_offset()..s.next_offset())
            .collect()
    }

    /// Get the log directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// The active segment, rotating first if it can't take another record
    fn writable_segment<'a>(&self, segments: &'a mut Vec<Segment>) -> Result<&'a mut Segment> {
        let rotate_at = match segments.last() {
            None => Some(self.config.segment.initial_offset),
            Some(active) if active.is_maxed() => Some(active.next_offset()),
            Some(_) => None,
        };

        if let Some(base_offset) = rotate_at {
            segments.push(Segment::open(&self.dir, base_offset, &self.config.segment)?);
            tracing::info!("Rotated log {} to segment {}", self.dir.display(), base_offset);
        }

        segments.last_mut().ok_or(LogError::EndOfData)
    }

    /// Open every segment in `dir`, or a first one at `initial_offset`
    fn load_segments(dir: &Path, config: &Config) -> Result<Vec<Segment>> {
        fs::create_dir_all(dir)?;

        let mut base_offsets: Vec<u64> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(stem) = Self::index_stem(&path) {
                match stem.parse::<u64>() {
                    Ok(base_offset) => base_offsets.push(base_offset),
                    Err(_) => tracing::warn!("Skipping unrecognized index file {}", path.display()),
                }
            }
        }
        base_offsets.sort_unstable();

        let mut segments = Vec::with_capacity(base_offsets.len().max(1));
        for base_offset in base_offsets {
            match Segment::open(dir, base_offset, &config.segment) {
                Ok(segment) => segments.push(segment),
                Err(e) => {
                    if let Err(close_err) = Self::close_segments(segments) {
                        tracing::warn!("Cleanup after failed open: {}", close_err);
                    }
                    return Err(e);
                }
            }
        }

        if segments.is_empty() {
            segments.push(Segment::open(dir, config.segment.initial_offset, &config.segment)?);
        }

        Ok(segments)
    }

    fn close_segments(segments: Vec<Segment>) -> Result<()> {
        let mut errors = Vec::new();
        for segment in segments {
            if let Err(e) = segment.close() {
                errors.push(e);
            }
        }
        LogError::collect(errors)
    }

    /// "42.index" → Some("42")
    fn index_stem(path: &Path) -> Option<&str> {
        path.file_name()?.to_str()?.strip_suffix(INDEX_EXT)
    }
}

/// Delete a directory tree; a directory that is already gone is fine
fn remove_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
