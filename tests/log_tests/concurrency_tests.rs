//! Tests for concurrent access
//!
//! These tests verify:
//! - Concurrent appends get unique, gapless offsets
//! - Readers running alongside a writer always see complete records

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use segmentlog::{Config, Log, LogRecord};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_shared_log() -> (TempDir, Arc<Log>) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().max_store_bytes(512).build();
    let log = Log::open(temp_dir.path(), config).unwrap();
    (temp_dir, Arc::new(log))
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_appends_are_gapless() {
    let (_temp, log) = setup_shared_log();
    let threads = 8u64;
    let per_thread = 50u64;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                (0..per_thread)
                    .map(|i| {
                        let mut rec = LogRecord::new(format!("{}-{}", t, i).into_bytes());
                        let offset = log.append(&mut rec).unwrap();
                        (offset, rec.value)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut offsets = BTreeSet::new();
    for handle in handles {
        for (offset, value) in handle.join().unwrap() {
            assert!(offsets.insert(offset), "offset {} assigned twice", offset);
            let read: LogRecord = log.read(offset).unwrap();
            assert_eq!(read.value, value);
        }
    }

    let total = threads * per_thread;
    assert_eq!(offsets.len() as u64, total);
    assert_eq!(offsets.iter().copied().collect::<Vec<_>>(), (0..total).collect::<Vec<_>>());
    assert_eq!(log.highest_offset(), total - 1);
}

#[test]
fn test_reads_alongside_writer() {
    let (_temp, log) = setup_shared_log();
    let total = 200u64;

    let writer = {
        let log = Arc::clone(&log);
        thread::spawn(move || {
            for i in 0..total {
                let mut rec = LogRecord::new(i.to_be_bytes().to_vec());
                assert_eq!(log.append(&mut rec).unwrap(), i);
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                let mut seen = 0u64;
                while seen < total {
                    match log.read::<LogRecord>(seen) {
                        Ok(rec) => {
                            assert_eq!(rec.offset, seen);
                            assert_eq!(rec.value, seen.to_be_bytes().to_vec());
                            seen += 1;
                        }
                        // Not appended yet
                        Err(_) => thread::yield_now(),
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}
