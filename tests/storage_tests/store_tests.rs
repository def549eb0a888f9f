//! Tests for Store
//!
//! These tests verify:
//! - Length-prefixed framing and returned positions
//! - Reads see buffered (unflushed) appends
//! - Raw positional reads
//! - Close flushes to disk and reopen restores the size
//! - A failed append leaves no partial frame behind

use std::path::{Path, PathBuf};

use segmentlog::storage::{Store, LEN_WIDTH};
use segmentlog::LogError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const PAYLOAD: &[u8] = b"hello world";

fn setup_temp_store() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("0.store");
    (temp_dir, path)
}

fn width() -> u64 {
    PAYLOAD.len() as u64 + LEN_WIDTH
}

// =============================================================================
// Append Tests
// =============================================================================

#[test]
fn test_append_returns_width_and_position() {
    let (_temp, path) = setup_temp_store();
    let store = Store::open(&path).unwrap();

    for i in 0..3 {
        let (written, position) = store.append(PAYLOAD).unwrap();
        assert_eq!(written, width());
        assert_eq!(position, i * width());
    }

    assert_eq!(store.size(), 3 * width());
}

#[test]
fn test_append_empty_payload() {
    let (_temp, path) = setup_temp_store();
    let store = Store::open(&path).unwrap();

    let (written, position) = store.append(b"").unwrap();

    assert_eq!(written, LEN_WIDTH);
    assert_eq!(position, 0);
    assert_eq!(store.read(0).unwrap(), Vec::<u8>::new());
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_read_sees_buffered_appends() {
    let (_temp, path) = setup_temp_store();
    let store = Store::open(&path).unwrap();

    let (_, first) = store.append(b"first").unwrap();
    let (_, second) = store.append(b"second").unwrap();

    // Nothing has been flushed explicitly
    assert_eq!(store.read(first).unwrap(), b"first");
    assert_eq!(store.read(second).unwrap(), b"second");
}

#[test]
fn test_read_past_end_is_end_of_data() {
    let (_temp, path) = setup_temp_store();
    let store = Store::open(&path).unwrap();
    store.append(PAYLOAD).unwrap();

    let result = store.read(width());

    assert!(matches!(result, Err(LogError::EndOfData)));
}

#[test]
fn test_read_empty_store_is_end_of_data() {
    let (_temp, path) = setup_temp_store();
    let store = Store::open(&path).unwrap();

    assert!(store.read(0).unwrap_err().is_end_of_data());
}

#[test]
fn test_read_at_returns_raw_frame() {
    let (_temp, path) = setup_temp_store();
    let store = Store::open(&path).unwrap();
    store.append(PAYLOAD).unwrap();

    let mut prefix = [0u8; LEN_WIDTH as usize];
    let n = store.read_at(&mut prefix, 0).unwrap();
    assert_eq!(n, LEN_WIDTH as usize);
    assert_eq!(u64::from_be_bytes(prefix), PAYLOAD.len() as u64);

    let mut payload = vec![0u8; PAYLOAD.len()];
    let n = store.read_at(&mut payload, LEN_WIDTH).unwrap();
    assert_eq!(n, PAYLOAD.len());
    assert_eq!(payload, PAYLOAD);
}

#[test]
fn test_read_at_end_returns_zero() {
    let (_temp, path) = setup_temp_store();
    let store = Store::open(&path).unwrap();
    store.append(PAYLOAD).unwrap();

    let mut buf = [0u8; 16];
    assert_eq!(store.read_at(&mut buf, width()).unwrap(), 0);
}

// =============================================================================
// Close / Reopen Tests
// =============================================================================

#[test]
fn test_close_flushes_to_disk() {
    let (_temp, path) = setup_temp_store();
    let store = Store::open(&path).unwrap();
    store.append(PAYLOAD).unwrap();

    let before = std::fs::metadata(&path).unwrap().len();
    store.close().unwrap();
    let after = std::fs::metadata(&path).unwrap().len();

    assert!(after > before);
    assert_eq!(after, width());
}

#[test]
fn test_reopen_restores_size_and_continues() {
    let (_temp, path) = setup_temp_store();
    {
        let store = Store::open(&path).unwrap();
        store.append(b"one").unwrap();
        store.close().unwrap();
    }

    let store = Store::open(&path).unwrap();
    assert_eq!(store.size(), 3 + LEN_WIDTH);

    let (_, position) = store.append(b"two").unwrap();
    assert_eq!(position, 3 + LEN_WIDTH);
    assert_eq!(store.read(0).unwrap(), b"one");
    assert_eq!(store.read(position).unwrap(), b"two");
}

#[test]
fn test_on_disk_framing_is_big_endian() {
    let (_temp, path) = setup_temp_store();
    let store = Store::open(&path).unwrap();
    store.append(b"abc").unwrap();
    store.close().unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes, [0, 0, 0, 0, 0, 0, 0, 3, b'a', b'b', b'c']);
}

// =============================================================================
// Failed Write Tests
// =============================================================================

/// Every write to this device fails with "no space left"
const FULL_DEVICE: &str = "/dev/full";

#[cfg(target_os = "linux")]
#[test]
fn test_failed_append_does_not_advance_size() {
    if !Path::new(FULL_DEVICE).exists() {
        return;
    }
    let store = Store::open(Path::new(FULL_DEVICE)).unwrap();

    // Larger than the write buffer, so it goes straight to the device
    let result = store.append(&vec![1u8; 64 * 1024]);

    assert!(matches!(result, Err(LogError::Io(_))));
    assert_eq!(store.size(), 0);
    assert_eq!(store.append(PAYLOAD).unwrap(), (width(), 0));
}

#[cfg(target_os = "linux")]
#[test]
fn test_failed_append_keeps_earlier_buffered_frames() {
    if !Path::new(FULL_DEVICE).exists() {
        return;
    }
    let store = Store::open(Path::new(FULL_DEVICE)).unwrap();
    assert_eq!(store.append(PAYLOAD).unwrap(), (width(), 0));

    // Flushing the buffered frame fails first
    let result = store.append(&vec![1u8; 64 * 1024]);

    assert!(matches!(result, Err(LogError::Io(_))));
    assert_eq!(store.size(), width());
    assert_eq!(store.append(PAYLOAD).unwrap(), (width(), width()));
}
