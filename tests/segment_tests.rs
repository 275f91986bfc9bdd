//! Tests for segment files
//!
//! These tests verify:
//! - Building segments and reading them back
//! - Tombstones survive the round trip as tombstones
//! - Key order is enforced by the builder
//! - Damaged files are rejected at open

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use wisckv::index::{SegmentBuilder, SegmentMeta, SegmentReader};
use wisckv::{IndexEntry, ValuePointer, WiscError};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_segment() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("segment_000001.seg");
    (temp_dir, path)
}

fn ptr(offset: u64, len: u32) -> ValuePointer {
    ValuePointer::new(offset, len)
}

/// apple → value, banana → tombstone, cherry → value
fn build_fruit_segment(path: &Path) -> SegmentMeta {
    let mut builder = SegmentBuilder::new(path, 1).unwrap();
    builder.add(b"apple", ptr(0, 5)).unwrap();
    builder.add_tombstone(b"banana").unwrap();
    builder.add(b"cherry", ptr(5, 6)).unwrap();
    assert_eq!(builder.entry_count(), 3);
    builder.finish().unwrap()
}

// =============================================================================
// Build and Read Tests
// =============================================================================

#[test]
fn test_build_and_read() {
    let (_temp, path) = setup_temp_segment();
    let meta = build_fruit_segment(&path);

    assert_eq!(meta.id, 1);
    assert_eq!(meta.entry_count, 3);
    assert_eq!(meta.min_key, b"apple".to_vec());
    assert_eq!(meta.max_key, b"cherry".to_vec());
    assert_eq!(meta.file_size, fs::metadata(&path).unwrap().len());

    let reader = SegmentReader::open(&path, 1).unwrap();
    assert_eq!(reader.id(), 1);
    assert_eq!(reader.entry_count(), 3);
    assert_eq!(reader.get(b"apple").unwrap(), Some(IndexEntry::Value(ptr(0, 5))));
    assert_eq!(reader.get(b"cherry").unwrap(), Some(IndexEntry::Value(ptr(5, 6))));
}

#[test]
fn test_get_missing_key() {
    let (_temp, path) = setup_temp_segment();
    build_fruit_segment(&path);

    let reader = SegmentReader::open(&path, 1).unwrap();
    assert_eq!(reader.get(b"aardvark").unwrap(), None);
    assert_eq!(reader.get(b"blueberry").unwrap(), None);
    assert_eq!(reader.get(b"zucchini").unwrap(), None);
}

#[test]
fn test_tombstone_round_trip() {
    let (_temp, path) = setup_temp_segment();
    build_fruit_segment(&path);

    let reader = SegmentReader::open(&path, 1).unwrap();
    assert_eq!(reader.get(b"banana").unwrap(), Some(IndexEntry::Tombstone));
}

#[test]
fn test_empty_value_pointer_is_not_a_tombstone() {
    let (_temp, path) = setup_temp_segment();
    let mut builder = SegmentBuilder::new(&path, 1).unwrap();
    builder.add(b"empty", ptr(42, 0)).unwrap();
    builder.finish().unwrap();

    let reader = SegmentReader::open(&path, 1).unwrap();
    let entry = reader.get(b"empty").unwrap().unwrap();
    assert!(!entry.is_tombstone());
    assert_eq!(entry.pointer(), Some(ptr(42, 0)));
}

#[test]
fn test_entries_in_key_order() {
    let (_temp, path) = setup_temp_segment();
    build_fruit_segment(&path);

    let reader = SegmentReader::open(&path, 1).unwrap();
    let entries = reader.entries().unwrap();

    assert_eq!(
        entries,
        vec![
            (b"apple".to_vec(), IndexEntry::Value(ptr(0, 5))),
            (b"banana".to_vec(), IndexEntry::Tombstone),
            (b"cherry".to_vec(), IndexEntry::Value(ptr(5, 6))),
        ]
    );
}

#[test]
fn test_entries_with_prefix() {
    let (_temp, path) = setup_temp_segment();
    let mut builder = SegmentBuilder::new(&path, 7).unwrap();
    for (i, key) in ["item:1", "user:1", "user:2", "users"].iter().enumerate() {
        builder.add(key.as_bytes(), ptr(i as u64, 1)).unwrap();
    }
    builder.finish().unwrap();

    let reader = SegmentReader::open(&path, 7).unwrap();
    let keys: Vec<Vec<u8>> = reader
        .entries_with_prefix(b"user:")
        .unwrap()
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec![b"user:1".to_vec(), b"user:2".to_vec()]);

    assert_eq!(reader.entries_with_prefix(b"").unwrap().len(), 4);
    assert!(reader.entries_with_prefix(b"zebra").unwrap().is_empty());
}

#[test]
fn test_min_max_and_might_contain() {
    let (_temp, path) = setup_temp_segment();
    let meta = build_fruit_segment(&path);
    let reader = SegmentReader::open(&path, 1).unwrap();

    assert_eq!(reader.min_key(), Some(&b"apple"[..]));
    assert_eq!(reader.max_key(), Some(&b"cherry"[..]));

    assert!(reader.might_contain(b"blueberry"));
    assert!(!reader.might_contain(b"aaa"));
    assert!(!reader.might_contain(b"date"));
    assert_eq!(meta.min_key, b"apple".to_vec());
    assert_eq!(meta.max_key, b"cherry".to_vec());
}

#[test]
fn test_empty_segment() {
    let (_temp, path) = setup_temp_segment();
    let meta = SegmentBuilder::new(&path, 1).unwrap().finish().unwrap();
    assert_eq!(meta.entry_count, 0);

    let reader = SegmentReader::open(&path, 1).unwrap();
    assert_eq!(reader.entry_count(), 0);
    assert!(reader.entries().unwrap().is_empty());
    assert!(!reader.might_contain(b"anything"));
}

// =============================================================================
// Builder Ordering Tests
// =============================================================================

#[test]
fn test_builder_rejects_out_of_order_keys() {
    let (_temp, path) = setup_temp_segment();
    let mut builder = SegmentBuilder::new(&path, 1).unwrap();

    builder.add(b"m", ptr(0, 1)).unwrap();
    assert!(builder.add(b"a", ptr(1, 1)).is_err());
    assert!(builder.add_tombstone(b"m").is_err());
    assert!(builder.add(b"z", ptr(1, 1)).is_ok());
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_corrupted_data_block_fails_open() {
    let (_temp, path) = setup_temp_segment();
    build_fruit_segment(&path);

    let mut bytes = fs::read(&path).unwrap();
    bytes[20] ^= 0x01;
    fs::write(&path, &bytes).unwrap();

    let result = SegmentReader::open(&path, 1);
    assert!(matches!(result, Err(WiscError::CorruptData(_))));
}

#[test]
fn test_corrupted_index_block_fails_open() {
    let (_temp, path) = setup_temp_segment();
    build_fruit_segment(&path);

    // Last byte of the index block sits just before the footer
    let mut bytes = fs::read(&path).unwrap();
    let pos = bytes.len() - 17;
    bytes[pos] ^= 0x01;
    fs::write(&path, &bytes).unwrap();

    let result = SegmentReader::open(&path, 1);
    assert!(matches!(result, Err(WiscError::CorruptData(_))));
}

#[test]
fn test_bad_magic_fails_open() {
    let (_temp, path) = setup_temp_segment();
    build_fruit_segment(&path);

    let mut bytes = fs::read(&path).unwrap();
    bytes[0..4].copy_from_slice(b"NOPE");
    fs::write(&path, &bytes).unwrap();

    let result = SegmentReader::open(&path, 1);
    assert!(matches!(result, Err(WiscError::CorruptData(_))));
}

#[test]
fn test_truncated_file_fails_open() {
    let (_temp, path) = setup_temp_segment();
    fs::write(&path, b"WKSG").unwrap();

    let result = SegmentReader::open(&path, 1);
    assert!(matches!(result, Err(WiscError::CorruptData(_))));
}
