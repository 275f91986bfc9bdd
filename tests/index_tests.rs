//! Tests for IndexManager
//!
//! These tests verify:
//! - Key resolution across memtable and segments, newest wins
//! - Flush publishing segments through the manifest
//! - Compaction merging segments and dropping tombstones
//! - Segment order surviving reopen

use std::path::PathBuf;

use tempfile::TempDir;
use wisckv::index::{IndexManager, Manifest};
use wisckv::{IndexEntry, ValuePointer};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_index(compaction_threshold: usize) -> (TempDir, PathBuf, IndexManager) {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("segments");
    let index = IndexManager::open(&dir, compaction_threshold).unwrap();
    (temp_dir, dir, index)
}

fn ptr(offset: u64, len: u32) -> ValuePointer {
    ValuePointer::new(offset, len)
}

fn value(offset: u64, len: u32) -> Option<IndexEntry> {
    Some(IndexEntry::Value(ptr(offset, len)))
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_empty_creates_manifest() {
    let (_temp, dir, index) = setup_temp_index(8);

    assert!(dir.join("MANIFEST").exists());
    assert_eq!(index.segment_count(), 0);
    assert!(index.segment_ids().is_empty());
    assert_eq!(index.dir(), dir.as_path());

    let manifest = Manifest::load(&dir).unwrap().unwrap();
    assert_eq!(manifest.next_segment_id, 1);
    assert!(manifest.segments.is_empty());
}

// =============================================================================
// Resolve Tests
// =============================================================================

#[test]
fn test_resolve_from_memtable() {
    let (_temp, _dir, index) = setup_temp_index(8);

    index.put(b"a", ptr(0, 1));
    index.put_tombstone(b"b");

    assert_eq!(index.resolve(b"a").unwrap(), value(0, 1));
    assert_eq!(index.resolve(b"b").unwrap(), Some(IndexEntry::Tombstone));
    assert_eq!(index.resolve(b"c").unwrap(), None);
}

#[test]
fn test_flush_moves_memtable_to_segment() {
    let (_temp, dir, index) = setup_temp_index(8);

    index.put(b"a", ptr(0, 1));
    index.put(b"b", ptr(1, 1));
    let meta = index.flush().unwrap().unwrap();

    assert_eq!(meta.id, 1);
    assert_eq!(meta.entry_count, 2);
    assert!(meta.path.exists());
    assert_eq!(index.memtable_entry_count(), 0);
    assert_eq!(index.memtable_size(), 0);
    assert_eq!(index.segment_ids(), vec![1]);

    assert_eq!(index.resolve(b"a").unwrap(), value(0, 1));
    assert_eq!(Manifest::load(&dir).unwrap().unwrap().segments, vec![1]);
}

#[test]
fn test_flush_empty_memtable_is_noop() {
    let (_temp, _dir, index) = setup_temp_index(8);

    assert!(index.flush().unwrap().is_none());
    assert_eq!(index.segment_count(), 0);
}

#[test]
fn test_newest_segment_wins() {
    let (_temp, _dir, index) = setup_temp_index(8);

    index.put(b"key", ptr(0, 3));
    index.flush().unwrap();
    index.put(b"key", ptr(3, 4));
    index.flush().unwrap();

    assert_eq!(index.resolve(b"key").unwrap(), value(3, 4));
}

#[test]
fn test_memtable_tombstone_shadows_segment() {
    let (_temp, _dir, index) = setup_temp_index(8);

    index.put(b"key", ptr(0, 3));
    index.flush().unwrap();
    index.put_tombstone(b"key");

    assert_eq!(index.resolve(b"key").unwrap(), Some(IndexEntry::Tombstone));
    assert!(index.keys().unwrap().is_empty());
}

#[test]
fn test_keys_merge_layers_and_skip_tombstones() {
    let (_temp, _dir, index) = setup_temp_index(8);

    index.put(b"a", ptr(0, 1));
    index.put(b"b", ptr(1, 1));
    index.flush().unwrap();
    index.put_tombstone(b"a");
    index.put(b"c", ptr(2, 1));
    index.flush().unwrap();
    index.put(b"a", ptr(3, 1));
    index.put_tombstone(b"c");

    assert_eq!(index.keys().unwrap(), vec![b"a".to_vec(), b"b".to_vec()]);
    assert_eq!(index.keys_with_prefix(b"b").unwrap(), vec![b"b".to_vec()]);
    assert!(index.keys_with_prefix(b"c").unwrap().is_empty());
}

// =============================================================================
// Compaction Tests
// =============================================================================

#[test]
fn test_compaction_check_respects_threshold() {
    let (_temp, _dir, index) = setup_temp_index(3);

    for i in 0..2u64 {
        index.put(format!("k{}", i).as_bytes(), ptr(i, 1));
        index.flush().unwrap();
    }
    assert!(!index.compaction_check().unwrap());
    assert_eq!(index.segment_count(), 2);

    index.put(b"k2", ptr(2, 1));
    index.flush().unwrap();
    assert!(index.compaction_check().unwrap());
    assert_eq!(index.segment_count(), 1);

    for i in 0..3u64 {
        assert_eq!(index.resolve(format!("k{}", i).as_bytes()).unwrap(), value(i, 1));
    }
}

#[test]
fn test_compaction_drops_tombstones() {
    let (_temp, dir, index) = setup_temp_index(8);

    index.put(b"gone", ptr(0, 4));
    index.put(b"kept", ptr(4, 4));
    index.flush().unwrap();
    index.put_tombstone(b"gone");
    index.flush().unwrap();

    let meta = index.compact().unwrap().unwrap();
    assert_eq!(meta.entry_count, 1);
    assert_eq!(index.segment_ids(), vec![meta.id]);

    // Nothing left records the key at all
    assert_eq!(index.resolve(b"gone").unwrap(), None);
    assert_eq!(index.resolve(b"kept").unwrap(), value(4, 4));

    // Inputs are gone from disk
    assert!(!dir.join("segment_000001.seg").exists());
    assert!(!dir.join("segment_000002.seg").exists());
    assert!(meta.path.exists());
}

#[test]
fn test_compaction_of_only_tombstones_leaves_nothing() {
    let (_temp, _dir, index) = setup_temp_index(8);

    index.put(b"a", ptr(0, 1));
    index.flush().unwrap();
    index.put_tombstone(b"a");
    index.flush().unwrap();

    assert!(index.compact().unwrap().is_none());
    assert_eq!(index.segment_count(), 0);
    assert_eq!(index.resolve(b"a").unwrap(), None);
}

#[test]
fn test_compaction_keeps_memtable_shadowing() {
    let (_temp, _dir, index) = setup_temp_index(8);

    index.put(b"key", ptr(0, 1));
    index.flush().unwrap();
    index.put(b"key", ptr(1, 1));
    index.flush().unwrap();
    index.put(b"key", ptr(2, 1));

    index.compact().unwrap();

    assert_eq!(index.resolve(b"key").unwrap(), value(2, 1));
    assert_eq!(index.memtable_entry_count(), 1);
}

// =============================================================================
// Reopen Tests
// =============================================================================

#[test]
fn test_reopen_preserves_segment_order() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("segments");

    {
        let index = IndexManager::open(&dir, 8).unwrap();
        index.put(b"key", ptr(0, 1));
        index.flush().unwrap();
        index.put(b"key", ptr(1, 1));
        index.put(b"other", ptr(2, 1));
        index.flush().unwrap();
        index.put(b"lost", ptr(3, 1));
        index.close().unwrap();
    }

    let index = IndexManager::open(&dir, 8).unwrap();
    assert_eq!(index.segment_ids(), vec![1, 2]);
    assert_eq!(index.resolve(b"key").unwrap(), value(1, 1));
    assert_eq!(index.resolve(b"other").unwrap(), value(2, 1));

    // The memtable is never persisted by the index itself
    assert_eq!(index.resolve(b"lost").unwrap(), None);

    // New segments keep counting upward
    index.put(b"next", ptr(4, 1));
    let meta = index.flush().unwrap().unwrap();
    assert_eq!(meta.id, 3);
}

#[test]
fn test_reopen_after_compaction() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("segments");

    {
        let index = IndexManager::open(&dir, 8).unwrap();
        index.put(b"a", ptr(0, 1));
        index.flush().unwrap();
        index.put(b"b", ptr(1, 1));
        index.flush().unwrap();
        index.put(b"a", ptr(2, 1));
        index.flush().unwrap();
        index.compact().unwrap();
    }

    let index = IndexManager::open(&dir, 8).unwrap();
    assert_eq!(index.segment_ids(), vec![4]);
    assert_eq!(index.resolve(b"a").unwrap(), value(2, 1));
    assert_eq!(index.keys().unwrap(), vec![b"a".to_vec(), b"b".to_vec()]);
}
