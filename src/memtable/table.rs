//! MemTable implementation
//!
//! BTreeMap-based memtable with RwLock for concurrency.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::types::{IndexEntry, ValuePointer};

/// Bytes charged per write on top of the key: kind (1) + offset (8) + len (4)
/// + key length prefix (4), the same as one segment data record.
pub const ENTRY_OVERHEAD: usize = 17;

/// In-memory table for recent writes
///
/// `size` counts the bytes of every write since the last `clear`, overwrites
/// included, so it only grows between flushes.
pub struct MemTable {
    data: RwLock<BTreeMap<Vec<u8>, IndexEntry>>,
    size: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            size: AtomicUsize::new(0),
        }
    }

    /// Get the entry for a key (read lock)
    pub fn get(&self, key: &[u8]) -> Option<IndexEntry> {
        self.data.read().get(key).copied()
    }

    /// Map a key to a value pointer, returning the new size
    pub fn put(&self, key: Vec<u8>, ptr: ValuePointer) -> usize {
        self.insert(key, IndexEntry::Value(ptr))
    }

    /// Record a tombstone for a key, returning the new size
    pub fn delete(&self, key: Vec<u8>) -> usize {
        self.insert(key, IndexEntry::Tombstone)
    }

    fn insert(&self, key: Vec<u8>, entry: IndexEntry) -> usize {
        let charge = key.len() + ENTRY_OVERHEAD;
        let mut data = self.data.write();
        data.insert(key, entry);
        self.size.fetch_add(charge, Ordering::SeqCst) + charge
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    /// Get entry count
    pub fn entry_count(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Snapshot of all entries in sorted key order (for flush)
    pub fn iter(&self) -> std::vec::IntoIter<(Vec<u8>, IndexEntry)> {
        self.data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Entries whose key starts with `prefix`, in sorted order
    pub fn entries_with_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, IndexEntry)> {
        self.data
            .read()
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// Clear all entries (after successful flush)
    pub fn clear(&self) {
        let mut data = self.data.write();
        data.clear();
        self.size.store(0, Ordering::SeqCst);
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}
