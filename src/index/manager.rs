//! Index Manager
//!
//! Owns the memtable plus the persisted segments and resolves keys to value
//! pointers.
//!
//! ## Responsibilities
//! - Discover live segments on startup (via the manifest)
//! - Resolve keys: memtable first, then segments newest → oldest
//! - Flush the memtable into a new segment
//! - Compact segments once there are too many

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::memtable::MemTable;
use crate::types::{IndexEntry, ValuePointer};

use super::manifest::Manifest;
use super::segment::{parse_segment_id, segment_path, SegmentBuilder, SegmentMeta, SegmentReader};

/// Manages the memtable and the segment set
///
/// ## Concurrency:
/// - `segments`: RwLock around a list of shared readers; lookups clone the
///   list and release the lock before doing I/O, flush and compaction swap
///   it under the write lock
/// - `manifest`: Mutex held for the whole of a flush or compaction, so
///   maintenance operations never interleave
/// - Lookups read the memtable BEFORE snapshotting segments. Flush publishes
///   the new segment before clearing the memtable, so every entry is always
///   visible in at least one of the two.
pub struct IndexManager {
    /// Directory where segments and the manifest are stored
    dir: PathBuf,

    /// Live memtable
    memtable: MemTable,

    /// Open segment readers, ordered newest → oldest
    segments: RwLock<Vec<Arc<SegmentReader>>>,

    /// Committed segment set; also serializes maintenance
    manifest: Mutex<Manifest>,

    /// Segment count that triggers compaction
    compaction_threshold: usize,
}

impl IndexManager {
    /// Open or create the index in the given directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Load the manifest, or adopt existing segment files if there is none
    /// 3. Delete segment files the manifest does not list
    /// 4. Open readers for each live segment (newest first)
    pub fn open(path: &Path, compaction_threshold: usize) -> Result<Self> {
        fs::create_dir_all(path)?;

        let discovered = Self::discover_segment_ids(path)?;

        let manifest = match Manifest::load(path)? {
            Some(mut manifest) => {
                let max_listed = manifest.segments.iter().copied().max().unwrap_or(0);
                manifest.next_segment_id = manifest.next_segment_id.max(max_listed + 1);
                manifest
            }
            None => {
                // No manifest yet: adopt whatever segments exist, in id order
                let mut ids = discovered.clone();
                ids.sort_unstable();
                let manifest = Manifest {
                    next_segment_id: ids.last().map(|&id| id + 1).unwrap_or(1),
                    segments: ids,
                };
                manifest.save(path)?;
                manifest
            }
        };

        // Orphans from an interrupted flush or compaction
        let live: HashSet<u64> = manifest.segments.iter().copied().collect();
        for id in discovered.into_iter().filter(|id| !live.contains(id)) {
            Self::remove_file(&segment_path(path, id));
        }
        let tmp = Manifest::tmp_path(path);
        if tmp.exists() {
            Self::remove_file(&tmp);
        }

        let mut segments = Vec::with_capacity(manifest.segments.len());
        for &id in manifest.segments.iter().rev() {
            let reader = SegmentReader::open(&segment_path(path, id), id)?;
            segments.push(Arc::new(reader));
        }

        info!(
            dir = %path.display(),
            segments = segments.len(),
            next_segment_id = manifest.next_segment_id,
            "index opened"
        );

        Ok(Self {
            dir: path.to_path_buf(),
            memtable: MemTable::new(),
            segments: RwLock::new(segments),
            manifest: Mutex::new(manifest),
            compaction_threshold,
        })
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Resolve a key
    ///
    /// Returns:
    /// - `Ok(Some(IndexEntry::Value(ptr)))`: live value
    /// - `Ok(Some(IndexEntry::Tombstone))`: deleted
    /// - `Ok(None)`: never written (or dropped by compaction)
    pub fn resolve(&self, key: &[u8]) -> Result<Option<IndexEntry>> {
        if let Some(entry) = self.memtable.get(key) {
            return Ok(Some(entry));
        }

        for reader in self.snapshot() {
            if !reader.might_contain(key) {
                continue;
            }
            if let Some(entry) = reader.get(key)? {
                return Ok(Some(entry));
            }
        }

        Ok(None)
    }

    /// All live keys in sorted order
    pub fn keys(&self) -> Result<Vec<Vec<u8>>> {
        self.keys_with_prefix(b"")
    }

    /// Live keys starting with `prefix`, in sorted order
    ///
    /// Layers are merged oldest → newest so newer entries shadow older ones,
    /// then tombstones are dropped.
    pub fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let recent = self.memtable.entries_with_prefix(prefix);
        let segments = self.snapshot();

        let mut merged: BTreeMap<Vec<u8>, IndexEntry> = BTreeMap::new();
        for reader in segments.iter().rev() {
            merged.extend(reader.entries_with_prefix(prefix)?);
        }
        merged.extend(recent);

        Ok(merged
            .into_iter()
            .filter(|(_, entry)| !entry.is_tombstone())
            .map(|(key, _)| key)
            .collect())
    }

    // =========================================================================
    // Mutations (memtable only)
    // =========================================================================

    /// Map a key to a value pointer, returning the memtable size
    pub fn put(&self, key: &[u8], ptr: ValuePointer) -> usize {
        self.memtable.put(key.to_vec(), ptr)
    }

    /// Record a tombstone, returning the memtable size
    pub fn put_tombstone(&self, key: &[u8]) -> usize {
        self.memtable.delete(key.to_vec())
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Flush the memtable to a new segment
    ///
    /// Steps:
    /// 1. Write and fsync the segment file
    /// 2. Commit it to the manifest
    /// 3. Publish the reader (newest first)
    /// 4. Clear the memtable
    ///
    /// Returns `None` when the memtable is empty. Callers must keep `put`s
    /// out for the duration (the engine holds its write lock).
    pub fn flush(&self) -> Result<Option<SegmentMeta>> {
        let mut manifest = self.manifest.lock();

        if self.memtable.is_empty() {
            return Ok(None);
        }

        let id = manifest.next_segment_id;
        let path = segment_path(&self.dir, id);

        let (meta, reader) = match Self::write_segment(&path, id, self.memtable.iter()) {
            Ok(written) => written,
            Err(e) => {
                Self::remove_file(&path);
                return Err(e);
            }
        };

        let mut next = manifest.clone();
        next.next_segment_id = id + 1;
        next.segments.push(id);
        if let Err(e) = next.save(&self.dir) {
            Self::remove_file(&path);
            return Err(e);
        }
        *manifest = next;

        self.segments.write().insert(0, Arc::new(reader));
        self.memtable.clear();

        info!(
            segment = id,
            entries = meta.entry_count,
            bytes = meta.file_size,
            "memtable flushed"
        );
        Ok(Some(meta))
    }

    /// Compact if the segment count has reached the threshold
    ///
    /// Returns whether a compaction ran.
    pub fn compaction_check(&self) -> Result<bool> {
        let count = self.segment_count();
        if count < self.compaction_threshold {
            return Ok(false);
        }
        debug!(segments = count, threshold = self.compaction_threshold, "compaction triggered");
        self.compact()?;
        Ok(true)
    }

    /// Merge every segment into one
    ///
    /// Newer entries win. Tombstones are dropped: the oldest segment takes
    /// part in the merge, so there is nothing older left for them to hide.
    /// Returns the merged segment, or `None` if nothing survived the merge.
    pub fn compact(&self) -> Result<Option<SegmentMeta>> {
        let mut manifest = self.manifest.lock();

        let inputs = self.snapshot();
        if inputs.is_empty() {
            return Ok(None);
        }

        let mut merged: BTreeMap<Vec<u8>, IndexEntry> = BTreeMap::new();
        let mut input_entries = 0usize;
        for reader in inputs.iter().rev() {
            let entries = reader.entries()?;
            input_entries += entries.len();
            merged.extend(entries);
        }
        merged.retain(|_, entry| !entry.is_tombstone());

        let input_ids: HashSet<u64> = inputs.iter().map(|r| r.id()).collect();
        let mut next = manifest.clone();
        next.segments.retain(|id| !input_ids.contains(id));

        let output = if merged.is_empty() {
            None
        } else {
            let id = next.next_segment_id;
            let path = segment_path(&self.dir, id);
            match Self::write_segment(&path, id, merged.into_iter()) {
                Ok(written) => {
                    next.next_segment_id = id + 1;
                    // Oldest position: everything it replaces was older than
                    // any segment outside the merge.
                    next.segments.insert(0, id);
                    Some(written)
                }
                Err(e) => {
                    Self::remove_file(&path);
                    return Err(e);
                }
            }
        };

        if let Err(e) = next.save(&self.dir) {
            if let Some((meta, _)) = &output {
                Self::remove_file(&meta.path);
            }
            return Err(e);
        }
        *manifest = next;

        let meta = {
            let mut segments = self.segments.write();
            segments.retain(|r| !input_ids.contains(&r.id()));
            output.map(|(meta, reader)| {
                segments.push(Arc::new(reader));
                meta
            })
        };

        for reader in &inputs {
            Self::remove_file(reader.path());
        }

        info!(
            inputs = inputs.len(),
            input_entries,
            output_entries = meta.as_ref().map(|m| m.entry_count).unwrap_or(0),
            "segments compacted"
        );
        Ok(meta)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Memtable size in bytes
    pub fn memtable_size(&self) -> usize {
        self.memtable.size()
    }

    /// Memtable entry count
    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    /// Get the number of segments
    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    /// Ids of live segments, oldest first
    pub fn segment_ids(&self) -> Vec<u64> {
        self.manifest.lock().segments.clone()
    }

    /// Get the index directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Release segment readers. The memtable is NOT flushed.
    pub fn close(self) -> Result<()> {
        debug!(
            unflushed_entries = self.memtable.entry_count(),
            "index closed"
        );
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn snapshot(&self) -> Vec<Arc<SegmentReader>> {
        self.segments.read().clone()
    }

    fn write_segment(
        path: &Path,
        id: u64,
        entries: impl Iterator<Item = (Vec<u8>, IndexEntry)>,
    ) -> Result<(SegmentMeta, SegmentReader)> {
        let mut builder = SegmentBuilder::new(path, id)?;
        for (key, entry) in entries {
            builder.add_entry(&key, &entry)?;
        }
        let meta = builder.finish()?;
        let reader = SegmentReader::open(path, id)?;
        Ok((meta, reader))
    }

    fn discover_segment_ids(dir: &Path) -> Result<Vec<u64>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(dir)? {
            let file_path = entry?.path();
            if file_path.is_file() {
                if let Some(id) = parse_segment_id(&file_path) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    fn remove_file(path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "failed to remove obsolete file");
            }
        }
    }
}
