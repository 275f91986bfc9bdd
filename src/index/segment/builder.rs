//! Segment Builder
//!
//! Writes sorted index entries to a new segment file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, WiscError};
use crate::types::{IndexEntry, ValuePointer};

use super::{encode_record_header, SegmentMeta, HEADER_SIZE, MAGIC, RECORD_HEADER_SIZE, VERSION};

/// Builder for creating new segments from sorted entries
pub struct SegmentBuilder {
    id: u64,
    path: PathBuf,
    writer: BufWriter<File>,
    entry_count: u64,
    /// Current write position (for index)
    current_offset: u64,
    /// Index: key → file offset of entry
    index: Vec<(Vec<u8>, u64)>,
    data_hasher: crc32fast::Hasher,
}

impl SegmentBuilder {
    /// Create a new segment builder
    ///
    /// Writes header immediately; call `add()`/`add_tombstone()` in strictly
    /// increasing key order, then `finish()` to write index and footer.
    pub fn new(path: &Path, id: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = BufWriter::new(file);

        // Entry count is patched in finish()
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&0u64.to_le_bytes())?;

        Ok(Self {
            id,
            path: path.to_path_buf(),
            writer,
            entry_count: 0,
            current_offset: HEADER_SIZE,
            index: Vec::new(),
            data_hasher: crc32fast::Hasher::new(),
        })
    }

    /// Add a key → value pointer mapping
    pub fn add(&mut self, key: &[u8], ptr: ValuePointer) -> Result<()> {
        self.add_entry(key, &IndexEntry::Value(ptr))
    }

    /// Add a tombstone
    pub fn add_tombstone(&mut self, key: &[u8]) -> Result<()> {
        self.add_entry(key, &IndexEntry::Tombstone)
    }

    /// Add any entry (must be called in strictly increasing key order)
    pub fn add_entry(&mut self, key: &[u8], entry: &IndexEntry) -> Result<()> {
        if let Some((last, _)) = self.index.last() {
            if key <= last.as_slice() {
                return Err(WiscError::CorruptData(format!(
                    "segment keys out of order: {:?} after {:?}",
                    String::from_utf8_lossy(key),
                    String::from_utf8_lossy(last)
                )));
            }
        }

        let key_len = u32::try_from(key.len())
            .map_err(|_| WiscError::KeyTooLong { len: key.len(), max: u32::MAX as usize })?;

        self.index.push((key.to_vec(), self.current_offset));

        let header = encode_record_header(key_len, entry);
        self.writer.write_all(&header)?;
        self.writer.write_all(key)?;
        self.data_hasher.update(&header);
        self.data_hasher.update(key);

        self.current_offset += (RECORD_HEADER_SIZE + key.len()) as u64;
        self.entry_count += 1;
        Ok(())
    }

    /// Number of entries added so far
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Finish building: write index block and footer, fsync, return metadata
    pub fn finish(mut self) -> Result<SegmentMeta> {
        let index_offset = self.current_offset;

        // Index block: [key_len(4)][offset(8)][key] for each entry
        let mut index_hasher = crc32fast::Hasher::new();
        for (key, offset) in &self.index {
            let key_len = (key.len() as u32).to_le_bytes();
            let offset = offset.to_le_bytes();
            self.writer.write_all(&key_len)?;
            self.writer.write_all(&offset)?;
            self.writer.write_all(key)?;
            index_hasher.update(&key_len);
            index_hasher.update(&offset);
            index_hasher.update(key);
        }

        let data_crc = self.data_hasher.finalize();
        let index_crc = index_hasher.finalize();

        self.writer.write_all(&index_offset.to_le_bytes())?;
        self.writer.write_all(&data_crc.to_le_bytes())?;
        self.writer.write_all(&index_crc.to_le_bytes())?;
        self.writer.flush()?;

        let mut file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.seek(SeekFrom::Start(6))?; // After magic + version
        file.write_all(&self.entry_count.to_le_bytes())?;
        file.sync_all()?;

        let file_size = file.metadata()?.len();
        let min_key = self.index.first().map(|(k, _)| k.clone()).unwrap_or_default();
        let max_key = self.index.last().map(|(k, _)| k.clone()).unwrap_or_default();

        Ok(SegmentMeta {
            id: self.id,
            path: self.path,
            entry_count: self.entry_count,
            min_key,
            max_key,
            file_size,
        })
    }
}
