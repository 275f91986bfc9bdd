//! Segment Reader
//!
//! Opens segment files and provides O(log n) key lookups via in-memory index.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Result, WiscError};
use crate::types::IndexEntry;

use super::iterator::SegmentIterator;
use super::{decode_record_header, FOOTER_SIZE, HEADER_SIZE, MAGIC, RECORD_HEADER_SIZE, VERSION};

/// Reader for segment files with in-memory key index
///
/// The file handle sits behind a Mutex so lookups only need `&self`; the
/// manager can share readers between concurrent lookups.
pub struct SegmentReader {
    id: u64,
    path: PathBuf,
    file: Mutex<BufReader<File>>,
    /// In-memory index: key → file offset of its data record
    index: BTreeMap<Vec<u8>, u64>,
    entry_count: u64,
    /// Index block starting offset (end of the data block)
    index_offset: u64,
}

fn read_u64(buf: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[..8]);
    u64::from_le_bytes(bytes)
}

fn read_u32(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

impl SegmentReader {
    /// Open a segment for reading
    ///
    /// Validates header and footer, verifies both checksums, and loads the
    /// index block into memory.
    pub fn open(path: &Path, id: u64) -> Result<Self> {
        let corrupt = |msg: String| WiscError::CorruptData(format!("{}: {}", path.display(), msg));

        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();
        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(corrupt(format!("file too small ({} bytes)", file_size)));
        }

        // Header
        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(corrupt(format!(
                "invalid magic: expected WKSG, got {:?}",
                &header[0..4]
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(corrupt(format!("unsupported version {}", version)));
        }

        let entry_count = read_u64(&header[6..14]);

        // Footer
        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;

        let index_offset = read_u64(&footer[0..8]);
        let data_crc = read_u32(&footer[8..12]);
        let index_crc = read_u32(&footer[12..16]);

        if index_offset < HEADER_SIZE || index_offset > file_size - FOOTER_SIZE {
            return Err(corrupt(format!("index offset {} out of bounds", index_offset)));
        }

        // Data block checksum
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        let mut data = vec![0u8; (index_offset - HEADER_SIZE) as usize];
        file.read_exact(&mut data)?;
        if crc32fast::hash(&data) != data_crc {
            return Err(corrupt("data block checksum mismatch".into()));
        }
        drop(data);

        // Index block
        let mut index_data = vec![0u8; (file_size - FOOTER_SIZE - index_offset) as usize];
        file.read_exact(&mut index_data)?;
        if crc32fast::hash(&index_data) != index_crc {
            return Err(corrupt("index block checksum mismatch".into()));
        }

        // Parse index entries: [key_len(4)][offset(8)][key]
        let mut index = BTreeMap::new();
        let mut pos = 0;
        while pos < index_data.len() {
            if pos + 12 > index_data.len() {
                return Err(corrupt("truncated index entry".into()));
            }
            let key_len = read_u32(&index_data[pos..]) as usize;
            let offset = read_u64(&index_data[pos + 4..]);
            pos += 12;

            if pos + key_len > index_data.len() {
                return Err(corrupt("index key runs past index block".into()));
            }
            if offset < HEADER_SIZE || offset >= index_offset {
                return Err(corrupt(format!("index points outside data block: {}", offset)));
            }
            index.insert(index_data[pos..pos + key_len].to_vec(), offset);
            pos += key_len;
        }

        if index.len() as u64 != entry_count {
            return Err(corrupt(format!(
                "header claims {} entries, index holds {}",
                entry_count,
                index.len()
            )));
        }

        Ok(Self {
            id,
            path: path.to_path_buf(),
            file: Mutex::new(BufReader::new(file)),
            index,
            entry_count,
            index_offset,
        })
    }

    /// Look up a key in O(log n) via the in-memory index
    ///
    /// Returns:
    /// - `Ok(Some(entry))`: key present (value pointer or tombstone)
    /// - `Ok(None)`: key not in this segment
    pub fn get(&self, key: &[u8]) -> Result<Option<IndexEntry>> {
        let offset = match self.index.get(key) {
            Some(&off) => off,
            None => return Ok(None),
        };

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; RECORD_HEADER_SIZE];
        file.read_exact(&mut header)?;
        let (key_len, entry) = decode_record_header(&header)?;

        if key_len != key.len() {
            return Err(WiscError::CorruptData(format!(
                "{}: record at {} does not match its index key",
                self.path.display(),
                offset
            )));
        }

        Ok(Some(entry))
    }

    /// All entries in key order
    pub fn entries(&self) -> Result<Vec<(Vec<u8>, IndexEntry)>> {
        let mut file = self.file.lock();
        let iter = SegmentIterator::new(&mut file, HEADER_SIZE, self.index_offset)?;
        iter.collect()
    }

    /// Entries whose key starts with `prefix`, in key order
    pub fn entries_with_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, IndexEntry)>> {
        let start = match self.index.range(prefix.to_vec()..).next() {
            Some((key, &offset)) if key.starts_with(prefix) => offset,
            _ => return Ok(Vec::new()),
        };

        let mut file = self.file.lock();
        let mut out = Vec::new();
        for item in SegmentIterator::new(&mut file, start, self.index_offset)? {
            let (key, entry) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key, entry));
        }
        Ok(out)
    }

    /// Segment id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Path of the segment file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get entry count
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Get the minimum key in this segment
    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.keys().next().map(|k| k.as_slice())
    }

    /// Get the maximum key in this segment
    pub fn max_key(&self) -> Option<&[u8]> {
        self.index.keys().next_back().map(|k| k.as_slice())
    }

    /// Quick check if a key might be in this segment (range check)
    pub fn might_contain(&self, key: &[u8]) -> bool {
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => key >= min && key <= max,
            _ => false,
        }
    }
}
