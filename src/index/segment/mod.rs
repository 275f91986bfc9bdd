//! Segment Module
//!
//! Immutable on-disk sorted mapping from key to value pointer or tombstone.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic: "WKSG" (4) | Version: u16 (2) | Count: u64 (8) │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                   │
//! │   [KeyLen: u32][Kind: u8][ValOffset: u64][ValLen: u32]  │
//! │   [Key]                                                 │
//! │   ... repeated for each entry, sorted by key ...        │
//! │   (Kind 0 = tombstone, offset/len are zero)             │
//! ├─────────────────────────────────────────────────────────┤
//! │ Index Block (variable)                                  │
//! │   [KeyLen: u32][Offset: u64][Key]                       │
//! │   ... repeated for each entry ...                       │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (16 bytes)                                       │
//! │   IndexOffset: u64 (8) | DataCRC: u32 (4) | IndexCRC (4)│
//! └─────────────────────────────────────────────────────────┘
//! ```

mod builder;
mod iterator;
mod reader;

use std::path::{Path, PathBuf};

pub use builder::SegmentBuilder;
pub use iterator::SegmentIterator;
pub use reader::SegmentReader;

use crate::error::{Result, WiscError};
use crate::types::{IndexEntry, ValuePointer};

// =============================================================================
// Shared Constants (used by builder, reader, iterator)
// =============================================================================

/// Magic bytes identifying a WiscKV segment file
pub(crate) const MAGIC: &[u8; 4] = b"WKSG";

/// Current segment format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + EntryCount (8) = 14 bytes
pub(crate) const HEADER_SIZE: u64 = 14;

/// Footer size: IndexOffset (8) + DataCRC (4) + IndexCRC (4) = 16 bytes
pub(crate) const FOOTER_SIZE: u64 = 16;

/// Fixed part of a data record: KeyLen (4) + Kind (1) + ValOffset (8) + ValLen (4)
pub(crate) const RECORD_HEADER_SIZE: usize = 17;

pub(crate) const KIND_TOMBSTONE: u8 = 0;
pub(crate) const KIND_VALUE: u8 = 1;

/// Encode the fixed part of a data record
pub(crate) fn encode_record_header(key_len: u32, entry: &IndexEntry) -> [u8; RECORD_HEADER_SIZE] {
    let mut buf = [0u8; RECORD_HEADER_SIZE];
    buf[0..4].copy_from_slice(&key_len.to_le_bytes());
    match entry {
        IndexEntry::Value(ptr) => {
            buf[4] = KIND_VALUE;
            buf[5..13].copy_from_slice(&ptr.offset.to_le_bytes());
            buf[13..17].copy_from_slice(&ptr.len.to_le_bytes());
        }
        IndexEntry::Tombstone => buf[4] = KIND_TOMBSTONE,
    }
    buf
}

/// Decode the fixed part of a data record into (key length, entry)
pub(crate) fn decode_record_header(buf: &[u8; RECORD_HEADER_SIZE]) -> Result<(usize, IndexEntry)> {
    let key_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let entry = match buf[4] {
        KIND_TOMBSTONE => IndexEntry::Tombstone,
        KIND_VALUE => {
            let mut offset = [0u8; 8];
            offset.copy_from_slice(&buf[5..13]);
            let len = u32::from_le_bytes([buf[13], buf[14], buf[15], buf[16]]);
            IndexEntry::Value(ValuePointer::new(u64::from_le_bytes(offset), len))
        }
        kind => {
            return Err(WiscError::CorruptData(format!(
                "unknown segment record kind {}",
                kind
            )))
        }
    };
    Ok((key_len, entry))
}

// =============================================================================
// Segment Metadata
// =============================================================================

/// Segment metadata, returned when a segment is written
#[derive(Debug, Clone)]
pub struct SegmentMeta {
    /// Segment id (also encoded in the file name)
    pub id: u64,
    /// Path to the segment file
    pub path: PathBuf,
    /// Number of entries in this segment
    pub entry_count: u64,
    /// Smallest key
    pub min_key: Vec<u8>,
    /// Largest key
    pub max_key: Vec<u8>,
    /// File size in bytes
    pub file_size: u64,
}

/// File name for a segment id
pub(crate) fn segment_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(format!("segment_{:06}.seg", id))
}

/// Parse a segment id from a file name
/// "segment_000042.seg" → Some(42)
pub(crate) fn parse_segment_id(path: &Path) -> Option<u64> {
    if path.extension()? != "seg" {
        return None;
    }
    let name = path.file_stem()?.to_string_lossy();
    let id_str = name.strip_prefix("segment_")?;
    id_str.parse().ok()
}
