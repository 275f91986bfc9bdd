//! Segment Iterator
//!
//! Sequential iteration over the data block of a segment.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

use crate::error::{Result, WiscError};
use crate::types::IndexEntry;

use super::{decode_record_header, RECORD_HEADER_SIZE};

/// Iterator over segment entries in sorted key order
pub struct SegmentIterator<'a> {
    file: &'a mut BufReader<File>,
    /// Stop reading when we reach this offset (start of index block)
    end_offset: u64,
    /// Current position in file
    current_offset: u64,
    failed: bool,
}

impl<'a> SegmentIterator<'a> {
    /// Create an iterator starting at `start_offset` inside the data block
    pub(super) fn new(
        file: &'a mut BufReader<File>,
        start_offset: u64,
        end_offset: u64,
    ) -> Result<Self> {
        file.seek(SeekFrom::Start(start_offset))?;
        Ok(Self {
            file,
            end_offset,
            current_offset: start_offset,
            failed: false,
        })
    }

    fn read_entry(&mut self) -> Result<(Vec<u8>, IndexEntry)> {
        let mut header = [0u8; RECORD_HEADER_SIZE];
        self.file.read_exact(&mut header)?;
        let (key_len, entry) = decode_record_header(&header)?;

        let entry_end = self.current_offset + (RECORD_HEADER_SIZE + key_len) as u64;
        if entry_end > self.end_offset {
            return Err(WiscError::CorruptData(format!(
                "segment record at {} runs past the data block",
                self.current_offset
            )));
        }

        let mut key = vec![0u8; key_len];
        self.file.read_exact(&mut key)?;
        self.current_offset = entry_end;
        Ok((key, entry))
    }
}

impl Iterator for SegmentIterator<'_> {
    type Item = Result<(Vec<u8>, IndexEntry)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.current_offset >= self.end_offset {
            return None;
        }

        let item = self.read_entry();
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}
