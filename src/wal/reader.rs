//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs;
use std::path::Path;

use crate::error::{Result, WiscError};

use super::entry::Frame;
use super::WalEntry;

/// How the readable part of a WAL ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEnd {
    /// Every byte belonged to a valid entry
    Clean,

    /// The final record was cut short or torn by a crash mid-append
    TornTail {
        /// Length of the valid prefix
        valid_len: u64,
        /// Bytes after the valid prefix
        discarded: u64,
    },
}

/// Reads entries from the WAL file
///
/// Loads the entire file into memory, then decodes record by record.
pub struct WalReader {
    data: Vec<u8>,
    /// Largest payload length a header may declare
    max_payload: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_bytes(fs::read(path)?))
    }

    /// Build a reader over bytes already in memory
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            max_payload: u32::MAX as u64,
        }
    }

    /// Treat headers declaring more than `max_payload` bytes as corruption
    pub fn with_max_payload(mut self, max_payload: u64) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Total bytes in the log
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over all valid entries
    pub fn entries(&self) -> WalIterator<'_> {
        WalIterator {
            data: &self.data,
            max_payload: self.max_payload,
            offset: 0,
            last_lsn: 0,
            end: None,
            failed: false,
        }
    }
}

/// Iterator over WAL entries
///
/// Yields entries in log order. A torn final record (an incomplete header,
/// a valid header whose payload runs past the end of the file, or a bad
/// record checksum on the last record) ends iteration quietly and is
/// reported through [`WalIterator::end`]. A damaged header, a damaged record
/// with more data behind it, or an LSN that goes backwards yields a
/// `WalCorruption` error and ends iteration.
pub struct WalIterator<'a> {
    data: &'a [u8],
    max_payload: u64,
    offset: usize,
    last_lsn: u64,
    end: Option<LogEnd>,
    failed: bool,
}

impl WalIterator<'_> {
    /// How the log ended, once iteration has finished without error
    pub fn end(&self) -> Option<LogEnd> {
        self.end
    }

    /// Bytes consumed by valid entries so far
    pub fn valid_len(&self) -> u64 {
        self.offset as u64
    }

    /// LSN of the last valid entry (0 if none)
    pub fn last_lsn(&self) -> u64 {
        self.last_lsn
    }

    fn torn_tail(&mut self) {
        self.end = Some(LogEnd::TornTail {
            valid_len: self.offset as u64,
            discarded: (self.data.len() - self.offset) as u64,
        });
    }
}

impl Iterator for WalIterator<'_> {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.end.is_some() {
            return None;
        }

        if self.offset >= self.data.len() {
            self.end = Some(LogEnd::Clean);
            return None;
        }

        let remaining = &self.data[self.offset..];

        match WalEntry::decode_frame(remaining, self.max_payload) {
            Ok(Frame::Entry(entry, frame_len)) => {
                if entry.lsn <= self.last_lsn {
                    self.failed = true;
                    return Some(Err(WiscError::WalCorruption(format!(
                        "non-increasing LSN {} after {} at offset {}",
                        entry.lsn, self.last_lsn, self.offset
                    ))));
                }
                self.offset += frame_len;
                self.last_lsn = entry.lsn;
                Some(Ok(entry))
            }
            Ok(Frame::Incomplete) => {
                self.torn_tail();
                None
            }
            Ok(Frame::ChecksumMismatch { frame_len }) => {
                if frame_len == remaining.len() {
                    // Last record in the file: a write that never completed.
                    self.torn_tail();
                    None
                } else {
                    self.failed = true;
                    Some(Err(WiscError::WalCorruption(format!(
                        "CRC mismatch at offset {} with {} bytes following",
                        self.offset,
                        remaining.len() - frame_len
                    ))))
                }
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
