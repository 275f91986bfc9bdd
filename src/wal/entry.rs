//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their framing.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WiscError};

/// Frame header: LSN (8) + Len (4) + HeaderCRC (4) + CRC (4)
pub const HEADER_SIZE: usize = 20;

/// Bincode bytes a `Put` payload carries on top of its key and value:
/// LSN (8) + variant tag (4) + key length (8) + value length (8)
pub const PAYLOAD_OVERHEAD: usize = 28;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair (the value may be empty)
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

impl Operation {
    pub fn key(&self) -> &[u8] {
        match self {
            Operation::Put { key, .. } | Operation::Delete { key } => key,
        }
    }
}

/// Result of decoding one frame from a byte buffer
#[derive(Debug)]
pub(crate) enum Frame {
    /// A valid entry and the number of bytes it occupied
    Entry(WalEntry, usize),
    /// The buffer ends before the frame does
    Incomplete,
    /// The header is intact but the record checksum does not match
    ChecksumMismatch { frame_len: usize },
}

impl WalEntry {
    pub fn new(lsn: u64, operation: Operation) -> Self {
        Self { lsn, operation }
    }

    /// Largest payload an entry with these limits can produce
    pub fn max_payload_len(key_size: usize, max_value_size: usize) -> u64 {
        (PAYLOAD_OVERHEAD as u64)
            .saturating_add(key_size as u64)
            .saturating_add(max_value_size as u64)
    }

    /// Encode as `[LSN u64][Len u32][HeaderCRC u32][CRC u32][bincode payload]`
    ///
    /// Fails with `Serialization` before producing any bytes if the payload
    /// does not fit a `u32` length.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        let len = u32::try_from(payload.len()).map_err(|_| {
            WiscError::Serialization(format!("WAL entry too large: {} bytes", payload.len()))
        })?;

        let lsn_bytes = self.lsn.to_le_bytes();
        let len_bytes = len.to_le_bytes();
        let header_crc = Self::compute_header_crc(&lsn_bytes, &len_bytes);
        let crc = Self::compute_crc(&lsn_bytes, &len_bytes, &payload);

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        buf.extend_from_slice(&lsn_bytes);
        buf.extend_from_slice(&len_bytes);
        buf.extend_from_slice(&header_crc.to_le_bytes());
        buf.extend_from_slice(&crc.to_le_bytes());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decode a single, complete frame
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        match Self::decode_frame(bytes, u64::MAX)? {
            Frame::Entry(entry, _) => Ok(entry),
            Frame::Incomplete => Err(WiscError::WalCorruption(format!(
                "truncated entry: {} bytes",
                bytes.len()
            ))),
            Frame::ChecksumMismatch { .. } => {
                Err(WiscError::WalCorruption("CRC mismatch".into()))
            }
        }
    }

    /// CRC32 over the LSN and length fields
    pub fn compute_header_crc(lsn_bytes: &[u8], len_bytes: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(lsn_bytes);
        hasher.update(len_bytes);
        hasher.finalize()
    }

    /// CRC32 over the LSN, the length and the payload
    pub fn compute_crc(lsn_bytes: &[u8], len_bytes: &[u8], payload: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(lsn_bytes);
        hasher.update(len_bytes);
        hasher.update(payload);
        hasher.finalize()
    }

    /// Decode the frame at the start of `bytes`
    ///
    /// A header that is complete but fails its checksum, or declares more
    /// than `max_payload` bytes, is corruption: its length cannot be trusted
    /// to say where the record ends.
    pub(crate) fn decode_frame(bytes: &[u8], max_payload: u64) -> Result<Frame> {
        if bytes.len() < HEADER_SIZE {
            return Ok(Frame::Incomplete);
        }

        let lsn_bytes = &bytes[0..8];
        let len_bytes = &bytes[8..12];
        let header_crc = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        let stored_crc = u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);

        if Self::compute_header_crc(lsn_bytes, len_bytes) != header_crc {
            return Err(WiscError::WalCorruption("header checksum mismatch".into()));
        }

        let len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);
        if len as u64 > max_payload {
            return Err(WiscError::WalCorruption(format!(
                "declared length {} exceeds the largest possible entry ({} bytes)",
                len, max_payload
            )));
        }

        let frame_len = HEADER_SIZE + len as usize;
        if bytes.len() < frame_len {
            return Ok(Frame::Incomplete);
        }

        let payload = &bytes[HEADER_SIZE..frame_len];
        if Self::compute_crc(lsn_bytes, len_bytes, payload) != stored_crc {
            return Ok(Frame::ChecksumMismatch { frame_len });
        }

        let entry: WalEntry = bincode::deserialize(payload).map_err(|e| {
            WiscError::WalCorruption(format!("undecodable entry payload: {}", e))
        })?;

        let header_lsn = u64::from_le_bytes([
            lsn_bytes[0], lsn_bytes[1], lsn_bytes[2], lsn_bytes[3],
            lsn_bytes[4], lsn_bytes[5], lsn_bytes[6], lsn_bytes[7],
        ]);
        if entry.lsn != header_lsn {
            return Err(WiscError::WalCorruption(format!(
                "LSN mismatch: header {} vs payload {}",
                header_lsn, entry.lsn
            )));
        }

        Ok(Frame::Entry(entry, frame_len))
    }
}
