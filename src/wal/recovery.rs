//! WAL Recovery
//!
//! Handles crash recovery by reading back the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use tracing::{info, warn};

use crate::error::Result;

use super::{LogEnd, WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Bytes of torn tail that were discarded
    pub bytes_discarded: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries in order
    /// 2. Fail with `WalCorruption` on damage that is not a torn tail
    /// 3. Truncate a torn tail so later appends start on a record boundary
    ///
    /// A missing file recovers as empty. A header declaring more than
    /// `max_payload` bytes is corruption.
    pub fn recover(path: &Path, max_payload: u64) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let (entries, result, valid_len) = Self::scan(path, max_payload)?;

        if result.bytes_discarded > 0 {
            warn!(
                path = %path.display(),
                discarded = result.bytes_discarded,
                "discarding torn WAL tail"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        if result.entries_recovered > 0 {
            info!(
                entries = result.entries_recovered,
                last_lsn = result.last_lsn,
                "WAL recovery complete"
            );
        }

        Ok((
            entries,
            RecoveryResult {
                was_truncated: result.bytes_discarded > 0,
                ..result
            },
        ))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path, max_payload: u64) -> Result<RecoveryResult> {
        Self::scan(path, max_payload).map(|(_, result, _)| result)
    }

    /// Read every valid entry; also returns the length of the valid prefix
    fn scan(path: &Path, max_payload: u64) -> Result<(Vec<WalEntry>, RecoveryResult, u64)> {
        if !path.exists() {
            return Ok((Vec::new(), RecoveryResult::empty(), 0));
        }

        let reader = WalReader::open(path)?.with_max_payload(max_payload);
        let mut iter = reader.entries();
        let mut entries = Vec::new();
        for entry in iter.by_ref() {
            entries.push(entry?);
        }

        let bytes_discarded = match iter.end() {
            Some(LogEnd::TornTail { discarded, .. }) => discarded,
            _ => 0,
        };

        let result = RecoveryResult {
            entries_recovered: entries.len() as u64,
            bytes_discarded,
            last_lsn: iter.last_lsn(),
            was_truncated: false,
        };
        Ok((entries, result, iter.valid_len()))
    }
}

impl RecoveryResult {
    fn empty() -> Self {
        Self {
            entries_recovered: 0,
            bytes_discarded: 0,
            last_lsn: 0,
            was_truncated: false,
        }
    }
}
