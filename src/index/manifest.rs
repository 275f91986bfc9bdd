//! Segment Manifest
//!
//! Records which segment files make up the index, oldest to newest.
//! Writing a new manifest is the commit point of every flush and compaction:
//! a segment file that is not listed does not exist as far as reads go.
//!
//! ## File Format
//! ```text
//! ┌──────────┬──────────┬──────────────────────────┐
//! │ CRC (4)  │ Len (4)  │ bincode(Manifest)        │
//! └──────────┴──────────┴──────────────────────────┘
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WiscError};

pub(crate) const MANIFEST_FILENAME: &str = "MANIFEST";
const MANIFEST_TMP_FILENAME: &str = "MANIFEST.tmp";

/// Live segment set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Id the next segment will get
    pub next_segment_id: u64,

    /// Live segment ids, oldest first
    pub segments: Vec<u64>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            next_segment_id: 1,
            segments: Vec::new(),
        }
    }
}

impl Manifest {
    /// Load the manifest from `dir`, or `None` if there is none yet
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILENAME);
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        if bytes.len() < 8 {
            return Err(WiscError::CorruptData(format!(
                "manifest too short ({} bytes)",
                bytes.len()
            )));
        }

        let crc = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let payload = bytes.get(8..8 + len).ok_or_else(|| {
            WiscError::CorruptData(format!("manifest truncated: expected {} payload bytes", len))
        })?;

        if crc32fast::hash(payload) != crc {
            return Err(WiscError::CorruptData("manifest checksum mismatch".into()));
        }

        let manifest: Manifest = bincode::deserialize(payload)
            .map_err(|e| WiscError::CorruptData(format!("undecodable manifest: {}", e)))?;
        Ok(Some(manifest))
    }

    /// Atomically replace the manifest in `dir`
    ///
    /// Writes a temp file, fsyncs it, renames it over the old manifest,
    /// then fsyncs the directory.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let payload = bincode::serialize(self)?;
        let tmp_path = dir.join(MANIFEST_TMP_FILENAME);

        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
            file.write_all(&(payload.len() as u32).to_le_bytes())?;
            file.write_all(&payload)?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, dir.join(MANIFEST_FILENAME))?;
        sync_dir(dir)
    }

    /// Path of a leftover temp file from an interrupted save
    pub(crate) fn tmp_path(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_TMP_FILENAME)
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

// Directories cannot be opened for syncing on every platform.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
