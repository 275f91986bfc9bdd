//! Value log file handle

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::{Result, WiscError};
use crate::types::ValuePointer;

/// Append-only value storage
///
/// ## Concurrency:
/// - `file`: Mutex, since both appends and reads move the file cursor
/// - `size`: only advanced after the bytes are written, so a reader that
///   sees a size can read everything below it
pub struct ValueLog {
    path: PathBuf,
    file: Mutex<File>,
    size: AtomicU64,
}

impl ValueLog {
    /// Open or create the value log
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            size: AtomicU64::new(size),
        })
    }

    /// Append a value, returning where it landed
    pub fn append(&self, value: &[u8]) -> Result<ValuePointer> {
        let len = u32::try_from(value.len()).map_err(|_| WiscError::ValueTooLarge {
            len: value.len(),
            max: u32::MAX as usize,
        })?;

        let mut file = self.file.lock();
        let offset = self.size.load(Ordering::Acquire);

        // Write at the logical end; a failed earlier append may have left
        // unreferenced bytes past it, which this overwrites.
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(value)?;

        self.size.store(offset + len as u64, Ordering::Release);
        Ok(ValuePointer::new(offset, len))
    }

    /// Read the bytes a pointer refers to
    pub fn read(&self, ptr: ValuePointer) -> Result<Vec<u8>> {
        let size = self.size.load(Ordering::Acquire);
        if ptr.end() > size {
            return Err(WiscError::CorruptData(format!(
                "value pointer {}+{} outside value log of {} bytes",
                ptr.offset, ptr.len, size
            )));
        }

        let mut value = vec![0u8; ptr.len as usize];
        if value.is_empty() {
            return Ok(value);
        }

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(ptr.offset))?;
        file.read_exact(&mut value)?;
        Ok(value)
    }

    /// Force appended values to disk
    pub fn sync(&self) -> Result<()> {
        let file = self.file.lock();
        file.sync_data()?;
        Ok(())
    }

    /// Current logical size in bytes
    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    /// Path of the value log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sync and release the file handle
    pub fn close(self) -> Result<()> {
        self.sync()
    }
}
