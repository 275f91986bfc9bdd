//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Validate keys and values before touching any file
//! - Order every write as WAL → value log → memtable
//! - Trigger flushes and compactions when thresholds are crossed
//! - Replay the WAL on startup through the same write path

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{Result, WiscError};
use crate::index::IndexManager;
use crate::types::IndexEntry;
use crate::vlog::ValueLog;
use crate::wal::{Operation, WalEntry, WalRecovery, WalWriter};

/// Whether a write goes through the WAL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogMode {
    /// Live traffic: append to the WAL first, truncate it after a flush
    Logged,
    /// WAL replay: the entry is already logged, and the WAL must survive
    /// flushes until replay has applied every entry in it
    Replay,
}

/// Point-in-time counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub memtable_entries: usize,
    pub memtable_size: usize,
    pub segment_count: usize,
    pub value_log_size: u64,
    pub wal_size: u64,
    pub next_lsn: u64,
}

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (set/delete/flush/compact): Serialized by `write_lock`
///   - Only ONE write operation at a time, maintenance included
///   - Order inside the lock: WAL → value log → memtable → (flush → compaction)
///
/// - **Reads** (get/scan): No write_lock needed
///   - The index resolves against the memtable and a snapshot of the
///     segment list, so a concurrent flush or compaction never hides a key
///
/// ## Failure Model
/// Once an error leaves the WAL, value log and index possibly disagreeing
/// (anything after the WAL commit point), the engine halts: later writes
/// fail with [`WiscError::Halted`]. Reads keep working.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Write-ahead log for durability (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// Append-only value bytes
    vlog: ValueLog,

    /// Memtable + segments
    index: IndexManager,

    /// Serializes write operations
    write_lock: Mutex<()>,

    /// Reason the engine stopped accepting writes, if it has
    halted: Mutex<Option<String>>,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const VLOG_FILENAME: &'static str = "values.vlog";
    const SEGMENT_DIR: &'static str = "segments";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate config, create data directory
    /// 2. Open the index (loads live segments) and the value log
    /// 3. Recover the WAL (a torn tail is discarded, other damage aborts)
    /// 4. Replay every entry through the write path with logging suppressed
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let index = IndexManager::open(
            &config.data_dir.join(Self::SEGMENT_DIR),
            config.compaction_threshold,
        )?;
        let vlog = ValueLog::open(&config.data_dir.join(Self::VLOG_FILENAME))?;

        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let max_payload = WalEntry::max_payload_len(config.key_size, config.max_value_size);
        let (entries, recovery) = WalRecovery::recover(&wal_path, max_payload)?;
        let wal = WalWriter::open_at(&wal_path, config.wal_sync_strategy, recovery.last_lsn + 1)?;

        let engine = Self {
            config,
            wal: Mutex::new(wal),
            vlog,
            index,
            write_lock: Mutex::new(()),
            halted: Mutex::new(None),
        };

        engine.replay(entries)?;

        info!(
            data_dir = %engine.config.data_dir.display(),
            replayed = recovery.entries_recovered,
            torn_tail_bytes = recovery.bytes_discarded,
            segments = engine.index.segment_count(),
            memtable_entries = engine.index.memtable_entry_count(),
            "engine opened"
        );

        Ok(engine)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Replay recovered WAL entries in log order
    fn replay(&self, entries: Vec<WalEntry>) -> Result<()> {
        let _write_guard = self.write_lock.lock();

        for entry in entries {
            let lsn = entry.lsn;
            let result = match &entry.operation {
                Operation::Put { key, value } => {
                    self.validate_key(key)?;
                    self.validate_value(value)?;
                    self.apply_set(key, value, LogMode::Replay)
                }
                Operation::Delete { key } => {
                    self.validate_key(key)?;
                    self.apply_delete(key, LogMode::Replay)
                }
            };
            result.map_err(|e| {
                debug!(lsn, "WAL replay failed");
                e.context("replay", entry.operation.key())
            })?;
        }

        Ok(())
    }

    // =========================================================================
    // Public Operations
    // =========================================================================

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (most recent writes)
    /// 2. Segments (newest to oldest)
    ///
    /// Fails with `KeyNotFound` for missing and deleted keys.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.validate_key(key)?;

        match self.index.resolve(key).map_err(|e| e.context("get", key))? {
            Some(IndexEntry::Value(ptr)) => self.vlog.read(ptr).map_err(|e| e.context("get", key)),
            Some(IndexEntry::Tombstone) | None => Err(WiscError::KeyNotFound),
        }
    }

    /// Set a key-value pair
    ///
    /// Steps:
    /// 1. Validate key/value sizes
    /// 2. Acquire write lock
    /// 3. Append to WAL (the commit point)
    /// 4. Append value to the value log
    /// 5. Point the key at it in the memtable
    /// 6. Flush (and maybe compact) if the memtable is full
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.validate_key(key)?;
        self.validate_value(value)?;

        let _write_guard = self.write_lock.lock();
        self.apply_set(key, value, LogMode::Logged)
    }

    /// Delete a key
    ///
    /// Same ordering as `set`, with a tombstone instead of a value.
    /// Deleting a missing key is not an error.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.validate_key(key)?;

        let _write_guard = self.write_lock.lock();
        self.apply_delete(key, LogMode::Logged)
    }

    /// All live keys starting with `prefix`, in ascending byte order
    ///
    /// An empty prefix returns every key.
    pub fn scan(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.index
            .keys_with_prefix(prefix)
            .map_err(|e| e.context("scan", prefix))
    }

    /// Flush memtable to a segment now, regardless of its size
    pub fn flush(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.ensure_running()?;
        self.flush_locked(LogMode::Logged)
    }

    /// Merge all segments now, regardless of how many there are
    pub fn compact(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.ensure_running()?;
        self.index
            .compact()
            .map_err(|e| self.halt(WiscError::CompactionFailed(Box::new(e))))?;
        Ok(())
    }

    /// Close the engine
    ///
    /// Syncs the WAL and value log and releases every file handle. The
    /// memtable is NOT flushed; it is rebuilt from the WAL on next open.
    pub fn close(self) -> Result<()> {
        let write_guard = self.write_lock.lock();

        self.wal.lock().sync()?;
        self.vlog.sync()?;

        info!(
            unflushed_entries = self.index.memtable_entry_count(),
            segments = self.index.segment_count(),
            "engine closed"
        );
        drop(write_guard);

        self.index.close()?;
        self.vlog.close()
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    fn apply_set(&self, key: &[u8], value: &[u8], mode: LogMode) -> Result<()> {
        self.ensure_running()?;

        if mode == LogMode::Logged {
            self.log(Operation::Put {
                key: key.to_vec(),
                value: value.to_vec(),
            })
            .map_err(|e| e.context("set", key))?;
        }

        let ptr = self
            .vlog
            .append(value)
            .map_err(|e| self.halt(e.context("set", key)))?;

        let size = self.index.put(key, ptr);
        self.maybe_flush(size, mode)
    }

    fn apply_delete(&self, key: &[u8], mode: LogMode) -> Result<()> {
        self.ensure_running()?;

        if mode == LogMode::Logged {
            self.log(Operation::Delete { key: key.to_vec() })
                .map_err(|e| e.context("delete", key))?;
        }

        let size = self.index.put_tombstone(key);
        self.maybe_flush(size, mode)
    }

    /// Append to the WAL. A failed write may leave a partial record behind,
    /// so it halts the engine. An entry that cannot be encoded fails before
    /// anything reaches the file and only fails this write.
    fn log(&self, operation: Operation) -> Result<()> {
        let kind = match &operation {
            Operation::Put { .. } => "put",
            Operation::Delete { .. } => "delete",
        };
        let lsn = self.wal.lock().append(operation).map_err(|e| match e {
            e @ WiscError::Serialization(_) => e,
            e => self.halt(e),
        })?;
        debug!(lsn, kind, "WAL append");
        Ok(())
    }

    fn maybe_flush(&self, memtable_size: usize, mode: LogMode) -> Result<()> {
        if memtable_size < self.config.memtable_size_threshold {
            return Ok(());
        }
        self.flush_locked(mode)
    }

    /// Flush, truncate WAL, compaction check (called with write lock held)
    ///
    /// The value log is synced first so a durable segment never points at
    /// value bytes that are not durable. The WAL is only truncated once the
    /// segment is committed.
    fn flush_locked(&self, mode: LogMode) -> Result<()> {
        let flushed = self
            .vlog
            .sync()
            .and_then(|_| self.index.flush())
            .map_err(|e| self.halt(WiscError::FlushFailed(Box::new(e))))?;

        if flushed.is_none() {
            return Ok(());
        }

        if mode == LogMode::Logged {
            self.wal
                .lock()
                .truncate()
                .map_err(|e| self.halt(WiscError::FlushFailed(Box::new(e))))?;
        }

        self.index
            .compaction_check()
            .map_err(|e| self.halt(WiscError::CompactionFailed(Box::new(e))))?;

        Ok(())
    }

    // =========================================================================
    // Validation and Failure State
    // =========================================================================

    fn validate_key(&self, key: &[u8]) -> Result<()> {
        if key.len() > self.config.key_size {
            return Err(WiscError::KeyTooLong {
                len: key.len(),
                max: self.config.key_size,
            });
        }
        Ok(())
    }

    fn validate_value(&self, value: &[u8]) -> Result<()> {
        if value.len() > self.config.max_value_size {
            return Err(WiscError::ValueTooLarge {
                len: value.len(),
                max: self.config.max_value_size,
            });
        }
        Ok(())
    }

    fn ensure_running(&self) -> Result<()> {
        match &*self.halted.lock() {
            Some(reason) => Err(WiscError::Halted(reason.clone())),
            None => Ok(()),
        }
    }

    /// Record a fatal failure and hand the error back
    fn halt(&self, err: WiscError) -> WiscError {
        error!(error = %err, "engine halted; refusing further writes");
        let mut halted = self.halted.lock();
        if halted.is_none() {
            *halted = Some(err.to_string());
        }
        err
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Whether a fatal failure has stopped writes
    pub fn is_halted(&self) -> bool {
        self.halted.lock().is_some()
    }

    /// Current counters
    pub fn stats(&self) -> EngineStats {
        let wal = self.wal.lock();
        EngineStats {
            memtable_entries: self.index.memtable_entry_count(),
            memtable_size: self.index.memtable_size(),
            segment_count: self.index.segment_count(),
            value_log_size: self.vlog.size(),
            wal_size: wal.size(),
            next_lsn: wal.current_lsn(),
        }
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the segment directory path
    pub fn segment_dir(&self) -> PathBuf {
        self.config.data_dir.join(Self::SEGMENT_DIR)
    }

    /// Get the WAL file path
    pub fn wal_path(&self) -> PathBuf {
        self.config.data_dir.join(Self::WAL_FILENAME)
    }

    /// Get the current memtable size
    pub fn memtable_size(&self) -> usize {
        self.index.memtable_size()
    }

    /// Get the memtable entry count
    pub fn memtable_entry_count(&self) -> usize {
        self.index.memtable_entry_count()
    }

    /// Get the number of segments
    pub fn segment_count(&self) -> usize {
        self.index.segment_count()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
