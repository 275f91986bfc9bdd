//! Configuration for WiscKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, WiscError};
use crate::wal::WalEntry;

/// Main configuration for a WiscKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (write-ahead log)
    ///     ├── values.vlog      (value log)
    ///     └── segments/        (index segments + MANIFEST)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Limits
    // -------------------------------------------------------------------------
    /// Maximum key length in bytes
    pub key_size: usize,

    /// Maximum value length in bytes
    ///
    /// A key, a value and the entry overhead must together fit the WAL's
    /// u32 length field.
    pub max_value_size: usize,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Memtable size (in bytes of index data) that triggers a flush
    pub memtable_size_threshold: usize,

    /// Number of segments that triggers a compaction
    pub compaction_threshold: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (every append is a durable commit point)
    EveryWrite,

    /// fsync after N uncommitted entries (the last N-1 writes may be lost on power failure)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./wisckv_data"),
            key_size: 256,
            max_value_size: 1024 * 1024 * 1024, // 1 GB
            wal_sync_strategy: WalSyncStrategy::EveryWrite,
            memtable_size_threshold: 4 * 1024 * 1024, // 4 MB
            compaction_threshold: 8,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.key_size == 0 {
            return Err(WiscError::Config("key_size must be greater than 0".into()));
        }
        let max_payload = WalEntry::max_payload_len(self.key_size, self.max_value_size);
        if max_payload > u32::MAX as u64 {
            return Err(WiscError::Config(format!(
                "key_size + max_value_size ({} + {}) leaves no room for WAL framing; \
                 the largest entry would be {} bytes, the limit is {}",
                self.key_size,
                self.max_value_size,
                max_payload,
                u32::MAX
            )));
        }
        if self.memtable_size_threshold == 0 {
            return Err(WiscError::Config(
                "memtable_size_threshold must be greater than 0".into(),
            ));
        }
        if self.compaction_threshold < 2 {
            return Err(WiscError::Config(
                "compaction_threshold must be at least 2".into(),
            ));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(WiscError::Config(
                "EveryNEntries sync count must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the maximum key length (in bytes)
    pub fn key_size(mut self, size: usize) -> Self {
        self.config.key_size = size;
        self
    }

    /// Set the maximum value length (in bytes)
    pub fn max_value_size(mut self, size: usize) -> Self {
        self.config.max_value_size = size;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the memtable flush threshold (in bytes)
    pub fn memtable_size_threshold(mut self, size: usize) -> Self {
        self.config.memtable_size_threshold = size;
        self
    }

    /// Set the segment count that triggers compaction
    pub fn compaction_threshold(mut self, count: usize) -> Self {
        self.config.compaction_threshold = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
