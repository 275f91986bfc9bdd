//! Error types for WiscKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using WiscError
pub type Result<T> = std::result::Result<T, WiscError>;

/// Unified error type for WiscKV operations
#[derive(Debug, Error)]
pub enum WiscError {
    // -------------------------------------------------------------------------
    // Validation Errors (raised before any I/O)
    // -------------------------------------------------------------------------
    #[error("Key too long: {len} bytes (max {max})")]
    KeyTooLong { len: usize, max: usize },

    #[error("Value too large: {len} bytes (max {max})")]
    ValueTooLarge { len: usize, max: usize },

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Corruption Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("Corrupt data: {0}")]
    CorruptData(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Operation Context
    // -------------------------------------------------------------------------
    #[error("{op} {key:?} failed: {source}")]
    Context {
        op: &'static str,
        key: String,
        #[source]
        source: Box<WiscError>,
    },

    // -------------------------------------------------------------------------
    // Maintenance Errors (fatal to the engine instance)
    // -------------------------------------------------------------------------
    #[error("Flush failed: {0}")]
    FlushFailed(#[source] Box<WiscError>),

    #[error("Compaction failed: {0}")]
    CompactionFailed(#[source] Box<WiscError>),

    #[error("Engine halted after fatal error: {0}")]
    Halted(String),
}

impl WiscError {
    /// Wrap an error with the operation and key it happened under.
    ///
    /// Validation errors and misses pass through untouched so callers can
    /// still match on them directly.
    pub fn context(self, op: &'static str, key: &[u8]) -> Self {
        match self {
            e @ (WiscError::KeyTooLong { .. }
            | WiscError::ValueTooLarge { .. }
            | WiscError::KeyNotFound
            | WiscError::Halted(_)) => e,
            e => WiscError::Context {
                op,
                key: String::from_utf8_lossy(key).into_owned(),
                source: Box::new(e),
            },
        }
    }

    /// True for a plain lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WiscError::KeyNotFound)
    }

    /// True for maintenance failures and for writes refused after a halt.
    pub fn is_fatal(&self) -> bool {
        match self {
            WiscError::FlushFailed(_) | WiscError::CompactionFailed(_) | WiscError::Halted(_) => {
                true
            }
            WiscError::Context { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

impl From<bincode::Error> for WiscError {
    fn from(e: bincode::Error) -> Self {
        WiscError::Serialization(e.to_string())
    }
}
