//! # WiscKV
//!
//! An embedded, single-process key-value store with:
//! - Write-Ahead Logging (WAL) for durability
//! - Crash recovery with torn-write handling
//! - Keys indexed in a memtable plus sorted on-disk segments
//! - Values kept apart in an append-only value log
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Engine                               │
//! │            (Single Writer / Multi Reader)                    │
//! └───────┬─────────────────────┬──────────────────────┬────────┘
//!         │ 1. commit           │ 2. value bytes       │ 3. key → pointer
//!         ▼                     ▼                      ▼
//!   ┌─────────────┐      ┌─────────────┐       ┌──────────────┐
//!   │     WAL     │      │  Value Log  │       │ IndexManager │
//!   │  (Append)   │      │  (Append)   │       │  MemTable    │
//!   └─────────────┘      └─────────────┘       └──────┬───────┘
//!                                                     │ flush / compact
//!                                                     ▼
//!                                              ┌──────────────┐
//!                                              │   Segments   │
//!                                              │  + MANIFEST  │
//!                                              └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod types;

pub mod wal;
pub mod vlog;
pub mod memtable;
pub mod index;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{WiscError, Result};
pub use config::{Config, WalSyncStrategy};
pub use engine::{Engine, EngineStats};
pub use types::{IndexEntry, ValuePointer};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of WiscKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
