//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append log entries before any mutation (the commit point)
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Crash recovery, tolerating a torn final record
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Entry 1                                                  │
//! │ ┌─────────┬─────────┬───────────────┬─────────┬────────┐ │
//! │ │ LSN (8) │ Len (4) │ HeaderCRC (4) │ CRC (4) │ Data   │ │
//! │ └─────────┴─────────┴───────────────┴─────────┴────────┘ │
//! ├──────────────────────────────────────────────────────────┤
//! │ Entry 2                                                  │
//! │ ┌─────────┬─────────┬───────────────┬─────────┬────────┐ │
//! │ │ LSN (8) │ Len (4) │ HeaderCRC (4) │ CRC (4) │ Data   │ │
//! │ └─────────┴─────────┴───────────────┴─────────┴────────┘ │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! `Data` is the bincode encoding of a [`WalEntry`]. `HeaderCRC` covers LSN
//! and Len, so a damaged length is caught before it is used to find the next
//! record. `CRC` covers LSN, Len and `Data`.

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{WalEntry, Operation, HEADER_SIZE, PAYLOAD_OVERHEAD};
pub use writer::WalWriter;
pub use reader::{LogEnd, WalIterator, WalReader};
pub use recovery::{WalRecovery, RecoveryResult};
