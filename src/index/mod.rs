//! Index Module
//!
//! Maps keys to value-log pointers: a live memtable in front of immutable,
//! sorted segment files.
//!
//! ## Responsibilities
//! - Point lookups with newest-wins shadowing
//! - Prefix scans over live keys
//! - Flushing the memtable into segments
//! - Compacting segments, dropping shadowed entries and tombstones
//!
//! ## Layout
//! ```text
//! segments/
//!   ├── MANIFEST              (live segment ids, oldest → newest)
//!   ├── segment_000001.seg
//!   └── segment_000002.seg
//! ```
//!
//! ## State
//! ```text
//! {empty} --write--> {memtable, 0 segments} --flush--> {empty memtable, N segments}
//!   --write/flush--> {memtable, N segments} --compact--> {memtable, 1 segment}
//! ```

mod manager;
mod manifest;
pub mod segment;

pub use manager::IndexManager;
pub use manifest::Manifest;
pub use segment::{SegmentBuilder, SegmentMeta, SegmentReader};
