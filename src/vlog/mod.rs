//! Value Log Module
//!
//! Append-only store for raw value bytes, kept apart from the keys.
//!
//! ## Responsibilities
//! - Append values and hand back a stable [`ValuePointer`]
//! - Read values back by pointer, rejecting pointers past the end of the file
//!
//! ## File Format
//! ```text
//! ┌────────────┬────────────┬────────────┬─────
//! │  value 1   │  value 2   │  value 3   │ ...
//! └────────────┴────────────┴────────────┴─────
//!  ^offset 0    ^offset len1
//! ```
//!
//! There is no framing. A value is only reachable through the pointer an
//! index entry holds, and overwritten values are never reclaimed.
//!
//! [`ValuePointer`]: crate::types::ValuePointer

mod store;

pub use store::ValueLog;
