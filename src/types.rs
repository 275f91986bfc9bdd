//! Shared index types
//!
//! Keys map to a pointer into the value log, or to a tombstone. The same
//! representation is used by the memtable and by on-disk segments.

/// Location of a value's bytes inside the value log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValuePointer {
    /// Byte offset of the first value byte
    pub offset: u64,
    /// Number of value bytes (0 is a legitimate empty value)
    pub len: u32,
}

impl ValuePointer {
    pub fn new(offset: u64, len: u32) -> Self {
        Self { offset, len }
    }

    /// Offset one past the last byte
    pub fn end(&self) -> u64 {
        self.offset + self.len as u64
    }
}

/// What an index structure knows about a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexEntry {
    /// A live value stored in the value log
    Value(ValuePointer),

    /// A tombstone (deleted key)
    Tombstone,
}

impl IndexEntry {
    pub fn is_tombstone(&self) -> bool {
        matches!(self, IndexEntry::Tombstone)
    }

    pub fn pointer(&self) -> Option<ValuePointer> {
        match self {
            IndexEntry::Value(ptr) => Some(*ptr),
            IndexEntry::Tombstone => None,
        }
    }
}
