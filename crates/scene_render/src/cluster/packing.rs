//! Packed `(offset, count)` lookup words
//!
//! Each cluster's list is addressed on the GPU by one 32-bit word: the low
//! 24 bits hold the start offset into the flattened index array and the high
//! 8 bits hold the number of entries.

use bytemuck::{Pod, Zeroable};

/// Number of bits reserved for the offset field
pub const COUNT_BITS: u32 = 24;

/// Mask of the offset field
pub const INDEX_MASK: u32 = (1 << COUNT_BITS) - 1;

/// Mask of the count field after shifting it down
pub const COUNT_MASK: u32 = (1 << (32 - COUNT_BITS)) - 1;

/// One cluster lookup word as sampled by object shaders
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct ClusterLookup(u32);

impl ClusterLookup {
    /// Largest count the word can carry
    pub const MAX_COUNT: u32 = COUNT_MASK;

    /// Largest offset the word can carry
    pub const MAX_OFFSET: u32 = INDEX_MASK;

    /// Empty lookup (offset 0, count 0)
    pub const EMPTY: Self = Self(0);

    /// Pack an offset and a count.
    ///
    /// Both must fit their fields; overflowing either is a logic error that
    /// asserts in debug builds and is masked off in release builds.
    pub fn new(offset: u32, count: u32) -> Self {
        Self::EMPTY.with_offset(offset).with_count(count)
    }

    /// Pack an offset and a count, returning `None` if either overflows
    pub fn try_new(offset: u32, count: u32) -> Option<Self> {
        (offset <= Self::MAX_OFFSET && count <= Self::MAX_COUNT).then(|| Self::new(offset, count))
    }

    /// Reinterpret a raw packed word
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw packed word
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Set the count field
    #[must_use]
    pub fn with_count(self, count: u32) -> Self {
        debug_assert!(count <= COUNT_MASK, "cluster count {count} does not fit in 8 bits");
        Self(self.0 | ((count & COUNT_MASK) << COUNT_BITS))
    }

    /// Set the offset field
    #[must_use]
    pub fn with_offset(self, offset: u32) -> Self {
        debug_assert_eq!(offset, offset & INDEX_MASK, "cluster offset {offset} does not fit in 24 bits");
        // masked so an oversized offset never spills into the count byte
        Self(self.0 | (offset & INDEX_MASK))
    }

    /// Start offset into the flattened index array
    pub const fn offset(self) -> u32 {
        self.0 & INDEX_MASK
    }

    /// Number of entries in the cluster
    pub const fn count(self) -> u32 {
        (self.0 >> COUNT_BITS) & COUNT_MASK
    }
}

impl From<ClusterLookup> for u32 {
    fn from(lookup: ClusterLookup) -> Self {
        lookup.raw()
    }
}
