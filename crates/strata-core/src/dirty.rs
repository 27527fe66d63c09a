//! Dirty-flag masks attached to delta records.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bitmask naming which fields of an instance changed since the consumer
/// last saw it.
///
/// Coalescing ORs masks together, so a record flushed after K writes
/// carries the union of all K marks.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DirtyFlags(u32);

impl DirtyFlags {
    /// No field changed.
    pub const NONE: DirtyFlags = DirtyFlags(0);
    /// Local transform (position, rotation, scale).
    pub const TRANSFORM: DirtyFlags = DirtyFlags(1 << 0);
    /// Tint color.
    pub const COLOR: DirtyFlags = DirtyFlags(1 << 1);
    /// Material binding.
    pub const MATERIAL: DirtyFlags = DirtyFlags(1 << 2);
    /// Level-of-detail selection.
    pub const LOD: DirtyFlags = DirtyFlags(1 << 3);
    /// Bone block binding.
    pub const BONES: DirtyFlags = DirtyFlags(1 << 4);
    /// Visibility toggle.
    pub const VISIBILITY: DirtyFlags = DirtyFlags(1 << 5);
    /// Group membership.
    pub const GROUP: DirtyFlags = DirtyFlags(1 << 6);
    /// Every defined flag.
    pub const ALL: DirtyFlags = DirtyFlags((1 << 7) - 1);

    /// Build a mask from raw bits. Unknown bits are kept as-is so custom
    /// field layouts can use the upper range.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits of the mask.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every flag in `other` is also set in `self`.
    pub const fn contains(self, other: DirtyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set every flag in `other`.
    pub fn insert(&mut self, other: DirtyFlags) {
        self.0 |= other.0;
    }
}

impl BitOr for DirtyFlags {
    type Output = DirtyFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DirtyFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for DirtyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DirtyFlags({:#b})", self.0)
    }
}
