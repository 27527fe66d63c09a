//! Structural delta records.

use strata_core::{Depth, InstanceId};

/// One write to a depth level's dense array.
///
/// The consumer applies these in order to its own per-level buffers. A
/// record with a null `id` marks the slot as vacated (the level shrank).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StructuralDelta {
    /// Level written.
    pub depth: Depth,
    /// Index within the level.
    pub dense_index: u32,
    /// Instance now at that index, or [`InstanceId::NULL`].
    pub id: InstanceId,
    /// Parent of `id`, or [`InstanceId::NULL`] for roots and vacated slots.
    pub parent: InstanceId,
}

impl StructuralDelta {
    /// Whether this record vacates its slot.
    pub fn is_vacated(&self) -> bool {
        self.id.is_null()
    }
}
