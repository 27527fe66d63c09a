//! Live instance counts per group.

use indexmap::IndexMap;
use strata_core::{GroupId, SyncError};

/// Live count per [`GroupId`], in first-seen order.
///
/// Groups whose count returns to zero keep their entry so iteration order
/// stays stable for the consumer.
#[derive(Clone, Debug, Default)]
pub struct GroupCounts {
    counts: IndexMap<GroupId, u32>,
}

impl GroupCounts {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more live instance in `group`.
    pub fn increment(&mut self, group: GroupId) {
        *self.counts.entry(group).or_insert(0) += 1;
    }

    /// Count one fewer live instance in `group`.
    ///
    /// Dropping below zero is a fatal [`SyncError::GroupUnderflow`]; the
    /// count is left unchanged.
    pub fn decrement(&mut self, group: GroupId) -> Result<(), SyncError> {
        match self.counts.get_mut(&group) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(())
            }
            _ => Err(SyncError::GroupUnderflow { group }),
        }
    }

    /// Live instances in `group`. Unknown groups count zero.
    pub fn count(&self, group: GroupId) -> u32 {
        self.counts.get(&group).copied().unwrap_or(0)
    }

    /// Iterate over `(group, count)` in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (GroupId, u32)> + '_ {
        self.counts.iter().map(|(g, c)| (*g, *c))
    }

    /// Sum of every group's count.
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| u64::from(c)).sum()
    }
}
