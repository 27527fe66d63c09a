//! Per-instance coalescing on top of [`PagedLog`].

use strata_arena::{CapacityConfig, SlotStore};
use strata_core::{Cycle, InstanceId, SyncError};

use crate::paged::{Batch, PagedLog};

/// Where an instance's record for a given cycle lives in the log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Stamp {
    cycle: Cycle,
    position: u32,
}

/// A [`PagedLog`] holding at most one mutable record per instance per
/// cycle.
///
/// Each instance slot carries a stamp `(cycle, position)`. A stamp is live
/// only while its cycle matches the log's and its position has not been
/// shipped; anything else means the next write appends a fresh record.
#[derive(Clone, Debug)]
pub struct CoalescingLog<R> {
    log: PagedLog<R>,
    stamps: SlotStore<Option<Stamp>>,
}

impl<R> CoalescingLog<R> {
    /// Create an empty log.
    pub fn new(config: CapacityConfig) -> Self {
        Self {
            log: PagedLog::new(config),
            stamps: SlotStore::new(config),
        }
    }

    fn live_position(&self, id: InstanceId) -> Option<usize> {
        let slot = id.slot()?;
        let stamp = (*self.stamps.get(slot)?)?;
        let position = stamp.position as usize;
        (stamp.cycle == self.log.cycle() && self.log.is_pending(position)).then_some(position)
    }

    /// The pending record for `id` in the current cycle, if one exists and
    /// has not been shipped.
    pub fn pending_mut(&mut self, id: InstanceId) -> Option<&mut R> {
        let position = self.live_position(id)?;
        self.log.pending_mut(position)
    }

    /// Whether `id` has a mutable record in the current cycle.
    pub fn has_pending(&self, id: InstanceId) -> bool {
        self.live_position(id).is_some()
    }

    /// Append a record for `id` and point its stamp at it.
    pub fn append(&mut self, id: InstanceId, record: R) -> Result<usize, SyncError> {
        let slot = id.slot().ok_or(SyncError::InvalidInstance { id })?;
        let position = self.log.push(record)?;
        let position_u32 = u32::try_from(position).map_err(|_| SyncError::CapacityExceeded {
            requested: position + 1,
            ceiling: u32::MAX as usize,
        })?;
        *self.stamps.slot_mut(slot)? = Some(Stamp {
            cycle: self.log.cycle(),
            position: position_u32,
        });
        Ok(position)
    }

    /// Append a record that no instance can coalesce into.
    pub fn append_detached(&mut self, record: R) -> Result<usize, SyncError> {
        self.log.push(record)
    }

    /// Drop `id`'s stamp so its next write appends.
    pub fn forget(&mut self, id: InstanceId) {
        if let Some(slot) = id.slot() {
            self.stamps.clear(slot);
        }
    }

    /// Records waiting to be flushed.
    pub fn pending(&self) -> usize {
        self.log.pending()
    }

    /// Resizes of the per-id stamp store.
    pub fn storage_growth_events(&self) -> u32 {
        self.stamps.growth_events()
    }

    /// Whether the log holds nothing, shipped or pending.
    pub fn is_drained(&self) -> bool {
        self.log.is_drained()
    }

    /// The current cycle.
    pub fn cycle(&self) -> Cycle {
        self.log.cycle()
    }

    /// Iterate over the pending records in append order.
    pub fn iter_pending(&self) -> impl Iterator<Item = &R> {
        self.log.iter_pending()
    }
}

impl<R: Clone> CoalescingLog<R> {
    /// Ship up to `max_batch_size` pending records. See [`PagedLog::flush`].
    pub fn flush(&mut self, max_batch_size: usize) -> Result<Batch<R>, SyncError> {
        self.log.flush(max_batch_size)
    }
}
