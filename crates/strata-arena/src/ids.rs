//! Instance id allocation with free-list recycling.
//!
//! [`IdAllocator`] hands out non-zero `u32` ids. Released ids go onto a
//! min-heap so the smallest recycled id is reissued first, which keeps the
//! live set packed towards the low end of every id-indexed array.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use strata_core::{InstanceId, SyncError};

use crate::config::CapacityConfig;
use crate::store::SlotStore;

/// Allocator of unique non-zero instance ids.
///
/// Not reentrant: the owning engine serializes all calls.
#[derive(Clone, Debug)]
pub struct IdAllocator {
    /// Highest id ever issued. Ids `1..=high_water` have been handed out.
    high_water: u32,
    /// Released ids, smallest first.
    free: BinaryHeap<Reverse<u32>>,
    /// Per-slot flag: is this id currently on the free list.
    released: SlotStore<bool>,
    /// Largest id this allocator may issue.
    ceiling: usize,
}

impl IdAllocator {
    /// Create an empty allocator growing under `config`.
    pub fn new(config: CapacityConfig) -> Self {
        Self {
            high_water: 0,
            free: BinaryHeap::new(),
            released: SlotStore::new(config),
            ceiling: config.ceiling.min(u32::MAX as usize),
        }
    }

    /// Issue an id: the smallest recycled id if any, otherwise
    /// `high_water + 1`.
    pub fn allocate(&mut self) -> Result<InstanceId, SyncError> {
        if let Some(Reverse(raw)) = self.free.pop() {
            let id = InstanceId(raw);
            if let Some(flag) = id.slot().and_then(|slot| self.released.get_mut(slot)) {
                *flag = false;
            }
            return Ok(id);
        }
        let next = self.high_water as usize + 1;
        if next > self.ceiling {
            return Err(SyncError::CapacityExceeded {
                requested: next,
                ceiling: self.ceiling,
            });
        }
        self.high_water += 1;
        Ok(InstanceId(self.high_water))
    }

    /// Return `id` to the free list.
    ///
    /// Fails with [`SyncError::InvalidId`] for the null id or an id that was
    /// never issued, and with [`SyncError::AlreadyReleased`] if `id` is
    /// already free.
    pub fn release(&mut self, id: InstanceId) -> Result<(), SyncError> {
        let slot = self.issued_slot(id)?;
        let flag = self.released.slot_mut(slot)?;
        if *flag {
            return Err(SyncError::AlreadyReleased { id });
        }
        *flag = true;
        self.free.push(Reverse(id.0));
        Ok(())
    }

    /// Whether `id` has been issued and not released.
    pub fn is_live(&self, id: InstanceId) -> bool {
        match self.issued_slot(id) {
            Ok(slot) => !self.released.get(slot).copied().unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Highest id ever issued.
    pub fn high_water(&self) -> u32 {
        self.high_water
    }

    /// Number of ids currently issued and not released.
    pub fn live_count(&self) -> usize {
        self.high_water as usize - self.free.len()
    }

    /// Number of ids waiting on the free list.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Resizes of the per-id release flags since construction.
    pub fn storage_growth_events(&self) -> u32 {
        self.released.growth_events()
    }

    fn issued_slot(&self, id: InstanceId) -> Result<usize, SyncError> {
        match id.slot() {
            Some(slot) if id.0 <= self.high_water => Ok(slot),
            _ => Err(SyncError::InvalidId { id }),
        }
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(CapacityConfig::default())
    }
}
