//! Id-indexed arrays under a capacity policy.
//!
//! A [`SlotStore`] is the backing array behind every per-instance table
//! (hierarchy nodes, child lists, coalescing stamps, compactor slots). It
//! is allocated to `initial_capacity` up front and grows only when an index
//! past the end is touched. Growth appends default values; existing entries
//! keep their indices.

use strata_core::SyncError;

use crate::config::CapacityConfig;

/// Growable array indexed by instance slot.
#[derive(Clone, Debug)]
pub struct SlotStore<T> {
    data: Vec<T>,
    config: CapacityConfig,
    growth_events: u32,
}

impl<T: Clone + Default> SlotStore<T> {
    /// Allocate `config.initial_capacity` default-valued slots.
    pub fn new(config: CapacityConfig) -> Self {
        Self {
            data: vec![T::default(); config.initial_capacity],
            config,
            growth_events: 0,
        }
    }

    /// Make sure `index` is addressable, growing per the policy if needed.
    ///
    /// Returns `Ok(true)` when a resize happened.
    pub fn ensure(&mut self, index: usize) -> Result<bool, SyncError> {
        if index < self.data.len() {
            return Ok(false);
        }
        let required = index + 1;
        let new_len = self.config.grown_capacity(required)?;
        log::debug!(
            "slot store grow: {} -> {} elements (required {required})",
            self.data.len(),
            new_len
        );
        self.data.resize(new_len, T::default());
        self.growth_events += 1;
        Ok(true)
    }

    /// Mutable access to `index`, growing the store first if needed.
    pub fn slot_mut(&mut self, index: usize) -> Result<&mut T, SyncError> {
        self.ensure(index)?;
        Ok(&mut self.data[index])
    }

    /// Reset `index` to the default value. Out-of-range indices are
    /// already default and are left alone.
    pub fn clear(&mut self, index: usize) {
        if let Some(v) = self.data.get_mut(index) {
            *v = T::default();
        }
    }
}

impl<T> SlotStore<T> {
    /// Shared access to `index`, or `None` past the current capacity.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    /// Mutable access to `index`, or `None` past the current capacity.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.data.get_mut(index)
    }

    /// Current capacity in elements.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of resizes since construction.
    pub fn growth_events(&self) -> u32 {
        self.growth_events
    }

    /// The policy this store grows under.
    pub fn config(&self) -> &CapacityConfig {
        &self.config
    }

    /// Iterate over `(index, value)` for every allocated slot.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.data.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(initial: usize) -> SlotStore<u32> {
        SlotStore::new(CapacityConfig::new(initial, 64))
    }

    #[test]
    fn starts_at_initial_capacity() {
        let s = store(64);
        assert_eq!(s.capacity(), 64);
        assert_eq!(s.get(63), Some(&0));
        assert_eq!(s.get(64), None);
    }

    #[test]
    fn in_range_ensure_does_not_grow() {
        let mut s = store(64);
        assert!(!s.ensure(10).unwrap());
        assert_eq!(s.growth_events(), 0);
    }

    #[test]
    fn growth_preserves_existing_entries() {
        let mut s = store(64);
        for i in 0..64 {
            *s.slot_mut(i).unwrap() = i as u32 * 3;
        }
        assert!(s.ensure(64).unwrap());
        assert_eq!(s.capacity() % 64, 0);
        for i in 0..64 {
            assert_eq!(s.get(i), Some(&(i as u32 * 3)));
        }
        assert_eq!(s.get(64), Some(&0));
    }

    #[test]
    fn growth_past_ceiling_fails() {
        let mut s: SlotStore<u8> = SlotStore::new(CapacityConfig {
            ceiling: 128,
            ..CapacityConfig::new(64, 64)
        });
        assert!(s.ensure(127).is_ok());
        let err = s.ensure(128).unwrap_err();
        assert!(err.is_capacity());
        assert_eq!(s.capacity(), 128);
    }

    #[test]
    fn clear_resets_to_default() {
        let mut s = store(64);
        *s.slot_mut(5).unwrap() = 9;
        s.clear(5);
        assert_eq!(s.get(5), Some(&0));
        // Out of range is a no-op.
        s.clear(10_000);
    }

    #[test]
    fn zero_initial_capacity_grows_on_demand() {
        let mut s: SlotStore<u32> = SlotStore::new(CapacityConfig::new(0, 8));
        assert_eq!(s.capacity(), 0);
        *s.slot_mut(0).unwrap() = 1;
        assert_eq!(s.capacity(), 8);
    }
}
