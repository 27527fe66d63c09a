//! Gapless dense array of live instance ids.
//!
//! The consumer iterates `0..live_count` over an indirection buffer that
//! maps dense index to instance id. [`IndirectIds`] maintains that buffer
//! and emits [`LiveIdDelta`]s describing every slot it writes.
//!
//! Removal swaps the last entry into the hole:
//!
//! ```text
//! before:  [1, 2, 3, 4, 5]      remove(2)
//! after:   [1, 5, 3, 4]         deltas: (1 → 5), (4 → null)
//! ```

use strata_arena::{CapacityConfig, SlotStore};
use strata_core::error::corrupt;
use strata_core::{InstanceId, SyncError};

use crate::coalesce::CoalescingLog;
use crate::paged::Batch;

/// One write to the consumer's indirection buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveIdDelta {
    /// Dense index written.
    pub dense_index: u32,
    /// Id now stored there. [`InstanceId::NULL`] marks a vacated slot.
    pub id: InstanceId,
}

/// Dense array of live ids with swap-compaction.
#[derive(Clone, Debug)]
pub struct IndirectIds {
    dense: Vec<InstanceId>,
    /// Per-id dense index, `None` when not live.
    slots: SlotStore<Option<u32>>,
    log: CoalescingLog<LiveIdDelta>,
    config: CapacityConfig,
}

impl IndirectIds {
    /// Create an empty array.
    pub fn new(config: CapacityConfig) -> Self {
        Self {
            dense: Vec::with_capacity(config.initial_capacity),
            slots: SlotStore::new(config),
            log: CoalescingLog::new(config),
            config,
        }
    }

    /// Add `id` at the end of the dense array.
    ///
    /// Returns `Ok(false)` if `id` was already live; its pending delta, if
    /// any, is rewritten in place.
    pub fn add(&mut self, id: InstanceId) -> Result<bool, SyncError> {
        let slot = id.slot().ok_or(SyncError::InvalidInstance { id })?;
        if let Some(index) = self.slots.get(slot).copied().flatten() {
            if let Some(delta) = self.log.pending_mut(id) {
                *delta = LiveIdDelta {
                    dense_index: index,
                    id,
                };
            }
            return Ok(false);
        }
        let len = self.dense.len();
        let index = dense_u32(len)?;
        self.config.reserve(&mut self.dense, len + 1)?;
        *self.slots.slot_mut(slot)? = Some(index);
        self.dense.push(id);
        self.log.append(
            id,
            LiveIdDelta {
                dense_index: index,
                id,
            },
        )?;
        Ok(true)
    }

    /// Remove `id`, moving the last live id into its slot.
    ///
    /// Emits the moved id at the vacated index (unless `id` was last) and
    /// then a null delta at the old trailing index. Removing an id that is
    /// not live is [`SyncError::CorruptState`].
    pub fn remove(&mut self, id: InstanceId) -> Result<(), SyncError> {
        let slot = id.slot().ok_or(SyncError::InvalidInstance { id })?;
        let index = self
            .slots
            .get(slot)
            .copied()
            .flatten()
            .ok_or_else(|| corrupt(format!("removing instance {id} which is not live")))?;
        if self.dense.get(index as usize) != Some(&id) {
            return Err(corrupt(format!(
                "dense index {index} does not hold instance {id}"
            )));
        }
        let last = self.dense.len() - 1;
        let last_u32 = dense_u32(last)?;

        if index as usize != last {
            let moved = self.dense[last];
            let moved_slot = moved
                .slot()
                .ok_or_else(|| corrupt(format!("null id stored at dense index {last}")))?;
            match self.slots.get(moved_slot).copied().flatten() {
                Some(i) if i == last_u32 => {}
                other => {
                    return Err(corrupt(format!(
                        "instance {moved} at dense index {last} is mapped to {other:?}"
                    )))
                }
            }
            self.dense[index as usize] = moved;
            *self.slots.slot_mut(moved_slot)? = Some(index);
            // The moved id's earlier delta stays in the log; a fresh one
            // after it wins on replay.
            self.log.forget(moved);
            self.log.append(
                moved,
                LiveIdDelta {
                    dense_index: index,
                    id: moved,
                },
            )?;
        }

        self.dense.pop();
        self.slots.clear(slot);
        self.log.forget(id);
        self.log.append_detached(LiveIdDelta {
            dense_index: last_u32,
            id: InstanceId::NULL,
        })?;
        Ok(())
    }

    /// Whether `id` is live.
    pub fn contains(&self, id: InstanceId) -> bool {
        self.dense_index(id).is_some()
    }

    /// Dense index of `id`, or `None` if not live.
    pub fn dense_index(&self, id: InstanceId) -> Option<u32> {
        self.slots.get(id.slot()?).copied().flatten()
    }

    /// Number of live ids.
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Whether no id is live.
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// The dense array itself.
    pub fn as_slice(&self) -> &[InstanceId] {
        &self.dense
    }

    /// Deltas waiting to be flushed.
    pub fn pending(&self) -> usize {
        self.log.pending()
    }

    /// Resizes of the per-id tables behind the array.
    pub fn storage_growth_events(&self) -> u32 {
        self.slots.growth_events() + self.log.storage_growth_events()
    }

    /// Whether the delta log is fully drained.
    pub fn is_drained(&self) -> bool {
        self.log.is_drained()
    }

    /// Ship up to `max_batch_size` deltas.
    pub fn flush(&mut self, max_batch_size: usize) -> Result<Batch<LiveIdDelta>, SyncError> {
        self.log.flush(max_batch_size)
    }
}

fn dense_u32(index: usize) -> Result<u32, SyncError> {
    u32::try_from(index).map_err(|_| SyncError::CapacityExceeded {
        requested: index + 1,
        ceiling: u32::MAX as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u32) -> IndirectIds {
        let mut c = IndirectIds::new(CapacityConfig::new(64, 64));
        for i in 1..=n {
            assert!(c.add(InstanceId(i)).unwrap());
        }
        c
    }

    /// Replay deltas onto a consumer-side buffer.
    fn replay(buf: &mut Vec<InstanceId>, deltas: &[LiveIdDelta]) {
        for d in deltas {
            let i = d.dense_index as usize;
            if buf.len() <= i {
                buf.resize(i + 1, InstanceId::NULL);
            }
            buf[i] = d.id;
        }
    }

    #[test]
    fn remove_swaps_last_into_hole() {
        let mut c = ids(5);
        c.flush(100).unwrap();
        c.remove(InstanceId(2)).unwrap();
        assert_eq!(
            c.as_slice(),
            &[InstanceId(1), InstanceId(5), InstanceId(3), InstanceId(4)]
        );
        assert_eq!(c.dense_index(InstanceId(5)), Some(1));
        assert_eq!(c.dense_index(InstanceId(2)), None);
        let batch = c.flush(100).unwrap();
        assert_eq!(
            batch.records,
            vec![
                LiveIdDelta {
                    dense_index: 1,
                    id: InstanceId(5)
                },
                LiveIdDelta {
                    dense_index: 4,
                    id: InstanceId::NULL
                },
            ]
        );
    }

    #[test]
    fn removing_last_emits_only_null() {
        let mut c = ids(3);
        c.flush(100).unwrap();
        c.remove(InstanceId(3)).unwrap();
        let batch = c.flush(100).unwrap();
        assert_eq!(
            batch.records,
            vec![LiveIdDelta {
                dense_index: 2,
                id: InstanceId::NULL
            }]
        );
    }

    #[test]
    fn removing_missing_id_is_corrupt() {
        let mut c = ids(2);
        assert!(matches!(
            c.remove(InstanceId(9)),
            Err(SyncError::CorruptState { .. })
        ));
        c.remove(InstanceId(1)).unwrap();
        assert!(matches!(
            c.remove(InstanceId(1)),
            Err(SyncError::CorruptState { .. })
        ));
    }

    #[test]
    fn re_add_is_a_no_op_with_one_delta() {
        let mut c = ids(2);
        assert!(!c.add(InstanceId(1)).unwrap());
        assert_eq!(c.len(), 2);
        assert_eq!(c.pending(), 2);
    }

    #[test]
    fn remove_then_re_add_same_cycle_replays_correctly() {
        let mut c = ids(3);
        c.remove(InstanceId(3)).unwrap();
        c.add(InstanceId(3)).unwrap();
        let mut buf = Vec::new();
        replay(&mut buf, &c.flush(100).unwrap().records);
        assert_eq!(buf, vec![InstanceId(1), InstanceId(2), InstanceId(3)]);
    }

    #[test]
    fn null_id_rejected() {
        let mut c = ids(0);
        assert!(matches!(
            c.add(InstanceId::NULL),
            Err(SyncError::InvalidInstance { .. })
        ));
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn dense_array_stays_gapless_and_replays(
                ops in proptest::collection::vec((any::<bool>(), 1u32..40), 1..200),
                page in 1usize..16,
            ) {
                let mut c = IndirectIds::new(CapacityConfig::new(16, 16));
                let mut consumer: Vec<InstanceId> = Vec::new();
                for (add, raw) in ops {
                    let id = InstanceId(raw);
                    if add {
                        c.add(id).unwrap();
                    } else if c.contains(id) {
                        c.remove(id).unwrap();
                    }
                    // Gapless: every dense index maps back to its id.
                    for (i, live) in c.as_slice().iter().enumerate() {
                        prop_assert!(!live.is_null());
                        prop_assert_eq!(c.dense_index(*live), Some(i as u32));
                    }
                    // Drain in pages now and then.
                    if raw % 7 == 0 {
                        loop {
                            let batch = c.flush(page).unwrap();
                            replay(&mut consumer, &batch.records);
                            if batch.is_final() {
                                break;
                            }
                        }
                        prop_assert_eq!(&consumer[..c.len()], c.as_slice());
                    }
                }
            }
        }
    }
}
