//! The instance delta buffer.
//!
//! Producers report field changes through [`DeltaBuffer::record`]. The
//! buffer coalesces them so each instance appears at most once per cycle,
//! keeps the live-id array compact, and tracks per-group live counts.

use strata_arena::{CapacityConfig, SlotStore};
use strata_core::{DirtyFlags, GroupId, InstanceFields, InstanceId, SyncError};

use crate::coalesce::CoalescingLog;
use crate::groups::GroupCounts;
use crate::indirect::{IndirectIds, LiveIdDelta};
use crate::paged::Batch;

/// The net change of one instance within one cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct DeltaRecord<T> {
    /// The instance.
    pub id: InstanceId,
    /// Latest field values.
    pub fields: T,
    /// Union of every dirty mask recorded this cycle.
    pub dirty: DirtyFlags,
    /// Whether the instance ends the cycle deleted.
    pub deleted: bool,
}

/// What [`DeltaBuffer::record`] did with a change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new record was appended to the log.
    Appended,
    /// The change was merged into the instance's pending record.
    Coalesced,
}

/// Running counters of a [`DeltaBuffer`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeltaStats {
    /// Records appended.
    pub appended: u64,
    /// Changes merged into a pending record.
    pub coalesced: u64,
    /// Deletes recorded.
    pub deletes: u64,
    /// Completed flush cycles.
    pub cycles: u64,
}

/// Coalescing change log over instances with field payload `T`.
#[derive(Clone, Debug)]
pub struct DeltaBuffer<T> {
    log: CoalescingLog<DeltaRecord<T>>,
    live: IndirectIds,
    groups: GroupCounts,
    membership: SlotStore<Option<GroupId>>,
    stats: DeltaStats,
}

impl<T: InstanceFields> DeltaBuffer<T> {
    /// Create an empty buffer.
    pub fn new(config: CapacityConfig) -> Self {
        Self {
            log: CoalescingLog::new(config),
            live: IndirectIds::new(config),
            groups: GroupCounts::new(),
            membership: SlotStore::new(config),
            stats: DeltaStats::default(),
        }
    }

    /// Record a change to `id`.
    ///
    /// If `id` already has a pending record this cycle, the fields are
    /// replaced, the mask is OR-ed in, and the delete flag is set to
    /// `is_delete`. Otherwise a new record is appended. A delete removes
    /// `id` from the live array and its group; an update after a delete in
    /// the same cycle makes it live again.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidInstance`] for the null id,
    /// [`SyncError::CorruptState`] when deleting an instance that is not
    /// live, and [`SyncError::GroupUnderflow`] if group bookkeeping would
    /// go negative.
    pub fn record(
        &mut self,
        id: InstanceId,
        fields: T,
        dirty: DirtyFlags,
        is_delete: bool,
    ) -> Result<RecordOutcome, SyncError> {
        let slot = id.slot().ok_or(SyncError::InvalidInstance { id })?;

        if is_delete {
            self.live.remove(id)?;
            if let Some(group) = self.membership.get(slot).copied().flatten() {
                self.groups.decrement(group)?;
                self.membership.clear(slot);
            }
            self.stats.deletes += 1;
        } else {
            self.live.add(id)?;
            let old = self.membership.get(slot).copied().flatten();
            let new = fields.group();
            if old != new {
                if let Some(group) = old {
                    self.groups.decrement(group)?;
                }
                if let Some(group) = new {
                    self.groups.increment(group);
                }
                *self.membership.slot_mut(slot)? = new;
            }
        }

        if let Some(pending) = self.log.pending_mut(id) {
            // A delete carries no payload of its own; keep the last fields.
            if !is_delete {
                pending.fields = fields;
            }
            pending.dirty |= dirty;
            pending.deleted = is_delete;
            self.stats.coalesced += 1;
            return Ok(RecordOutcome::Coalesced);
        }

        self.log.append(
            id,
            DeltaRecord {
                id,
                fields,
                dirty,
                deleted: is_delete,
            },
        )?;
        self.stats.appended += 1;
        Ok(RecordOutcome::Appended)
    }

    /// Ship up to `max_batch_size` instance records.
    pub fn flush(&mut self, max_batch_size: usize) -> Result<Batch<DeltaRecord<T>>, SyncError> {
        let batch = self.log.flush(max_batch_size)?;
        if batch.is_final() {
            self.stats.cycles += 1;
        }
        Ok(batch)
    }

    /// Ship up to `max_batch_size` live-id array deltas.
    pub fn flush_live_ids(
        &mut self,
        max_batch_size: usize,
    ) -> Result<Batch<LiveIdDelta>, SyncError> {
        self.live.flush(max_batch_size)
    }
}

impl<T> DeltaBuffer<T> {
    /// Number of live instances.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Whether `id` is live.
    pub fn is_live(&self, id: InstanceId) -> bool {
        self.live.contains(id)
    }

    /// The dense live-id array.
    pub fn live_ids(&self) -> &[InstanceId] {
        self.live.as_slice()
    }

    /// Dense index of `id` in the live array.
    pub fn dense_index(&self, id: InstanceId) -> Option<u32> {
        self.live.dense_index(id)
    }

    /// Live instances in `group`.
    pub fn count_for_group(&self, group: GroupId) -> u32 {
        self.groups.count(group)
    }

    /// Per-group live counts.
    pub fn groups(&self) -> &GroupCounts {
        &self.groups
    }

    /// Whether `id` has a mutable record this cycle.
    pub fn has_pending(&self, id: InstanceId) -> bool {
        self.log.has_pending(id)
    }

    /// Instance records waiting to be flushed.
    pub fn pending(&self) -> usize {
        self.log.pending()
    }

    /// Live-id deltas waiting to be flushed.
    pub fn pending_live_ids(&self) -> usize {
        self.live.pending()
    }

    /// Whether both logs are fully drained.
    pub fn is_drained(&self) -> bool {
        self.log.is_drained() && self.live.is_drained()
    }

    /// Iterate over pending instance records.
    pub fn iter_pending(&self) -> impl Iterator<Item = &DeltaRecord<T>> {
        self.log.iter_pending()
    }

    /// Running counters.
    pub fn stats(&self) -> DeltaStats {
        self.stats
    }

    /// Resizes of every per-id table the buffer owns.
    pub fn storage_growth_events(&self) -> u32 {
        self.log.storage_growth_events()
            + self.live.storage_growth_events()
            + self.membership.growth_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::InstanceData;

    fn buffer() -> DeltaBuffer<InstanceData> {
        DeltaBuffer::new(CapacityConfig::new(64, 64))
    }

    fn at(x: f32) -> InstanceData {
        InstanceData::default().at([x, 0.0, 0.0])
    }

    #[test]
    fn updates_coalesce_within_a_cycle() {
        let mut b = buffer();
        let id = InstanceId(1);
        assert_eq!(
            b.record(id, at(1.0), DirtyFlags::TRANSFORM, false).unwrap(),
            RecordOutcome::Appended
        );
        assert_eq!(
            b.record(id, at(2.0), DirtyFlags::COLOR, false).unwrap(),
            RecordOutcome::Coalesced
        );
        let batch = b.flush(10).unwrap();
        assert_eq!(batch.len(), 1);
        let rec = &batch.records[0];
        assert_eq!(rec.fields.position, [2.0, 0.0, 0.0]);
        assert_eq!(rec.dirty, DirtyFlags::TRANSFORM | DirtyFlags::COLOR);
        assert!(!rec.deleted);
    }

    #[test]
    fn next_cycle_appends_again() {
        let mut b = buffer();
        let id = InstanceId(1);
        b.record(id, at(1.0), DirtyFlags::TRANSFORM, false).unwrap();
        b.flush(10).unwrap();
        assert_eq!(
            b.record(id, at(2.0), DirtyFlags::TRANSFORM, false).unwrap(),
            RecordOutcome::Appended
        );
        assert_eq!(b.stats().cycles, 1);
    }

    #[test]
    fn write_after_partial_flush_appends_fresh_record() {
        let mut b = buffer();
        b.record(InstanceId(1), at(1.0), DirtyFlags::TRANSFORM, false)
            .unwrap();
        b.record(InstanceId(2), at(1.0), DirtyFlags::TRANSFORM, false)
            .unwrap();
        let first = b.flush(1).unwrap();
        assert_eq!(first.records[0].id, InstanceId(1));
        assert_eq!(
            b.record(InstanceId(1), at(5.0), DirtyFlags::COLOR, false)
                .unwrap(),
            RecordOutcome::Appended
        );
        let rest = b.flush(10).unwrap();
        assert_eq!(rest.records.len(), 2);
        assert_eq!(rest.records[1].fields.position, [5.0, 0.0, 0.0]);
        assert_eq!(rest.records[1].dirty, DirtyFlags::COLOR);
    }

    #[test]
    fn delete_merges_and_removes_from_live() {
        let mut b = buffer();
        let id = InstanceId(4);
        b.record(id, at(3.0), DirtyFlags::TRANSFORM, false).unwrap();
        b.record(id, InstanceData::default(), DirtyFlags::NONE, true)
            .unwrap();
        assert_eq!(b.live_count(), 0);
        let batch = b.flush(10).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(batch.records[0].deleted);
        assert_eq!(batch.records[0].fields.position, [3.0, 0.0, 0.0]);
    }

    #[test]
    fn double_delete_is_corrupt() {
        let mut b = buffer();
        let id = InstanceId(4);
        b.record(id, at(0.0), DirtyFlags::ALL, false).unwrap();
        b.record(id, at(0.0), DirtyFlags::NONE, true).unwrap();
        assert!(matches!(
            b.record(id, at(0.0), DirtyFlags::NONE, true),
            Err(SyncError::CorruptState { .. })
        ));
    }

    #[test]
    fn update_after_delete_revives() {
        let mut b = buffer();
        let id = InstanceId(2);
        b.record(id, at(0.0), DirtyFlags::ALL, false).unwrap();
        b.record(id, at(0.0), DirtyFlags::NONE, true).unwrap();
        b.record(id, at(7.0), DirtyFlags::TRANSFORM, false).unwrap();
        assert!(b.is_live(id));
        let batch = b.flush(10).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(!batch.records[0].deleted);
    }

    #[test]
    fn null_instance_rejected() {
        let mut b = buffer();
        assert_eq!(
            b.record(InstanceId::NULL, at(0.0), DirtyFlags::ALL, false),
            Err(SyncError::InvalidInstance {
                id: InstanceId::NULL
            })
        );
    }

    #[test]
    fn group_counts_follow_membership() {
        let mut b = buffer();
        let g1 = GroupId(1);
        let g2 = GroupId(2);
        b.record(InstanceId(1), InstanceData::in_group(g1), DirtyFlags::GROUP, false)
            .unwrap();
        b.record(InstanceId(2), InstanceData::in_group(g1), DirtyFlags::GROUP, false)
            .unwrap();
        assert_eq!(b.count_for_group(g1), 2);

        b.record(InstanceId(2), InstanceData::in_group(g2), DirtyFlags::GROUP, false)
            .unwrap();
        assert_eq!(b.count_for_group(g1), 1);
        assert_eq!(b.count_for_group(g2), 1);

        b.record(InstanceId(1), InstanceData::default(), DirtyFlags::NONE, true)
            .unwrap();
        assert_eq!(b.count_for_group(g1), 0);
        assert_eq!(b.groups().total(), 1);
    }

    #[test]
    fn live_id_deltas_are_separate() {
        let mut b = buffer();
        b.record(InstanceId(1), at(0.0), DirtyFlags::ALL, false).unwrap();
        b.record(InstanceId(2), at(0.0), DirtyFlags::ALL, false).unwrap();
        b.flush(10).unwrap();
        assert!(!b.is_drained());
        let ids = b.flush_live_ids(10).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(b.is_drained());
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::{HashMap, HashSet};

        proptest! {
            #[test]
            fn one_record_per_id_carries_union_and_last_write(
                writes in proptest::collection::vec(
                    (1u32..32, 0u32..(1 << 7), -100.0f32..100.0),
                    1..300,
                ),
            ) {
                let mut b = buffer();
                let mut expected: HashMap<u32, (u32, f32)> = HashMap::new();
                for (raw, bits, x) in &writes {
                    b.record(InstanceId(*raw), at(*x), DirtyFlags::from_bits(*bits), false)
                        .unwrap();
                    let entry = expected.entry(*raw).or_insert((0, 0.0));
                    entry.0 |= bits;
                    entry.1 = *x;
                }
                let batch = b.flush(1000).unwrap();
                prop_assert_eq!(batch.len(), expected.len());
                for rec in &batch.records {
                    let (mask, x) = expected[&rec.id.0];
                    prop_assert_eq!(rec.dirty, DirtyFlags::from_bits(mask));
                    prop_assert_eq!(rec.fields.position, [x, 0.0, 0.0]);
                    prop_assert!(!rec.deleted);
                }
                let seen: HashSet<_> = batch.records.iter().map(|r| r.id.0).collect();
                prop_assert_eq!(seen.len(), expected.len());
            }
        }
    }
}
