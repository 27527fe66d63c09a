//! The synchronization engine.

use std::sync::Arc;

use indexmap::IndexSet;
use strata_arena::{BlockIdAllocator, CapacityConfig, IdAllocator, IdBlock, ScratchPool};
use strata_core::{Depth, DirtyFlags, GroupId, InstanceData, InstanceFields, InstanceId, SyncError};
use strata_delta::{Batch, DeltaBuffer, DeltaRecord, LiveIdDelta, RecordOutcome};
use strata_hierarchy::{DepthMap, StructuralDelta};

use crate::config::{ConfigError, SyncConfig};
use crate::metrics::SyncMetrics;

/// Owner of all synchronization state for one consumer.
///
/// # Cycle protocol
///
/// 1. Upstream calls [`allocate_id`](Self::allocate_id),
///    [`record_update`](Self::record_update),
///    [`record_delete`](Self::record_delete),
///    [`set_parent`](Self::set_parent), and
///    [`release_id`](Self::release_id) in any order.
/// 2. The consumer calls each `flush_*` method until it returns a final
///    page ([`Batch::is_final`]). Each log closes its cycle independently.
/// 3. Once every log is drained, deferred releases take effect and their
///    ids become available to `allocate_id` again.
pub struct SynchronizationEngine<T = InstanceData> {
    config: SyncConfig,
    capacity_policy: CapacityConfig,
    /// Logical instance capacity: the id range the policy has grown to.
    /// Backing tables grow on their own as ids touch them; their resizes
    /// are reported as `storage_growth_events`.
    capacity: usize,
    ids: IdAllocator,
    bones: BlockIdAllocator,
    deltas: DeltaBuffer<T>,
    hierarchy: DepthMap,
    /// Released ids waiting for every log to drain.
    pending_release: IndexSet<InstanceId>,
    scratch: Arc<ScratchPool<InstanceId>>,
    metrics: SyncMetrics,
}

impl<T: InstanceFields> SynchronizationEngine<T> {
    /// Validate `config` and build an empty engine.
    pub fn new(config: SyncConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy = config.capacity();
        let scratch = Arc::new(ScratchPool::new(config.scratch_pool_size));
        let hierarchy = DepthMap::new(config.depth_ceiling(), policy)
            .with_scratch(Arc::clone(&scratch))
            .with_cycle_check(config.check_cycles);
        Ok(Self {
            capacity_policy: policy,
            capacity: policy.initial_capacity,
            ids: IdAllocator::new(policy),
            bones: BlockIdAllocator::new(config.bones_per_skeleton, policy),
            deltas: DeltaBuffer::new(policy),
            hierarchy,
            pending_release: IndexSet::new(),
            scratch,
            metrics: SyncMetrics::default(),
            config,
        })
    }

    // ── Upstream ───────────────────────────────────────────────

    /// Issue a fresh instance id, reusing the smallest released id first.
    pub fn allocate_id(&mut self) -> Result<InstanceId, SyncError> {
        let id = self.ids.allocate()?;
        let required = id.0 as usize;
        if required > self.capacity {
            let grown = self.capacity_policy.grown_capacity(required)?;
            log::debug!(
                "instance capacity grow: {} -> {grown} (id {id})",
                self.capacity
            );
            self.capacity = grown;
            self.metrics.capacity_growth_events += 1;
        }
        Ok(id)
    }

    /// Release `id` for reuse.
    ///
    /// A live instance is deleted first. If any log still holds
    /// unflushed records the release is deferred until all of them have
    /// drained, so an id is never reissued while the consumer may still
    /// receive records about its previous life.
    pub fn release_id(&mut self, id: InstanceId) -> Result<(), SyncError> {
        if self.pending_release.contains(&id) {
            return Err(SyncError::AlreadyReleased { id });
        }
        if !self.ids.is_live(id) {
            // Let the allocator classify the failure.
            return self.ids.release(id);
        }
        if self.deltas.is_live(id) || self.hierarchy.is_initialized(id) {
            self.record_delete(id)?;
        }
        if self.is_drained() {
            self.ids.release(id)
        } else {
            log::debug!("release of {id} deferred until logs drain");
            self.pending_release.insert(id);
            self.metrics.deferred_releases += 1;
            Ok(())
        }
    }

    /// Record new field values for `id`.
    ///
    /// The first update of an instance also places it in the hierarchy as
    /// a root.
    pub fn record_update(
        &mut self,
        id: InstanceId,
        fields: T,
        dirty: DirtyFlags,
    ) -> Result<RecordOutcome, SyncError> {
        self.ensure_issued(id)?;
        let outcome = self.deltas.record(id, fields, dirty, false)?;
        self.hierarchy.register(id)?;
        Ok(outcome)
    }

    /// Delete `id`: it leaves the live set and its group, and its
    /// descendants become roots. Deleting twice is
    /// [`SyncError::CorruptState`].
    pub fn record_delete(&mut self, id: InstanceId) -> Result<(), SyncError> {
        self.ensure_issued(id)?;
        let in_hierarchy = self.hierarchy.is_initialized(id);
        // An instance parented before its first update is not in the live
        // set; only its hierarchy node goes.
        if self.deltas.is_live(id) || !in_hierarchy {
            self.deltas
                .record(id, T::default(), DirtyFlags::NONE, true)?;
        }
        if in_hierarchy {
            self.hierarchy.delete(id)?;
        }
        Ok(())
    }

    /// Make `parent` the parent of `id`; a null `parent` makes `id` a root.
    pub fn set_parent(&mut self, id: InstanceId, parent: InstanceId) -> Result<(), SyncError> {
        self.ensure_issued(id)?;
        self.hierarchy.set_parent(id, parent)
    }

    /// Issue a contiguous block of `bones_per_skeleton` bone ids.
    pub fn allocate_bone_block(&mut self) -> Result<IdBlock, SyncError> {
        self.bones.allocate()
    }

    /// Return a bone block issued by
    /// [`allocate_bone_block`](Self::allocate_bone_block).
    pub fn release_bone_block(&mut self, block: IdBlock) -> Result<(), SyncError> {
        self.bones.release(block)
    }

    // ── Downstream ─────────────────────────────────────────────

    /// Next page of coalesced instance records, at most
    /// `min(max_batch, max_delta_batch_size)` long.
    pub fn flush_updates(&mut self, max_batch: usize) -> Result<Batch<DeltaRecord<T>>, SyncError> {
        let batch = self.deltas.flush(self.page_size(max_batch))?;
        self.after_flush(batch.is_final());
        if batch.is_final() {
            self.metrics.update_cycles += 1;
        }
        Ok(batch)
    }

    /// Next page of live-id array writes.
    pub fn flush_live_ids(&mut self, max_batch: usize) -> Result<Batch<LiveIdDelta>, SyncError> {
        let batch = self.deltas.flush_live_ids(self.page_size(max_batch))?;
        self.after_flush(batch.is_final());
        Ok(batch)
    }

    /// Next page of level array writes.
    pub fn flush_structural_deltas(
        &mut self,
        max_batch: usize,
    ) -> Result<Batch<StructuralDelta>, SyncError> {
        let batch = self.hierarchy.flush(self.page_size(max_batch))?;
        self.after_flush(batch.is_final());
        Ok(batch)
    }
}

impl<T> SynchronizationEngine<T> {
    /// Number of live instances.
    pub fn live_count(&self) -> usize {
        self.deltas.live_count()
    }

    /// Live instances counted towards `group`.
    pub fn count_for_group(&self, group: GroupId) -> u32 {
        self.deltas.count_for_group(group)
    }

    /// Direct children of `id`.
    pub fn children_of(&self, id: InstanceId) -> Result<Vec<InstanceId>, SyncError> {
        self.hierarchy.get_children(id, false)
    }

    /// Every descendant of `id`, level by level.
    pub fn descendants_of(&self, id: InstanceId) -> Result<Vec<InstanceId>, SyncError> {
        self.hierarchy.get_children(id, true)
    }

    /// Ancestors of `id`, nearest first.
    pub fn parents_of(&self, id: InstanceId) -> Result<Vec<InstanceId>, SyncError> {
        self.hierarchy.get_parents(id, true)
    }

    /// Parent of `id` (null for roots), if it is in the hierarchy.
    pub fn parent_of(&self, id: InstanceId) -> Option<InstanceId> {
        self.hierarchy.parent(id)
    }

    /// Depth of `id`, if it is in the hierarchy.
    pub fn depth_of(&self, id: InstanceId) -> Option<Depth> {
        self.hierarchy.depth(id)
    }

    /// The dense array of hierarchy level `depth`.
    pub fn level(&self, depth: Depth) -> &[InstanceId] {
        self.hierarchy.level(depth)
    }

    /// Number of hierarchy levels allocated.
    pub fn level_count(&self) -> usize {
        self.hierarchy.level_count()
    }

    /// The gapless live-id array.
    pub fn live_ids(&self) -> &[InstanceId] {
        self.deltas.live_ids()
    }

    /// Read access to the hierarchy.
    pub fn hierarchy(&self) -> &DepthMap {
        &self.hierarchy
    }

    /// Logical instance capacity: ids `1..=capacity` fit without another
    /// growth step. Individual backing tables may lag behind until an id
    /// touches them.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether `id` is issued and not released (deferred releases count
    /// as released).
    pub fn is_issued(&self, id: InstanceId) -> bool {
        self.ids.is_live(id) && !self.pending_release.contains(&id)
    }

    /// Whether every log is fully drained.
    pub fn is_drained(&self) -> bool {
        self.deltas.is_drained() && self.hierarchy.is_drained()
    }

    /// The pool traversal buffers are borrowed from. Background workers
    /// may share it.
    pub fn scratch_pool(&self) -> Arc<ScratchPool<InstanceId>> {
        Arc::clone(&self.scratch)
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Counters and gauges.
    pub fn metrics(&self) -> SyncMetrics {
        let deltas = self.deltas.stats();
        let hierarchy = self.hierarchy.stats();
        SyncMetrics {
            records_appended: deltas.appended,
            records_coalesced: deltas.coalesced,
            deletes: deltas.deletes,
            structural_deltas: hierarchy.structural_deltas,
            depth_cascades: hierarchy.cascades,
            descendants_moved: hierarchy.descendants_moved,
            storage_growth_events: u64::from(self.ids.storage_growth_events())
                + u64::from(self.deltas.storage_growth_events())
                + u64::from(self.hierarchy.storage_growth_events()),
            live_instances: self.deltas.live_count(),
            pending_releases: self.pending_release.len(),
            ..self.metrics.clone()
        }
    }

    fn ensure_issued(&self, id: InstanceId) -> Result<(), SyncError> {
        if self.is_issued(id) {
            Ok(())
        } else {
            Err(SyncError::InvalidId { id })
        }
    }

    fn page_size(&self, max_batch: usize) -> usize {
        max_batch.min(self.config.max_delta_batch_size)
    }

    fn after_flush(&mut self, final_page: bool) {
        self.metrics.flush_pages += 1;
        if final_page && !self.pending_release.is_empty() && self.is_drained() {
            self.settle_releases();
        }
    }

    fn settle_releases(&mut self) {
        let released = self.pending_release.len();
        for id in self.pending_release.drain(..) {
            // Entries were validated when queued and the allocator has not
            // seen them since.
            if let Err(e) = self.ids.release(id) {
                log::warn!("deferred release of {id} failed: {e}");
            }
        }
        log::debug!("settled {released} deferred releases");
    }
}
