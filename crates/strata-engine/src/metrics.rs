//! Running counters for the synchronization engine.

/// Cumulative counters since the engine was constructed, plus a few
/// gauges sampled when [`metrics()`](crate::SynchronizationEngine::metrics)
/// is called.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncMetrics {
    /// Instance records appended to the update log.
    pub records_appended: u64,
    /// Instance writes merged into a pending record.
    pub records_coalesced: u64,
    /// Deletes recorded.
    pub deletes: u64,
    /// Structural deltas logged by the hierarchy.
    pub structural_deltas: u64,
    /// Reparents that changed depth and cascaded.
    pub depth_cascades: u64,
    /// Descendants moved by cascades and deletes.
    pub descendants_moved: u64,
    /// Times the logical instance capacity grew. This tracks the id
    /// range only; see `storage_growth_events` for the backing tables.
    pub capacity_growth_events: u32,
    /// Resizes of the per-id backing tables (allocator flags, coalescing
    /// stamps, live-id slots, group membership, hierarchy nodes and child
    /// lists), summed when sampled.
    pub storage_growth_events: u64,
    /// Releases held back until the logs drained.
    pub deferred_releases: u64,
    /// Flush calls that returned a page.
    pub flush_pages: u64,
    /// Update cycles fully drained.
    pub update_cycles: u64,
    /// Gauge: live instances.
    pub live_instances: usize,
    /// Gauge: releases still waiting for a drain.
    pub pending_releases: usize,
}
