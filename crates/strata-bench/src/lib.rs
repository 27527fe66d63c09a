//! Benchmark profiles for the Strata synchronization engine.
//!
//! - [`reference_config`]: 16K initial instances, default batch width
//! - [`populated_engine`]: an engine with `n` live root instances
//! - [`deep_forest`]: `trees` chains of `depth` instances each

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use strata_core::{DirtyFlags, InstanceData, InstanceId, SyncError};
use strata_engine::{ConfigError, SyncConfig, SynchronizationEngine};

/// Configuration shared by every benchmark: room for 16K instances up
/// front and a 1K page cap.
pub fn reference_config() -> SyncConfig {
    SyncConfig {
        initial_capacity: 16 * 1024,
        max_delta_batch_size: 1024,
        ..SyncConfig::default()
    }
}

/// Engine with `n` live root instances, all logs drained.
pub fn populated_engine(
    n: usize,
) -> Result<(SynchronizationEngine, Vec<InstanceId>), ConfigError> {
    let mut engine = SynchronizationEngine::new(reference_config())?;
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let id = engine.allocate_id()?;
        engine.record_update(
            id,
            InstanceData::default().at([i as f32, 0.0, 0.0]),
            DirtyFlags::ALL,
        )?;
        ids.push(id);
    }
    drain(&mut engine)?;
    Ok((engine, ids))
}

/// Link `ids` into `trees` parent chains of `depth` instances each.
/// Returns the chain roots.
pub fn deep_forest(
    engine: &mut SynchronizationEngine,
    ids: &[InstanceId],
    trees: usize,
    depth: usize,
) -> Result<Vec<InstanceId>, SyncError> {
    let mut roots = Vec::with_capacity(trees);
    for chain in ids.chunks(depth).take(trees) {
        roots.push(chain[0]);
        for pair in chain.windows(2) {
            engine.set_parent(pair[1], pair[0])?;
        }
    }
    Ok(roots)
}

/// Drain every log of `engine` in maximum-size pages.
pub fn drain(engine: &mut SynchronizationEngine) -> Result<usize, SyncError> {
    let mut pages = 0;
    while !engine.flush_updates(usize::MAX)?.is_final() {
        pages += 1;
    }
    while !engine.flush_live_ids(usize::MAX)?.is_final() {
        pages += 1;
    }
    while !engine.flush_structural_deltas(usize::MAX)?.is_final() {
        pages += 1;
    }
    Ok(pages + 3)
}
