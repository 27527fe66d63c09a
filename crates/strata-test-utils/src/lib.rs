//! Test fixtures and a replaying consumer for Strata development.
//!
//! [`MirrorConsumer`] plays the downstream role: it drains every log of a
//! [`SynchronizationEngine`] and applies the pages to its own buffers, so
//! tests can compare the consumer's view with the engine's state.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use indexmap::IndexMap;

use strata_core::{Depth, DirtyFlags, InstanceData, InstanceFields, InstanceId, SyncError};
use strata_delta::{DeltaRecord, LiveIdDelta};
use strata_engine::{SyncConfig, SynchronizationEngine};
use strata_hierarchy::StructuralDelta;

/// Config with a small, aligned capacity for growth tests.
pub fn small_config(initial_capacity: usize, batch_width: usize) -> SyncConfig {
    SyncConfig {
        initial_capacity,
        parallel_batch_width: batch_width,
        growth_step_cap: batch_width * 16,
        ..SyncConfig::default()
    }
}

/// Engine over [`InstanceData`] built from `config`.
///
/// # Panics
///
/// Panics if `config` is invalid.
pub fn engine(config: SyncConfig) -> SynchronizationEngine {
    SynchronizationEngine::new(config).expect("test config must be valid")
}

/// Allocate `n` ids and give each a default-valued first update.
pub fn spawn<T: InstanceFields>(
    engine: &mut SynchronizationEngine<T>,
    n: usize,
) -> Result<Vec<InstanceId>, SyncError> {
    let mut ids = Vec::with_capacity(n);
    for _ in 0..n {
        let id = engine.allocate_id()?;
        engine.record_update(id, T::default(), DirtyFlags::ALL)?;
        ids.push(id);
    }
    Ok(ids)
}

/// Allocate a chain `ids[0] <- ids[1] <- ... <- ids[n-1]`.
pub fn spawn_chain(
    engine: &mut SynchronizationEngine,
    n: usize,
) -> Result<Vec<InstanceId>, SyncError> {
    let ids = spawn(engine, n)?;
    for pair in ids.windows(2) {
        engine.set_parent(pair[1], pair[0])?;
    }
    Ok(ids)
}

/// A record positioned at `x`.
pub fn at(x: f32) -> InstanceData {
    InstanceData::default().at([x, 0.0, 0.0])
}

/// Downstream mirror rebuilt purely from flushed pages.
#[derive(Debug)]
pub struct MirrorConsumer<T = InstanceData> {
    pub instances: IndexMap<InstanceId, T>,
    pub dirty: IndexMap<InstanceId, DirtyFlags>,
    pub live: Vec<InstanceId>,
    /// Per level: `(id, parent)` at each dense index.
    pub levels: Vec<Vec<(InstanceId, InstanceId)>>,
    pub pages: usize,
}

impl<T> Default for MirrorConsumer<T> {
    fn default() -> Self {
        Self {
            instances: IndexMap::new(),
            dirty: IndexMap::new(),
            live: Vec::new(),
            levels: Vec::new(),
            pages: 0,
        }
    }
}

impl<T: InstanceFields> MirrorConsumer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_updates(&mut self, records: &[DeltaRecord<T>]) {
        for r in records {
            if r.deleted {
                self.instances.swap_remove(&r.id);
                self.dirty.swap_remove(&r.id);
            } else {
                self.instances.insert(r.id, r.fields.clone());
                self.dirty.insert(r.id, r.dirty);
            }
        }
    }

    pub fn apply_live_ids(&mut self, deltas: &[LiveIdDelta]) {
        for d in deltas {
            write_slot(&mut self.live, d.dense_index as usize, d.id, InstanceId::NULL);
        }
    }

    pub fn apply_structural(&mut self, deltas: &[StructuralDelta]) {
        for d in deltas {
            let depth = d.depth as usize;
            while self.levels.len() <= depth {
                self.levels.push(Vec::new());
            }
            write_slot(
                &mut self.levels[depth],
                d.dense_index as usize,
                (d.id, d.parent),
                (InstanceId::NULL, InstanceId::NULL),
            );
        }
    }

    /// Drain every log of `engine` in pages of `page` and apply them.
    pub fn sync(
        &mut self,
        engine: &mut SynchronizationEngine<T>,
        page: usize,
    ) -> Result<(), SyncError> {
        loop {
            let batch = engine.flush_updates(page)?;
            self.apply_updates(&batch.records);
            self.pages += 1;
            if batch.is_final() {
                break;
            }
        }
        loop {
            let batch = engine.flush_live_ids(page)?;
            self.apply_live_ids(&batch.records);
            self.pages += 1;
            if batch.is_final() {
                break;
            }
        }
        loop {
            let batch = engine.flush_structural_deltas(page)?;
            self.apply_structural(&batch.records);
            self.pages += 1;
            if batch.is_final() {
                break;
            }
        }
        Ok(())
    }
}

impl<T> MirrorConsumer<T> {
    /// Occupied prefix of the live-id buffer.
    pub fn live_ids(&self) -> &[InstanceId] {
        occupied_prefix(&self.live, |id| id.is_null())
    }

    /// Occupied prefix of level `depth`.
    pub fn level(&self, depth: Depth) -> &[(InstanceId, InstanceId)] {
        match self.levels.get(depth as usize) {
            Some(level) => occupied_prefix(level, |(id, _)| id.is_null()),
            None => &[],
        }
    }

    /// Depth and parent of `id` as seen by the consumer.
    pub fn placement(&self, id: InstanceId) -> Option<(Depth, InstanceId)> {
        (0..self.levels.len()).find_map(|d| {
            self.level(d as Depth)
                .iter()
                .find(|(i, _)| *i == id)
                .map(|(_, parent)| (d as Depth, *parent))
        })
    }
}

fn write_slot<V: Copy>(buf: &mut Vec<V>, index: usize, value: V, empty: V) {
    if buf.len() <= index {
        buf.resize(index + 1, empty);
    }
    buf[index] = value;
}

fn occupied_prefix<V>(buf: &[V], is_empty: impl Fn(&V) -> bool) -> &[V] {
    let end = buf.iter().position(is_empty).unwrap_or(buf.len());
    &buf[..end]
}
