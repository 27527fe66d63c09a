//! The hierarchy depth map.
//!
//! # State per instance
//!
//! A node is either unregistered (the default slot value) or initialized
//! with a parent, a depth, and its index inside `levels[depth]`. The
//! invariant maintained after every public call:
//!
//! - `depth == 0` iff `parent` is null, else `depth == depth(parent) + 1`
//! - `levels[depth][dense_index] == id`
//! - `depth < max_depth`
//! - `id` is in `children[parent]` iff `parent` is non-null
//!
//! # Traversal bounds
//!
//! Every walk over the graph is iterative and bounded by `max_depth`
//! levels. Hitting the bound during a read means the graph holds a cycle
//! and is reported as [`SyncError::CorruptState`].

use std::sync::Arc;

use strata_arena::{CapacityConfig, ScratchPool, SlotStore};
use strata_core::error::corrupt;
use strata_core::{Depth, InstanceId, SyncError};
use strata_delta::{Batch, PagedLog};

use crate::children::ChildList;
use crate::delta::StructuralDelta;

/// Hierarchy state of one instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HierarchyNode {
    /// Parent id, or null for roots.
    pub parent: InstanceId,
    /// Topological rank. Roots are 0.
    pub depth: Depth,
    /// Index within the node's depth level.
    pub dense_index: u32,
    /// Whether the node has been placed in a level.
    pub initialized: bool,
}

/// Running counters of a [`DepthMap`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HierarchyStats {
    /// Structural deltas logged.
    pub structural_deltas: u64,
    /// Reparents that changed depth and walked a subtree.
    pub cascades: u64,
    /// Descendants moved by cascades and deletes.
    pub descendants_moved: u64,
}

/// Parent/child graph with per-depth dense arrays.
#[derive(Debug)]
pub struct DepthMap {
    nodes: SlotStore<HierarchyNode>,
    children: SlotStore<ChildList>,
    levels: Vec<Vec<InstanceId>>,
    log: PagedLog<StructuralDelta>,
    scratch: Arc<ScratchPool<InstanceId>>,
    max_depth: Depth,
    check_cycles: bool,
    config: CapacityConfig,
    stats: HierarchyStats,
}

impl DepthMap {
    /// Create an empty map. Nodes may occupy depths `0..max_depth`.
    pub fn new(max_depth: Depth, config: CapacityConfig) -> Self {
        Self {
            nodes: SlotStore::new(config),
            children: SlotStore::new(config),
            levels: Vec::new(),
            log: PagedLog::new(config),
            scratch: Arc::new(ScratchPool::default()),
            max_depth,
            check_cycles: true,
            config,
            stats: HierarchyStats::default(),
        }
    }

    /// Borrow traversal stacks from a shared pool.
    pub fn with_scratch(mut self, scratch: Arc<ScratchPool<InstanceId>>) -> Self {
        self.scratch = scratch;
        self
    }

    /// Enable or disable the ancestor walk that rejects cycles in
    /// [`set_parent`](Self::set_parent). Enabled by default.
    ///
    /// With the check off, callers must never parent a node under its own
    /// descendant; doing so fails later with a depth or corruption error.
    pub fn with_cycle_check(mut self, enabled: bool) -> Self {
        self.check_cycles = enabled;
        self
    }

    /// The exclusive depth ceiling.
    pub fn max_depth(&self) -> Depth {
        self.max_depth
    }

    // ── Queries ─────────────────────────────────────────────────

    /// The node of `id`, if initialized.
    pub fn node(&self, id: InstanceId) -> Option<&HierarchyNode> {
        self.nodes.get(id.slot()?).filter(|n| n.initialized)
    }

    /// Whether `id` has been placed in the hierarchy.
    pub fn is_initialized(&self, id: InstanceId) -> bool {
        self.node(id).is_some()
    }

    /// Depth of `id`, if initialized.
    pub fn depth(&self, id: InstanceId) -> Option<Depth> {
        self.node(id).map(|n| n.depth)
    }

    /// Parent of `id` (null for roots), if initialized.
    pub fn parent(&self, id: InstanceId) -> Option<InstanceId> {
        self.node(id).map(|n| n.parent)
    }

    /// Child list of `id`, or `None` past the allocated range.
    pub fn child_list(&self, id: InstanceId) -> Option<&ChildList> {
        self.children.get(id.slot()?)
    }

    /// The dense array of `depth`. Levels never populated are empty.
    pub fn level(&self, depth: Depth) -> &[InstanceId] {
        self.levels
            .get(depth as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of level arrays allocated so far (one past the deepest level
    /// ever populated).
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Number of initialized nodes.
    pub fn len(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// Whether no node is initialized.
    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(Vec::is_empty)
    }

    /// Running counters.
    pub fn stats(&self) -> HierarchyStats {
        self.stats
    }

    /// Resizes of the node and child-list tables.
    pub fn storage_growth_events(&self) -> u32 {
        self.nodes.growth_events() + self.children.growth_events()
    }

    /// Structural deltas waiting to be flushed.
    pub fn pending(&self) -> usize {
        self.log.pending()
    }

    /// Whether the structural log is fully drained.
    pub fn is_drained(&self) -> bool {
        self.log.is_drained()
    }

    /// Ship up to `max_batch_size` structural deltas.
    pub fn flush(&mut self, max_batch_size: usize) -> Result<Batch<StructuralDelta>, SyncError> {
        self.log.flush(max_batch_size)
    }

    // ── Mutation ────────────────────────────────────────────────

    /// Place `id` as a root at depth 0 if it is not initialized yet.
    ///
    /// Returns `Ok(true)` if the node was newly placed.
    pub fn register(&mut self, id: InstanceId) -> Result<bool, SyncError> {
        if id.is_null() {
            return Err(SyncError::InvalidId { id });
        }
        if self.is_initialized(id) {
            return Ok(false);
        }
        self.place(id, 0, InstanceId::NULL)?;
        Ok(true)
    }

    /// Make `new_parent` the parent of `id` (null makes `id` a root).
    ///
    /// An unregistered `id` is placed directly at its new depth. If the
    /// depth of an initialized node changes, the node and every descendant
    /// move to their new levels. Nothing is mutated when validation fails.
    ///
    /// # Errors
    ///
    /// - [`SyncError::InvalidId`]: `id` is null.
    /// - [`SyncError::SelfParent`]: `new_parent == id`.
    /// - [`SyncError::InvalidParent`]: `new_parent` is not initialized.
    /// - [`SyncError::RedundantParent`]: `new_parent` is already the parent.
    /// - [`SyncError::CycleDetected`]: `new_parent` is a descendant of `id`
    ///   (only with the cycle check enabled).
    /// - [`SyncError::MaxDepthExceeded`]: some node of the subtree would
    ///   reach `max_depth`.
    pub fn set_parent(&mut self, id: InstanceId, new_parent: InstanceId) -> Result<(), SyncError> {
        if id.is_null() {
            return Err(SyncError::InvalidId { id });
        }
        if new_parent == id {
            return Err(SyncError::SelfParent { id });
        }
        let parent_depth = if new_parent.is_null() {
            None
        } else {
            match self.node(new_parent) {
                Some(n) => Some(n.depth),
                None => {
                    return Err(SyncError::InvalidParent {
                        id,
                        parent: new_parent,
                    })
                }
            }
        };
        let old = self.node(id).copied();
        if let Some(old) = old {
            if old.parent == new_parent {
                return Err(SyncError::RedundantParent {
                    id,
                    parent: new_parent,
                });
            }
            if self.check_cycles && !new_parent.is_null() && self.is_ancestor(id, new_parent)? {
                return Err(SyncError::CycleDetected {
                    id,
                    parent: new_parent,
                });
            }
        }
        let new_depth = parent_depth.map_or(0, |d| u32::from(d) + 1);

        // Depth pre-check over the whole subtree before touching anything.
        let height = match old {
            Some(old) if new_depth > u32::from(old.depth) => {
                u32::from(self.subtree_max_depth(id)? - old.depth)
            }
            _ => 0,
        };
        if new_depth + height >= u32::from(self.max_depth) {
            return Err(SyncError::MaxDepthExceeded {
                id,
                depth: new_depth + height,
                max_depth: self.max_depth,
            });
        }
        let new_depth = new_depth as Depth;

        match old {
            None => {
                self.link(id, new_parent)?;
                self.place(id, new_depth, new_parent)?;
            }
            Some(old) => {
                self.unlink(id, old.parent);
                self.link(id, new_parent)?;
                if new_depth != old.depth {
                    self.unplace(id)?;
                    self.place(id, new_depth, new_parent)?;
                    self.cascade(id)?;
                } else {
                    let node = self.node_mut(id)?;
                    node.parent = new_parent;
                    let dense_index = node.dense_index;
                    self.emit(StructuralDelta {
                        depth: new_depth,
                        dense_index,
                        id,
                        parent: new_parent,
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Remove `id` from the hierarchy.
    ///
    /// Every direct and indirect descendant is detached and becomes a
    /// parentless root at depth 0; then `id` leaves its level and its node
    /// is cleared.
    pub fn delete(&mut self, id: InstanceId) -> Result<(), SyncError> {
        let Some(node) = self.node(id).copied() else {
            return Err(SyncError::NotRegistered { id });
        };
        let scratch = Arc::clone(&self.scratch);
        let mut descendants = scratch.take();
        self.collect_descendants(id, &mut descendants)?;

        for &d in descendants.iter() {
            if let Some(slot) = d.slot() {
                self.children.clear(slot);
            }
            self.unplace(d)?;
            self.place(d, 0, InstanceId::NULL)?;
        }
        self.stats.descendants_moved += descendants.len() as u64;
        if !descendants.is_empty() {
            log::trace!(
                "delete {id}: detached {} descendants to depth 0",
                descendants.len()
            );
        }

        self.unlink(id, node.parent);
        self.unplace(id)?;
        if let Some(slot) = id.slot() {
            self.children.clear(slot);
            self.nodes.clear(slot);
        }
        Ok(())
    }

    // ── Traversal ───────────────────────────────────────────────

    /// Children of `id`: direct only, or every descendant when
    /// `recursive`. Fails with [`SyncError::NotRegistered`] for
    /// uninitialized ids.
    pub fn get_children(
        &self,
        id: InstanceId,
        recursive: bool,
    ) -> Result<Vec<InstanceId>, SyncError> {
        if !self.is_initialized(id) {
            return Err(SyncError::NotRegistered { id });
        }
        if !recursive {
            return Ok(self.child_list(id).map(|c| c.iter().collect()).unwrap_or_default());
        }
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out)?;
        Ok(out)
    }

    /// Ancestors of `id`, nearest first: the parent only, or the whole
    /// chain to the root when `recursive`. Roots have none.
    pub fn get_parents(
        &self,
        id: InstanceId,
        recursive: bool,
    ) -> Result<Vec<InstanceId>, SyncError> {
        let Some(node) = self.node(id) else {
            return Err(SyncError::NotRegistered { id });
        };
        let mut out = Vec::new();
        let mut current = node.parent;
        while !current.is_null() {
            if out.len() >= self.max_depth as usize {
                return Err(corrupt(format!(
                    "ancestor chain of {id} exceeds max depth {}",
                    self.max_depth
                )));
            }
            out.push(current);
            if !recursive {
                break;
            }
            current = self
                .node(current)
                .ok_or_else(|| corrupt(format!("ancestor {current} of {id} is not initialized")))?
                .parent;
        }
        Ok(out)
    }

    // ── Internals ───────────────────────────────────────────────

    fn node_mut(&mut self, id: InstanceId) -> Result<&mut HierarchyNode, SyncError> {
        let slot = id.slot().ok_or(SyncError::InvalidId { id })?;
        self.nodes.slot_mut(slot)
    }

    fn emit(&mut self, delta: StructuralDelta) -> Result<(), SyncError> {
        self.log.push(delta)?;
        self.stats.structural_deltas += 1;
        Ok(())
    }

    /// Append `id` to `levels[depth]` and record its new node state.
    fn place(&mut self, id: InstanceId, depth: Depth, parent: InstanceId) -> Result<(), SyncError> {
        let d = depth as usize;
        while self.levels.len() <= d {
            self.levels.push(Vec::new());
        }
        let level = &mut self.levels[d];
        let len = level.len();
        let dense_index = u32::try_from(len).map_err(|_| SyncError::CapacityExceeded {
            requested: len + 1,
            ceiling: u32::MAX as usize,
        })?;
        self.config.reserve(level, len + 1)?;
        level.push(id);
        *self.node_mut(id)? = HierarchyNode {
            parent,
            depth,
            dense_index,
            initialized: true,
        };
        self.emit(StructuralDelta {
            depth,
            dense_index,
            id,
            parent,
        })
    }

    /// Swap-remove `id` from its level. The node keeps its other fields.
    fn unplace(&mut self, id: InstanceId) -> Result<(), SyncError> {
        let node = self
            .node(id)
            .copied()
            .ok_or_else(|| corrupt(format!("unplacing uninitialized node {id}")))?;
        let depth = node.depth;
        let index = node.dense_index as usize;
        let level = self
            .levels
            .get_mut(depth as usize)
            .ok_or_else(|| corrupt(format!("node {id} points at missing level {depth}")))?;
        if level.get(index) != Some(&id) {
            return Err(corrupt(format!(
                "level {depth} index {index} does not hold node {id}"
            )));
        }
        let last = level.len() - 1;
        level.swap_remove(index);
        let moved = (index != last).then(|| level[index]);

        if let Some(moved) = moved {
            let moved_node = self.node_mut(moved)?;
            if moved_node.dense_index as usize != last {
                return Err(corrupt(format!(
                    "node {moved} at level {depth} index {last} records index {}",
                    moved_node.dense_index
                )));
            }
            moved_node.dense_index = index as u32;
            let parent = moved_node.parent;
            self.emit(StructuralDelta {
                depth,
                dense_index: index as u32,
                id: moved,
                parent,
            })?;
        }
        self.emit(StructuralDelta {
            depth,
            dense_index: last as u32,
            id: InstanceId::NULL,
            parent: InstanceId::NULL,
        })
    }

    fn link(&mut self, id: InstanceId, parent: InstanceId) -> Result<(), SyncError> {
        if let Some(slot) = parent.slot() {
            self.children.slot_mut(slot)?.insert(id);
        }
        Ok(())
    }

    fn unlink(&mut self, id: InstanceId, parent: InstanceId) {
        if let Some(list) = parent.slot().and_then(|slot| self.children.get_mut(slot)) {
            list.remove(id);
        }
    }

    /// Move every descendant of `root` to one level below its parent.
    fn cascade(&mut self, root: InstanceId) -> Result<(), SyncError> {
        let scratch = Arc::clone(&self.scratch);
        let mut stack = scratch.take();
        stack.push(root);
        let mut moved = 0u64;
        while let Some(parent) = stack.pop() {
            let parent_depth = self
                .depth(parent)
                .ok_or_else(|| corrupt(format!("cascade reached uninitialized node {parent}")))?;
            let child_depth = u32::from(parent_depth) + 1;
            let start = stack.len();
            if let Some(list) = self.child_list(parent) {
                stack.extend(list.iter());
            }
            if stack.len() > start && child_depth >= u32::from(self.max_depth) {
                return Err(SyncError::MaxDepthExceeded {
                    id: stack[start],
                    depth: child_depth,
                    max_depth: self.max_depth,
                });
            }
            for i in start..stack.len() {
                let child = stack[i];
                if self.depth(child) != Some(child_depth as Depth) {
                    self.unplace(child)?;
                    self.place(child, child_depth as Depth, parent)?;
                    moved += 1;
                }
            }
        }
        self.stats.cascades += 1;
        self.stats.descendants_moved += moved;
        log::trace!("depth cascade from {root}: moved {moved} descendants");
        Ok(())
    }

    /// Append every descendant of `root` to `out`, level by level.
    fn collect_descendants(
        &self,
        root: InstanceId,
        out: &mut Vec<InstanceId>,
    ) -> Result<(), SyncError> {
        let mut frontier_start = out.len();
        if let Some(list) = self.child_list(root) {
            out.extend(list.iter());
        }
        let mut levels = 1usize;
        while frontier_start < out.len() {
            if levels > self.max_depth as usize {
                return Err(corrupt(format!(
                    "subtree of {root} is deeper than max depth {}",
                    self.max_depth
                )));
            }
            let frontier_end = out.len();
            for i in frontier_start..frontier_end {
                if let Some(list) = self.child_list(out[i]) {
                    out.extend(list.iter());
                }
            }
            frontier_start = frontier_end;
            levels += 1;
        }
        Ok(())
    }

    /// Deepest depth found in the subtree rooted at `root`.
    fn subtree_max_depth(&self, root: InstanceId) -> Result<Depth, SyncError> {
        let scratch = Arc::clone(&self.scratch);
        let mut descendants = scratch.take();
        self.collect_descendants(root, &mut descendants)?;
        let mut deepest = self
            .depth(root)
            .ok_or(SyncError::NotRegistered { id: root })?;
        for &d in descendants.iter() {
            if let Some(depth) = self.depth(d) {
                deepest = deepest.max(depth);
            }
        }
        Ok(deepest)
    }

    /// Whether `ancestor` lies on the parent chain of `node` (or is it).
    fn is_ancestor(&self, ancestor: InstanceId, node: InstanceId) -> Result<bool, SyncError> {
        let mut current = node;
        for _ in 0..=self.max_depth {
            if current == ancestor {
                return Ok(true);
            }
            match self.node(current) {
                Some(n) if !n.parent.is_null() => current = n.parent,
                _ => return Ok(false),
            }
        }
        Err(corrupt(format!(
            "ancestor chain of {node} exceeds max depth {}",
            self.max_depth
        )))
    }
}
