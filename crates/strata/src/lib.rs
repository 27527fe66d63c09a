//! Strata: incremental synchronization of instance state and scene
//! hierarchy to a downstream consumer.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Strata sub-crates. For most users, adding `strata` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use strata::prelude::*;
//!
//! let mut engine: SynchronizationEngine = SynchronizationEngine::new(SyncConfig::default()).unwrap();
//!
//! let root = engine.allocate_id().unwrap();
//! let arm = engine.allocate_id().unwrap();
//! engine.record_update(root, InstanceData::default(), DirtyFlags::ALL).unwrap();
//! engine.record_update(arm, InstanceData::default().at([1.0, 0.0, 0.0]), DirtyFlags::ALL).unwrap();
//! engine.set_parent(arm, root).unwrap();
//! assert_eq!(engine.depth_of(arm), Some(1));
//!
//! // The consumer drains each log page by page.
//! let page = engine.flush_updates(256).unwrap();
//! assert_eq!(page.len(), 2);
//! assert!(page.is_final());
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `strata-core` | Ids, dirty masks, instance records, `SyncError` |
//! | [`arena`] | `strata-arena` | Id allocators, capacity policy, slot storage, scratch pool |
//! | [`delta`] | `strata-delta` | Coalescing delta buffer, paged logs, live-id compactor |
//! | [`hierarchy`] | `strata-hierarchy` | Depth map, child lists, structural deltas |
//! | [`engine`] | `strata-engine` | `SynchronizationEngine` and its configuration |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`strata-core`).
///
/// Instance and group ids, [`types::DirtyFlags`], the
/// [`types::InstanceFields`] trait, and [`types::SyncError`].
pub use strata_core as types;

/// Allocation and storage (`strata-arena`).
pub use strata_arena as arena;

/// Delta recording and paging (`strata-delta`).
///
/// [`delta::DeltaBuffer`] coalesces per-instance writes;
/// [`delta::IndirectIds`] keeps the live-id array gapless.
pub use strata_delta as delta;

/// Hierarchy scheduling (`strata-hierarchy`).
pub use strata_hierarchy as hierarchy;

/// The synchronization engine (`strata-engine`).
pub use strata_engine as engine;

/// Common imports for typical Strata usage.
///
/// ```rust
/// use strata::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use strata_core::{
        DirtyFlags, GroupId, InstanceData, InstanceFields, InstanceId, SyncError,
    };

    // Pages
    pub use strata_delta::{Batch, DeltaRecord, LiveIdDelta};
    pub use strata_hierarchy::StructuralDelta;

    // Engine
    pub use strata_engine::{ConfigError, SyncConfig, SyncMetrics, SynchronizationEngine};
}
