//! Synchronization engine for Strata.
//!
//! [`SynchronizationEngine`] is the single value an embedder owns. Upstream
//! code allocates ids, records field changes, and edits the hierarchy;
//! once per cycle the downstream consumer drains three paged logs:
//!
//! - [`flush_updates`](SynchronizationEngine::flush_updates): coalesced
//!   per-instance records
//! - [`flush_live_ids`](SynchronizationEngine::flush_live_ids): writes to
//!   the gapless live-id array
//! - [`flush_structural_deltas`](SynchronizationEngine::flush_structural_deltas):
//!   writes to the per-depth level arrays
//!
//! All mutation goes through `&mut self`; the only shared piece is the
//! scratch pool returned by
//! [`scratch_pool`](SynchronizationEngine::scratch_pool).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod metrics;

pub use config::{ConfigError, SyncConfig};
pub use engine::SynchronizationEngine;
pub use metrics::SyncMetrics;
