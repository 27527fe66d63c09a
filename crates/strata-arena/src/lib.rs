//! Capacity-managed storage and identifier allocation for Strata.
//!
//! Every per-instance array in the workspace lives in a [`SlotStore`],
//! which grows in aligned, capped increments and never shrinks. This
//! crate also owns the id allocators and the one thread-safe piece of
//! the design, the [`ScratchPool`].
//!
//! # Architecture
//!
//! ```text
//! CapacityConfig (growth policy: step cap, batch-width alignment, ceiling)
//! ├── SlotStore<T>        id-indexed array, grows on first out-of-range touch
//! ├── IdAllocator         min-first free list over u32 ids, 0 reserved
//! │   └── BlockIdAllocator  contiguous id blocks (skeleton bones)
//! └── ScratchPool<T>      bounded channel of reusable Vec<T> buffers
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
pub mod config;
pub mod ids;
pub mod pool;
pub mod store;

// Public re-exports for the primary API surface.
pub use block::{BlockIdAllocator, IdBlock};
pub use config::CapacityConfig;
pub use ids::IdAllocator;
pub use pool::{PooledVec, ScratchPool};
pub use store::SlotStore;
