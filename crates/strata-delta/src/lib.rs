//! Coalescing delta logs for Strata.
//!
//! The consumer never sees a snapshot, only ordered batches of changes.
//! This crate produces those batches:
//!
//! ```text
//! DeltaBuffer<T>
//! ├── CoalescingLog<DeltaRecord<T>>   one record per instance per cycle
//! │   ├── PagedLog                    append order, cursor-paged flush
//! │   └── SlotStore<Option<Stamp>>    id → (cycle, position)
//! ├── IndirectIds                     gapless dense array of live ids
//! │   └── CoalescingLog<LiveIdDelta>
//! └── GroupCounts                     live instances per group
//! ```
//!
//! # Cycles
//!
//! Every log carries its own [`Cycle`](strata_core::Cycle). A flush that
//! drains the log completely clears it and advances the cycle, which
//! invalidates every coalescing stamp at once. A partial flush only moves
//! the read cursor; records behind the cursor have been shipped and are
//! never mutated again.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffer;
pub mod coalesce;
pub mod groups;
pub mod indirect;
pub mod paged;

pub use buffer::{DeltaBuffer, DeltaRecord, DeltaStats, RecordOutcome};
pub use coalesce::CoalescingLog;
pub use groups::GroupCounts;
pub use indirect::{IndirectIds, LiveIdDelta};
pub use paged::{Batch, PagedLog};
