//! Core types for the Strata synchronization engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other crate in the workspace: instance
//! and group identifiers, the flush-cycle counter, dirty-flag masks, the
//! instance field record, and the [`SyncError`] taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod dirty;
pub mod error;
pub mod id;
pub mod instance;

pub use dirty::DirtyFlags;
pub use error::SyncError;
pub use id::{Cycle, Depth, GroupId, InstanceId};
pub use instance::{InstanceData, InstanceFields};
