//! Instance hierarchy for Strata.
//!
//! Every initialized instance has a depth (its topological rank, roots at
//! 0) and sits in the dense array of its depth level. The consumer walks
//! levels in order, so a parent's world transform is always resolved
//! before any of its children's.
//!
//! [`DepthMap`] owns the node table, the per-parent [`ChildList`]s, the
//! level arrays, and a paged log of [`StructuralDelta`]s describing every
//! level slot it writes.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod children;
pub mod delta;
pub mod map;

pub use children::{ChildIter, ChildList};
pub use delta::StructuralDelta;
pub use map::{DepthMap, HierarchyNode, HierarchyStats};
