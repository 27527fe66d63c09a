//! Error type for the Strata synchronization core.
//!
//! Every variant is a fatal condition for the current session: either the
//! caller broke a contract (invalid ids, illegal reparenting, double
//! deletes) or internal bookkeeping no longer matches itself. Capacity
//! exhaustion is reported through its own variant so embedders can tell
//! pathological data apart from a logic bug (see [`SyncError::is_capacity`]).

use std::error::Error;
use std::fmt;

use crate::id::{Depth, GroupId, InstanceId};

/// Errors raised by the allocator, delta logs, hierarchy map, and engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncError {
    /// The id is null or was never issued by the allocator.
    InvalidId {
        /// The offending id.
        id: InstanceId,
    },
    /// The id is already on the allocator's free list.
    AlreadyReleased {
        /// The offending id.
        id: InstanceId,
    },
    /// A delta record was addressed to the null instance.
    InvalidInstance {
        /// The offending id.
        id: InstanceId,
    },
    /// The instance has no initialized hierarchy node.
    NotRegistered {
        /// The offending id.
        id: InstanceId,
    },
    /// The requested parent is not an initialized instance.
    InvalidParent {
        /// The child being reparented.
        id: InstanceId,
        /// The rejected parent.
        parent: InstanceId,
    },
    /// An instance was parented to itself.
    SelfParent {
        /// The offending id.
        id: InstanceId,
    },
    /// The requested parent is already the current parent.
    RedundantParent {
        /// The child being reparented.
        id: InstanceId,
        /// The unchanged parent.
        parent: InstanceId,
    },
    /// The requested parent is a descendant of the child.
    CycleDetected {
        /// The child being reparented.
        id: InstanceId,
        /// The rejected parent.
        parent: InstanceId,
    },
    /// The operation would place a node at or beyond the depth ceiling.
    MaxDepthExceeded {
        /// The node that would overflow.
        id: InstanceId,
        /// The depth it would have reached.
        depth: u32,
        /// The configured ceiling (exclusive).
        max_depth: Depth,
    },
    /// A group's live count would drop below zero.
    GroupUnderflow {
        /// The offending group.
        group: GroupId,
    },
    /// A flush was requested with a batch size of zero.
    InvalidBatchSize,
    /// Internal bookkeeping is inconsistent.
    CorruptState {
        /// Description of the inconsistency.
        reason: String,
    },
    /// Backing storage would grow past the absolute sanity ceiling.
    CapacityExceeded {
        /// Number of elements required.
        requested: usize,
        /// The configured ceiling in elements.
        ceiling: usize,
    },
}

impl SyncError {
    /// Whether this error reports capacity exhaustion rather than a
    /// contract violation or corrupted state.
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }
}

/// Shorthand for building [`SyncError::CorruptState`].
pub fn corrupt(reason: impl Into<String>) -> SyncError {
    SyncError::CorruptState {
        reason: reason.into(),
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidId { id } => write!(f, "invalid instance id {id}"),
            Self::AlreadyReleased { id } => write!(f, "instance id {id} already released"),
            Self::InvalidInstance { id } => {
                write!(f, "delta record addressed to invalid instance {id}")
            }
            Self::NotRegistered { id } => {
                write!(f, "instance {id} has no initialized hierarchy node")
            }
            Self::InvalidParent { id, parent } => {
                write!(f, "cannot parent {id} to uninitialized instance {parent}")
            }
            Self::SelfParent { id } => write!(f, "cannot parent instance {id} to itself"),
            Self::RedundantParent { id, parent } => {
                write!(f, "instance {id} is already parented to {parent}")
            }
            Self::CycleDetected { id, parent } => {
                write!(f, "parenting {id} to {parent} would create a cycle")
            }
            Self::MaxDepthExceeded {
                id,
                depth,
                max_depth,
            } => {
                write!(
                    f,
                    "instance {id} would reach depth {depth}, max depth is {max_depth}"
                )
            }
            Self::GroupUnderflow { group } => {
                write!(f, "live count of group {group} would drop below zero")
            }
            Self::InvalidBatchSize => write!(f, "flush batch size must be at least 1"),
            Self::CorruptState { reason } => write!(f, "corrupt state: {reason}"),
            Self::CapacityExceeded { requested, ceiling } => {
                write!(
                    f,
                    "capacity exceeded: requested {requested} elements, ceiling {ceiling}"
                )
            }
        }
    }
}

impl Error for SyncError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_distinguishable() {
        let cap = SyncError::CapacityExceeded {
            requested: 10,
            ceiling: 5,
        };
        assert!(cap.is_capacity());
        assert!(!SyncError::InvalidBatchSize.is_capacity());
        assert!(!corrupt("x").is_capacity());
    }

    #[test]
    fn display_mentions_ids() {
        let err = SyncError::InvalidParent {
            id: InstanceId(4),
            parent: InstanceId(9),
        };
        let msg = err.to_string();
        assert!(msg.contains('4'));
        assert!(msg.contains('9'));
    }

    #[test]
    fn corrupt_carries_reason() {
        match corrupt("dense index mismatch") {
            SyncError::CorruptState { reason } => assert_eq!(reason, "dense index mismatch"),
            other => panic!("expected CorruptState, got {other:?}"),
        }
    }
}
