//! Strongly-typed identifiers and the [`Depth`] type alias.

use std::fmt;

/// Handle of one managed instance.
///
/// Ids are issued by the identifier allocator starting at 1. `InstanceId(0)`
/// is the null id ([`InstanceId::NULL`]) and never names a live instance.
/// Storage indexed by instance uses [`slot`](InstanceId::slot), which maps
/// id `n` to index `n - 1` so that a capacity of `N` covers ids `1..=N`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u32);

impl InstanceId {
    /// The reserved "no instance" id.
    pub const NULL: InstanceId = InstanceId(0);

    /// Whether this is the null id.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Storage index for this id, or `None` for the null id.
    pub fn slot(self) -> Option<usize> {
        if self.is_null() {
            None
        } else {
            Some(self.0 as usize - 1)
        }
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<u32> for InstanceId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a group of instances that share a draw batch downstream.
///
/// The engine keeps a live count per group so the consumer can size its
/// per-group dispatch without scanning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for GroupId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Flush cycle counter of a single delta log.
///
/// Advanced only when a flush fully drains the log. Coalescing stamps
/// recorded under an older cycle are stale and ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cycle(pub u64);

impl Cycle {
    /// The cycle after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Cycle {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Topological rank of an instance in the hierarchy. Roots are depth 0.
pub type Depth = u16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_has_no_slot() {
        assert!(InstanceId::NULL.is_null());
        assert_eq!(InstanceId::NULL.slot(), None);
    }

    #[test]
    fn slot_is_one_below_id() {
        assert_eq!(InstanceId(1).slot(), Some(0));
        assert_eq!(InstanceId(65).slot(), Some(64));
    }

    #[test]
    fn display_null() {
        assert_eq!(InstanceId::NULL.to_string(), "null");
        assert_eq!(InstanceId(7).to_string(), "7");
    }

    #[test]
    fn cycle_next_increments() {
        assert_eq!(Cycle(3).next(), Cycle(4));
    }
}
