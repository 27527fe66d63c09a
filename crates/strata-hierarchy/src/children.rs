//! Adaptive per-parent child lists.
//!
//! Most parents have a handful of children; a few (scene roots, particle
//! emitters) have tens of thousands. [`ChildList`] stores small lists
//! inline and switches to an [`IndexSet`] once a list reaches
//! [`ChildList::PROMOTE_AT`] entries, so membership tests and removals stay
//! O(1) for the wide case.

use indexmap::IndexSet;
use smallvec::SmallVec;
use strata_core::InstanceId;

/// Direct children of one parent.
#[derive(Clone, Debug)]
pub enum ChildList {
    /// Linear-scan array, used below [`ChildList::PROMOTE_AT`] entries.
    Dense(SmallVec<[InstanceId; 4]>),
    /// Hashed set, used from [`ChildList::PROMOTE_AT`] entries on.
    Set(IndexSet<InstanceId>),
}

impl Default for ChildList {
    fn default() -> Self {
        Self::Dense(SmallVec::new())
    }
}

impl ChildList {
    /// Entry count at which a dense list is promoted to a set.
    pub const PROMOTE_AT: usize = 32;

    /// Entry count below which a set is demoted back to a dense list.
    pub const DEMOTE_BELOW: usize = 16;

    /// Add `id`. Returns `false` if it was already present.
    pub fn insert(&mut self, id: InstanceId) -> bool {
        match self {
            Self::Dense(ids) => {
                if ids.contains(&id) {
                    return false;
                }
                ids.push(id);
                if ids.len() >= Self::PROMOTE_AT {
                    let set: IndexSet<InstanceId> = ids.drain(..).collect();
                    *self = Self::Set(set);
                }
                true
            }
            Self::Set(set) => set.insert(id),
        }
    }

    /// Remove `id`. Returns `false` if it was not present.
    pub fn remove(&mut self, id: InstanceId) -> bool {
        match self {
            Self::Dense(ids) => match ids.iter().position(|c| *c == id) {
                Some(pos) => {
                    ids.swap_remove(pos);
                    true
                }
                None => false,
            },
            Self::Set(set) => {
                let removed = set.swap_remove(&id);
                if removed && set.len() < Self::DEMOTE_BELOW {
                    let ids: SmallVec<[InstanceId; 4]> = set.drain(..).collect();
                    *self = Self::Dense(ids);
                }
                removed
            }
        }
    }

    /// Whether `id` is a direct child.
    pub fn contains(&self, id: InstanceId) -> bool {
        match self {
            Self::Dense(ids) => ids.contains(&id),
            Self::Set(set) => set.contains(&id),
        }
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        match self {
            Self::Dense(ids) => ids.len(),
            Self::Set(set) => set.len(),
        }
    }

    /// Whether there are no children.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the list is in its hashed representation.
    pub fn is_promoted(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    /// Iterate over the children.
    pub fn iter(&self) -> ChildIter<'_> {
        match self {
            Self::Dense(ids) => ChildIter::Dense(ids.iter()),
            Self::Set(set) => ChildIter::Set(set.iter()),
        }
    }
}

/// Iterator over a [`ChildList`].
pub enum ChildIter<'a> {
    /// Over a dense list.
    Dense(std::slice::Iter<'a, InstanceId>),
    /// Over a hashed set.
    Set(indexmap::set::Iter<'a, InstanceId>),
}

impl Iterator for ChildIter<'_> {
    type Item = InstanceId;

    fn next(&mut self) -> Option<InstanceId> {
        match self {
            Self::Dense(it) => it.next().copied(),
            Self::Set(it) => it.next().copied(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::Dense(it) => it.size_hint(),
            Self::Set(it) => it.size_hint(),
        }
    }
}
