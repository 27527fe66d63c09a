//! Instance field records.
//!
//! The delta buffer is generic over the record it ships; [`InstanceFields`]
//! is the only thing it needs to know about that record. [`InstanceData`]
//! is the stock layout used by the engine's default type parameter.

use std::fmt;

use crate::id::{GroupId, InstanceId};

/// A full snapshot of the externally visible fields of one instance.
///
/// Records are cloned into flush batches, so they should stay small.
pub trait InstanceFields: Clone + Default + fmt::Debug {
    /// The group this instance counts towards, if any.
    fn group(&self) -> Option<GroupId> {
        None
    }
}

/// Default instance record: transform, appearance, and bindings.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceData {
    /// Local translation relative to the parent.
    pub position: [f32; 3],
    /// Local rotation quaternion `(x, y, z, w)`.
    pub rotation: [f32; 4],
    /// Local non-uniform scale.
    pub scale: [f32; 3],
    /// Linear RGBA tint.
    pub color: [f32; 4],
    /// Material slot index.
    pub material: u32,
    /// Selected level of detail.
    pub lod: u8,
    /// First id of the bone block driving this instance, or null.
    pub bone_block: InstanceId,
    /// Whether the instance should be drawn.
    pub visible: bool,
    /// Draw group membership.
    pub group: Option<GroupId>,
}

impl Default for InstanceData {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
            color: [1.0; 4],
            material: 0,
            lod: 0,
            bone_block: InstanceId::NULL,
            visible: true,
            group: None,
        }
    }
}

impl InstanceData {
    /// An identity-transform record belonging to `group`.
    pub fn in_group(group: GroupId) -> Self {
        Self {
            group: Some(group),
            ..Self::default()
        }
    }

    /// Copy of `self` translated to `position`.
    pub fn at(mut self, position: [f32; 3]) -> Self {
        self.position = position;
        self
    }
}

impl InstanceFields for InstanceData {
    fn group(&self) -> Option<GroupId> {
        self.group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity_transform() {
        let d = InstanceData::default();
        assert_eq!(d.rotation, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(d.scale, [1.0; 3]);
        assert!(d.visible);
        assert_eq!(d.group(), None);
    }

    #[test]
    fn in_group_sets_group() {
        let d = InstanceData::in_group(GroupId(3)).at([1.0, 2.0, 3.0]);
        assert_eq!(d.group(), Some(GroupId(3)));
        assert_eq!(d.position, [1.0, 2.0, 3.0]);
    }
}
