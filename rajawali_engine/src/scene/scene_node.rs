/// SceneNode - one entry of the scene graph arena.
///
/// A node owns its transformation, an optional local-space bounding volume,
/// an optional renderable payload and the keys of its children. The parent
/// key is a back-reference only; ownership of every node belongs to the
/// graph arena.
///
/// Visibility and pickability are application intent. The in-frustum flag
/// is computed by the culling pass and is atomic so culling can update it
/// while holding only the read lock.

use std::sync::atomic::{AtomicBool, Ordering};
use bitflags::bitflags;
use slotmap::new_key_type;
use crate::bounds::{Aabb, BoundingVolume};
use crate::renderer::RenderableObject;
use crate::transform::Transformation;

new_key_type! {
    /// Stable key for a node within a scene graph.
    ///
    /// Keys stay valid until their node is destroyed.
    pub struct NodeKey;
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u32 {
        /// Drawn when inside the frustum
        const VISIBLE  = 1 << 0;
        /// Considered by `pick`
        const PICKABLE = 1 << 1;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        NodeFlags::VISIBLE | NodeFlags::PICKABLE
    }
}

pub struct SceneNode {
    name: Option<String>,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) transformation: Transformation,
    flags: NodeFlags,
    in_frustum: AtomicBool,
    pub(crate) local_volume: Option<BoundingVolume>,
    pub(crate) world_bounds: Option<Aabb>,
    renderable: Option<RenderableObject>,
}

impl SceneNode {
    /// Empty node: identity transformation, no volume, no payload.
    pub fn new() -> Self {
        Self {
            name: None,
            parent: None,
            children: Vec::new(),
            transformation: Transformation::new(),
            flags: NodeFlags::default(),
            in_frustum: AtomicBool::new(false),
            local_volume: None,
            world_bounds: None,
            renderable: None,
        }
    }

    // ===== BUILDERS =====

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_transformation(mut self, transformation: Transformation) -> Self {
        self.transformation = transformation;
        self
    }

    pub fn with_volume(mut self, volume: impl Into<BoundingVolume>) -> Self {
        self.local_volume = Some(volume.into());
        self
    }

    /// Attach a renderable. If no volume was set, the geometry's bounding
    /// box becomes the node's volume.
    pub fn with_renderable(mut self, renderable: RenderableObject) -> Self {
        if self.local_volume.is_none() {
            self.local_volume = renderable.geometry().bounding_box().map(BoundingVolume::Box);
        }
        self.renderable = Some(renderable);
        self
    }

    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }

    // ===== GETTERS =====

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    pub fn transformation(&self) -> &Transformation {
        &self.transformation
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub fn is_visible(&self) -> bool {
        self.flags.contains(NodeFlags::VISIBLE)
    }

    pub fn is_pickable(&self) -> bool {
        self.flags.contains(NodeFlags::PICKABLE)
    }

    /// Result of the last `visible_object_intersection` pass.
    pub fn is_in_frustum(&self) -> bool {
        self.in_frustum.load(Ordering::Relaxed)
    }

    /// Local-space volume of this node alone.
    pub fn local_volume(&self) -> Option<&BoundingVolume> {
        self.local_volume.as_ref()
    }

    /// World-space box of this node and all its descendants.
    ///
    /// `None` when nothing in the subtree has a volume.
    pub fn world_bounds(&self) -> Option<&Aabb> {
        self.world_bounds.as_ref()
    }

    pub fn renderable(&self) -> Option<&RenderableObject> {
        self.renderable.as_ref()
    }

    // ===== MUTATORS (graph-internal) =====

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub(crate) fn set_flag(&mut self, flag: NodeFlags, enabled: bool) {
        self.flags.set(flag, enabled);
    }

    pub(crate) fn set_in_frustum(&self, in_frustum: bool) {
        self.in_frustum.store(in_frustum, Ordering::Relaxed);
    }

    pub(crate) fn renderable_mut(&mut self) -> Option<&mut RenderableObject> {
        self.renderable.as_mut()
    }

    pub(crate) fn set_renderable(&mut self, renderable: Option<RenderableObject>) {
        self.renderable = renderable;
    }
}

impl Default for SceneNode {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SceneNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneNode")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("flags", &self.flags)
            .field("world_bounds", &self.world_bounds)
            .field("renderable", &self.renderable.is_some())
            .finish()
    }
}
