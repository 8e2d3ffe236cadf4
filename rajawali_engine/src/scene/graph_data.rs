/// GraphData - the node arena behind a `SceneGraph` lock.
///
/// Everything here assumes the caller already holds the appropriate lock:
/// `&GraphData` comes from a read guard, `&mut GraphData` from a write guard.
/// `SceneGraph` wraps each operation with its own acquisition; use the
/// methods here directly inside `request_modifications` to batch several
/// edits under one write lock.
///
/// Structure invariants:
/// - every non-root node has at most one parent, and its key is in that
///   parent's children list
/// - no node is its own ancestor
/// - a node is attached iff its parent chain reaches the root
///
/// Bounds invariant: a node's world bounds enclose its own volume
/// (transformed by its world matrix) and the world bounds of every child.
/// Structural mutations are validated before anything changes, so a failed
/// call leaves the tree untouched.

use glam::{Mat4, Vec3};
use slotmap::SlotMap;
use crate::bounds::intersector::{intersect_ray_aabb, intersect_ray_sphere};
use crate::bounds::{Aabb, BoundingVolume, Ray};
use crate::camera::{Camera, Frustum, FrustumTest};
use crate::error::Result;
use crate::renderer::RenderableObject;
use crate::transform::Transformer;
use super::scene_node::{NodeFlags, NodeKey, SceneNode};

const SOURCE: &str = "rajawali::SceneGraph";

/// One node hit by a ray query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub node: NodeKey,
    /// Distance along the ray
    pub distance: f32,
    /// World-space hit point
    pub point: Vec3,
}

pub struct GraphData {
    nodes: SlotMap<NodeKey, SceneNode>,
    root: NodeKey,
}

impl GraphData {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode::new().with_name("root"));
        Self { nodes, root }
    }

    // ===== ACCESS =====

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn node(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    pub(crate) fn node_mut(&mut self, key: NodeKey) -> Option<&mut SceneNode> {
        self.nodes.get_mut(key)
    }

    /// Number of nodes in the arena, attached or not, excluding the root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every attached node in depth-first pre-order, root excluded.
    pub fn attached_nodes(&self) -> Vec<NodeKey> {
        self.descendants(self.root)
    }

    /// Descendants of `key` in depth-first pre-order, `key` excluded.
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeKey> = match self.nodes.get(key) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return result,
        };
        while let Some(current) = stack.pop() {
            result.push(current);
            if let Some(node) = self.nodes.get(current) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        result
    }

    /// True if `ancestor` is a strict ancestor of `key`.
    pub fn is_ancestor(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        let mut current = self.nodes.get(key).and_then(|node| node.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.nodes.get(parent).and_then(|node| node.parent);
        }
        false
    }

    /// True if the node is attached to this graph. O(depth).
    pub fn contains(&self, key: NodeKey) -> bool {
        key != self.root && self.nodes.contains_key(key) && self.is_ancestor(self.root, key)
    }

    pub fn contains_all(&self, keys: &[NodeKey]) -> bool {
        keys.iter().all(|key| self.contains(*key))
    }

    // ===== STRUCTURE =====

    /// Insert a detached node and compute its matrices and bounds.
    pub fn create_node(&mut self, mut node: SceneNode) -> NodeKey {
        node.parent = None;
        node.children.clear();
        let key = self.nodes.insert(node);
        self.refresh_subtree(key);
        key
    }

    /// Attach a detached node (and its subtree) under the root.
    pub fn add(&mut self, key: NodeKey) -> Result<()> {
        self.add_child(self.root, key)
    }

    /// Attach a detached node (and its subtree) under `parent`.
    ///
    /// `parent` may itself be detached; the subtree becomes attached once
    /// `parent` is.
    ///
    /// # Errors
    ///
    /// `InvalidState` if either key is unknown, `key` is the root, `key`
    /// already has a parent, or the attachment would create a cycle.
    pub fn add_child(&mut self, parent: NodeKey, key: NodeKey) -> Result<()> {
        self.validate_attach(parent, key)?;
        self.attach(parent, key);
        Ok(())
    }

    /// Attach several nodes under the root. All or nothing.
    pub fn add_all(&mut self, keys: &[NodeKey]) -> Result<()> {
        self.add_all_to(self.root, keys)
    }

    /// Attach several nodes under `parent`. All or nothing.
    pub fn add_all_to(&mut self, parent: NodeKey, keys: &[NodeKey]) -> Result<()> {
        for (i, key) in keys.iter().enumerate() {
            if keys[..i].contains(key) {
                crate::engine_bail!(SOURCE, "Node {:?} listed twice", key);
            }
            self.validate_attach(parent, *key)?;
        }
        for key in keys {
            self.attach(parent, *key);
        }
        Ok(())
    }

    /// Detach an attached node and its subtree from its parent.
    ///
    /// Returns `false` if the node is not attached to the graph: concurrent
    /// removals may race, so this is not an error. Nodes inside a detached
    /// subtree are left linked; use `reparent` to move them. The node stays
    /// in the arena and may be attached again.
    pub fn remove(&mut self, key: NodeKey) -> bool {
        if !self.contains(key) {
            return false;
        }
        self.unlink(key)
    }

    /// Detach a node from whatever parent it has, attached or not.
    fn unlink(&mut self, key: NodeKey) -> bool {
        let Some(parent) = self.nodes.get(key).and_then(|node| node.parent) else {
            return false;
        };
        self.detach(parent, key);
        true
    }

    /// Detach a node from its parent, if any, and free it with its subtree.
    ///
    /// Returns the number of nodes freed.
    pub fn destroy(&mut self, key: NodeKey) -> Result<usize> {
        if key == self.root {
            crate::engine_bail!(SOURCE, "The root node cannot be destroyed");
        }
        if !self.nodes.contains_key(key) {
            crate::engine_bail!(SOURCE, "Unknown node {:?}", key);
        }
        self.unlink(key);

        let mut doomed = self.descendants(key);
        doomed.push(key);
        for doomed_key in &doomed {
            self.nodes.remove(*doomed_key);
        }
        Ok(doomed.len())
    }

    /// Move a node (and its subtree) under `new_parent`, detaching it from
    /// its current parent first. Validated before anything changes.
    pub fn reparent(&mut self, key: NodeKey, new_parent: NodeKey) -> Result<()> {
        self.check_known(key)?;
        self.check_known(new_parent)?;
        if key == self.root {
            crate::engine_bail!(SOURCE, "The root node cannot be reparented");
        }
        if key == new_parent || self.is_ancestor(key, new_parent) {
            crate::engine_bail!(SOURCE, "Reparenting {:?} under {:?} would create a cycle", key, new_parent);
        }
        self.unlink(key);
        self.attach(new_parent, key);
        Ok(())
    }

    /// Destroy every attached node. Detached nodes are kept.
    ///
    /// Returns the number of nodes freed.
    pub fn clear(&mut self) -> usize {
        let attached = self.attached_nodes();
        for key in &attached {
            self.nodes.remove(*key);
        }
        if let Some(root) = self.nodes.get_mut(self.root) {
            root.children.clear();
            root.world_bounds = None;
        }
        attached.len()
    }

    fn check_known(&self, key: NodeKey) -> Result<()> {
        if !self.nodes.contains_key(key) {
            crate::engine_bail!(SOURCE, "Unknown node {:?}", key);
        }
        Ok(())
    }

    fn validate_attach(&self, parent: NodeKey, key: NodeKey) -> Result<()> {
        self.check_known(parent)?;
        self.check_known(key)?;
        if key == self.root {
            crate::engine_bail!(SOURCE, "The root node cannot be attached");
        }
        if let Some(existing) = self.nodes.get(key).and_then(|node| node.parent) {
            crate::engine_bail!(SOURCE, "Node {:?} is already attached to {:?}", key, existing);
        }
        if key == parent || self.is_ancestor(key, parent) {
            crate::engine_bail!(SOURCE, "Attaching {:?} under {:?} would create a cycle", key, parent);
        }
        Ok(())
    }

    /// Link an already validated pair and refresh matrices and bounds.
    fn attach(&mut self, parent: NodeKey, key: NodeKey) {
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.push(key);
        }
        if let Some(node) = self.nodes.get_mut(key) {
            node.parent = Some(parent);
        }
        self.refresh_subtree(key);
    }

    fn detach(&mut self, parent: NodeKey, key: NodeKey) {
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|child| *child != key);
        }
        if let Some(node) = self.nodes.get_mut(key) {
            node.parent = None;
        }
        // Detached subtrees live in their own space
        self.refresh_subtree(key);
        self.combine_bounds(parent);
        self.propagate_bounds_up(parent);
    }

    // ===== NODE STATE =====

    /// Apply a transformer to one node, then update its subtree's world
    /// matrices and bounds and its ancestors' bounds.
    pub fn transform<T: Transformer>(&mut self, key: NodeKey, transformer: T) -> Result<()> {
        let Some(node) = self.nodes.get_mut(key) else {
            crate::engine_bail!(SOURCE, "Unknown node {:?}", key);
        };
        transformer.transform(&mut node.transformation);
        self.update_graph(key)
    }

    /// Replace a node's local volume and update bounds.
    pub fn set_volume(&mut self, key: NodeKey, volume: Option<BoundingVolume>) -> Result<()> {
        let Some(node) = self.nodes.get_mut(key) else {
            crate::engine_bail!(SOURCE, "Unknown node {:?}", key);
        };
        node.local_volume = volume;
        self.recalculate_bounds(key, false)
    }

    pub fn set_name(&mut self, key: NodeKey, name: Option<String>) -> Result<()> {
        self.node_mut_or_err(key)?.set_name(name);
        Ok(())
    }

    /// Application visibility intent.
    pub fn set_visible(&mut self, key: NodeKey, visible: bool) -> Result<()> {
        self.node_mut_or_err(key)?.set_flag(NodeFlags::VISIBLE, visible);
        Ok(())
    }

    pub fn set_pickable(&mut self, key: NodeKey, pickable: bool) -> Result<()> {
        self.node_mut_or_err(key)?.set_flag(NodeFlags::PICKABLE, pickable);
        Ok(())
    }

    /// Replace the renderable payload. The node's volume is not changed.
    pub fn set_renderable(&mut self, key: NodeKey, renderable: Option<RenderableObject>) -> Result<()> {
        self.node_mut_or_err(key)?.set_renderable(renderable);
        Ok(())
    }

    fn node_mut_or_err(&mut self, key: NodeKey) -> Result<&mut SceneNode> {
        match self.nodes.get_mut(key) {
            Some(node) => Ok(node),
            None => Err(crate::engine_err!(SOURCE, "Unknown node {:?}", key)),
        }
    }

    // ===== MATRICES AND BOUNDS =====

    /// Recompute world matrices and bounds of `key`'s subtree, then the
    /// bounds of every ancestor.
    pub fn update_graph(&mut self, key: NodeKey) -> Result<()> {
        self.check_known(key)?;
        self.refresh_subtree(key);
        self.propagate_bounds_up(key);
        Ok(())
    }

    /// Recompute the bounds of `key`, then of every ancestor.
    ///
    /// `recursive = false` trusts the children's cached bounds and only
    /// recombines; `recursive = true` recomputes the whole subtree bottom-up.
    pub fn recalculate_bounds(&mut self, key: NodeKey, recursive: bool) -> Result<()> {
        self.check_known(key)?;
        if recursive {
            self.recalculate_subtree_bounds(key);
        } else {
            self.combine_bounds(key);
        }
        self.propagate_bounds_up(key);
        Ok(())
    }

    fn refresh_subtree(&mut self, key: NodeKey) {
        self.update_world_matrices(key);
        self.recalculate_subtree_bounds(key);
    }

    fn update_world_matrices(&mut self, key: NodeKey) {
        let parent_world = self.nodes
            .get(key)
            .and_then(|node| node.parent)
            .and_then(|parent| self.nodes.get(parent))
            .map(|parent| *parent.transformation.world_model_matrix())
            .unwrap_or(Mat4::IDENTITY);

        let mut stack = vec![(key, parent_world)];
        while let Some((current, parent_world)) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current) {
                let world = node.transformation.calculate_world_model_matrix(&parent_world);
                stack.extend(node.children.iter().map(|child| (*child, world)));
            }
        }
    }

    fn recalculate_subtree_bounds(&mut self, key: NodeKey) {
        let mut order = vec![key];
        order.extend(self.descendants(key));
        // Children before parents
        for current in order.into_iter().rev() {
            self.combine_bounds(current);
        }
    }

    /// Own volume in world space united with the children's cached bounds.
    fn combine_bounds(&mut self, key: NodeKey) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        let world = node.transformation.world_model_matrix();
        let mut bounds: Option<Aabb> = node.local_volume.map(|volume| volume.world_aabb(world));
        for child in &node.children {
            if let Some(child_bounds) = self.nodes.get(*child).and_then(|c| c.world_bounds) {
                match bounds.as_mut() {
                    Some(existing) => existing.merge(&child_bounds),
                    None => bounds = Some(child_bounds),
                }
            }
        }
        if let Some(node) = self.nodes.get_mut(key) {
            node.world_bounds = bounds;
        }
    }

    fn propagate_bounds_up(&mut self, key: NodeKey) {
        let mut current = self.nodes.get(key).and_then(|node| node.parent);
        while let Some(parent) = current {
            self.combine_bounds(parent);
            current = self.nodes.get(parent).and_then(|node| node.parent);
        }
    }

    // ===== QUERIES =====

    /// Attached nodes whose bounds are fully or partially inside the frustum.
    ///
    /// Depth-first; a subtree whose bounds are outside is never visited.
    /// Subtrees fully inside are collected without further tests. Nodes
    /// without any volume in their subtree are never returned.
    pub fn frustum_intersection(&self, frustum: &Frustum) -> Vec<NodeKey> {
        let mut result = Vec::new();
        let mut stack = self.children_reversed(self.root);

        while let Some(key) = stack.pop() {
            let Some(node) = self.nodes.get(key) else { continue };
            let Some(bounds) = node.world_bounds else { continue };

            match frustum.classify_aabb(&bounds) {
                FrustumTest::Outside => {}
                FrustumTest::Inside => {
                    result.push(key);
                    result.extend(
                        self.descendants(key)
                            .into_iter()
                            .filter(|d| self.nodes.get(*d).is_some_and(|n| n.world_bounds.is_some())),
                    );
                }
                FrustumTest::Partial => {
                    result.push(key);
                    stack.extend(node.children.iter().rev().copied());
                }
            }
        }
        result
    }

    /// Renderable, visible nodes inside the camera frustum.
    ///
    /// Also refreshes every node's in-frustum flag. Visibility is a
    /// per-node filter: an invisible node's children are still considered.
    pub fn visible_objects(&self, camera: &Camera) -> Vec<NodeKey> {
        for node in self.nodes.values() {
            node.set_in_frustum(false);
        }

        let mut visible = Vec::new();
        for key in self.frustum_intersection(camera.frustum()) {
            if let Some(node) = self.nodes.get(key) {
                node.set_in_frustum(true);
                if node.renderable().is_some() && node.is_visible() {
                    visible.push(key);
                }
            }
        }
        visible
    }

    /// Attached nodes whose own volume the ray hits, nearest first.
    pub fn ray_intersection(&self, ray: &Ray) -> Vec<RayHit> {
        let mut hits = Vec::new();
        let mut stack = self.children_reversed(self.root);

        while let Some(key) = stack.pop() {
            let Some(node) = self.nodes.get(key) else { continue };
            let Some(bounds) = node.world_bounds else { continue };
            if intersect_ray_aabb(ray, &bounds).is_none() {
                continue;
            }
            stack.extend(node.children.iter().rev().copied());

            let Some(volume) = node.local_volume else { continue };
            let world = node.transformation.world_model_matrix();
            let distance = match volume {
                BoundingVolume::Box(aabb) => intersect_ray_aabb(ray, &aabb.transformed(world)),
                BoundingVolume::Sphere(sphere) => {
                    let sphere = sphere.transformed(world);
                    intersect_ray_sphere(ray, sphere.center, sphere.radius)
                }
            };
            if let Some(distance) = distance {
                hits.push(RayHit { node: key, distance, point: ray.point_at(distance) });
            }
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Closest pickable node hit by the ray: the hit point with the smallest
    /// view-space depth wins.
    pub fn pick(&self, ray: &Ray, camera: &Camera) -> Option<RayHit> {
        self.ray_intersection(ray)
            .into_iter()
            .filter(|hit| self.nodes.get(hit.node).is_some_and(|node| node.is_pickable()))
            .min_by(|a, b| {
                camera.view_space_depth(a.point).total_cmp(&camera.view_space_depth(b.point))
            })
    }

    fn children_reversed(&self, key: NodeKey) -> Vec<NodeKey> {
        self.nodes
            .get(key)
            .map(|node| node.children.iter().rev().copied().collect())
            .unwrap_or_default()
    }
}

impl Default for GraphData {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "graph_data_tests.rs"]
mod tests;
