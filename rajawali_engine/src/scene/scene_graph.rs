/// SceneGraph - the locked tree of scene nodes.
///
/// Every structural mutation holds the write lock for its full duration and
/// every query holds the read lock for its full duration. Readers run
/// concurrently with each other, never with a writer.
///
/// Lock discipline on a single thread:
/// - read inside read is allowed
/// - any nesting that involves the write lock fails with `LockReentry`
///
/// So a `Transformer` or a `request_modifications` closure must not call
/// back into the same graph; they receive the unlocked data directly.

use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Duration;
use crate::bounds::Ray;
use crate::camera::{Camera, Frustum};
use crate::error::Result;
use crate::transform::{Transformable, Transformer};
use super::graph_data::{GraphData, RayHit};
use super::scene_lock::{SceneLock, SceneReadGuard, SceneWriteGuard};
use super::scene_node::{NodeKey, SceneNode};

/// Scene graph configuration
#[derive(Debug, Clone)]
pub struct SceneGraphConfig {
    /// How often a blocked lock waiter checks for interruption
    pub lock_poll_interval: Duration,
}

impl Default for SceneGraphConfig {
    fn default() -> Self {
        Self {
            lock_poll_interval: Duration::from_millis(5),
        }
    }
}

pub struct SceneGraph {
    lock: SceneLock<GraphData>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::with_config(SceneGraphConfig::default())
    }

    pub fn with_config(config: SceneGraphConfig) -> Self {
        Self {
            lock: SceneLock::new(GraphData::new(), config.lock_poll_interval),
        }
    }

    // ===== LOCKING =====

    /// Scoped shared access. Blocks while a writer holds the lock.
    pub fn acquire_read_lock(&self) -> Result<SceneReadGuard<'_, GraphData>> {
        self.lock.acquire_read()
    }

    /// Scoped exclusive access. Blocks until all readers and writers release.
    pub fn acquire_write_lock(&self) -> Result<SceneWriteGuard<'_, GraphData>> {
        self.lock.acquire_write()
    }

    /// Exclusive access, giving up with `Timeout` after `timeout`.
    pub fn try_acquire_write_lock_for(&self, timeout: Duration) -> Result<SceneWriteGuard<'_, GraphData>> {
        self.lock.try_acquire_write_for(timeout)
    }

    /// Make `thread`'s current or next wait on this graph fail with
    /// `Error::Interrupted`.
    pub fn interrupt(&self, thread: ThreadId) {
        self.lock.interrupt(thread);
    }

    /// The underlying lock, for holder inspection.
    pub fn lock(&self) -> &SceneLock<GraphData> {
        &self.lock
    }

    // ===== MUTATIONS (write lock) =====

    /// Insert a detached node and return its key.
    pub fn create_node(&self, node: SceneNode) -> Result<NodeKey> {
        Ok(self.acquire_write_lock()?.create_node(node))
    }

    /// Attach a detached node under the root.
    pub fn add(&self, key: NodeKey) -> Result<()> {
        self.acquire_write_lock()?.add(key)
    }

    /// Attach a detached node under `parent`.
    pub fn add_child(&self, parent: NodeKey, key: NodeKey) -> Result<()> {
        self.acquire_write_lock()?.add_child(parent, key)
    }

    /// Attach several nodes under the root, all or nothing.
    pub fn add_all(&self, keys: &[NodeKey]) -> Result<()> {
        self.acquire_write_lock()?.add_all(keys)
    }

    /// Detach a node. `Ok(false)` if it was not attached to anything.
    pub fn remove(&self, key: NodeKey) -> Result<bool> {
        Ok(self.acquire_write_lock()?.remove(key))
    }

    /// Detach and free a node with its subtree.
    pub fn destroy(&self, key: NodeKey) -> Result<usize> {
        self.acquire_write_lock()?.destroy(key)
    }

    pub fn reparent(&self, key: NodeKey, new_parent: NodeKey) -> Result<()> {
        self.acquire_write_lock()?.reparent(key, new_parent)
    }

    /// Destroy every attached node.
    pub fn clear(&self) -> Result<usize> {
        Ok(self.acquire_write_lock()?.clear())
    }

    /// Run `transformer` once on the node's transformation under the write
    /// lock, then propagate matrices and bounds.
    pub fn request_transformations<T: Transformer>(&self, key: NodeKey, transformer: T) -> Result<()> {
        self.acquire_write_lock()?.transform(key, transformer)
    }

    /// Run several edits under a single write-lock acquisition.
    pub fn request_modifications<R, F>(&self, modify: F) -> Result<R>
    where
        F: FnOnce(&mut GraphData) -> R,
    {
        let mut guard = self.acquire_write_lock()?;
        Ok(modify(&mut guard))
    }

    pub fn recalculate_bounds(&self, key: NodeKey, recursive: bool) -> Result<()> {
        self.acquire_write_lock()?.recalculate_bounds(key, recursive)
    }

    // ===== QUERIES (read lock) =====

    pub fn contains(&self, key: NodeKey) -> Result<bool> {
        Ok(self.acquire_read_lock()?.contains(key))
    }

    pub fn contains_all(&self, keys: &[NodeKey]) -> Result<bool> {
        Ok(self.acquire_read_lock()?.contains_all(keys))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.acquire_read_lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.acquire_read_lock()?.is_empty())
    }

    /// Nodes whose bounds are fully or partially inside the frustum.
    pub fn intersection(&self, frustum: &Frustum) -> Result<Vec<NodeKey>> {
        Ok(self.acquire_read_lock()?.frustum_intersection(frustum))
    }

    /// Renderable, visible nodes inside the camera frustum.
    pub fn visible_object_intersection(&self, camera: &Camera) -> Result<Vec<NodeKey>> {
        Ok(self.acquire_read_lock()?.visible_objects(camera))
    }

    /// Nodes whose volume the ray hits, nearest first.
    pub fn ray_intersection(&self, ray: &Ray) -> Result<Vec<RayHit>> {
        Ok(self.acquire_read_lock()?.ray_intersection(ray))
    }

    /// Closest pickable node along the ray.
    pub fn pick(&self, ray: &Ray, camera: &Camera) -> Result<Option<RayHit>> {
        Ok(self.acquire_read_lock()?.pick(ray, camera))
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// A node paired with the graph that owns it.
///
/// Cheap to clone and safe to send to any thread.
#[derive(Clone)]
pub struct NodeHandle {
    graph: Arc<SceneGraph>,
    key: NodeKey,
}

impl NodeHandle {
    pub fn new(graph: Arc<SceneGraph>, key: NodeKey) -> Self {
        Self { graph, key }
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn graph(&self) -> &Arc<SceneGraph> {
        &self.graph
    }

    /// Attach under the root.
    pub fn attach(&self) -> Result<()> {
        self.graph.add(self.key)
    }

    /// Detach from the parent. `Ok(false)` if not attached.
    pub fn detach(&self) -> Result<bool> {
        self.graph.remove(self.key)
    }

    pub fn is_attached(&self) -> Result<bool> {
        self.graph.contains(self.key)
    }
}

impl Transformable for NodeHandle {
    fn request_transformations<T: Transformer>(&self, transformer: T) -> Result<()> {
        self.graph.request_transformations(self.key, transformer)
    }
}

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandle").field("key", &self.key).finish()
    }
}

#[cfg(test)]
#[path = "scene_graph_tests.rs"]
mod tests;
