/// Scene - a scene graph with its camera, frame callbacks and resources.
///
/// Application threads edit the graph directly (blocking on its write lock)
/// or defer edits through render tasks. The render thread calls `render`
/// once per frame after the task queue has been drained:
///
/// 1. restore GPU resources if a new context was acquired
/// 2. apply a pending camera switch
/// 3. pre-frame callbacks
/// 4. cull and sort under the graph read lock, pre-draw callbacks, draw
/// 5. post-frame callbacks
///
/// Pre-draw callbacks run while the read lock is held, so they may query
/// the graph but not edit it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use crate::camera::{Camera, Viewport};
use crate::control::{RenderTask, RenderTaskQueue, TaskHandle, TaskKind};
use crate::error::Result;
use crate::renderer::object_renderer::{draw_index, draw_sort_key, sort_draw_keys};
use crate::renderer::{FrameMatrices, GraphicsDevice, ObjectRenderer, RenderPassType};
use crate::resource::{Material, MaterialManager, Texture, TextureManager};
use super::graph_data::GraphData;
use super::scene_graph::{NodeHandle, SceneGraph, SceneGraphConfig};
use super::scene_node::{NodeKey, SceneNode};

const SOURCE: &str = "rajawali::Scene";

/// Timing of the frame being rendered
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInfo {
    /// Frame index since the render control started
    pub frame: u64,
    /// Time since the first frame
    pub elapsed: Duration,
    /// Time since the previous frame
    pub delta: Duration,
}

/// What one `render` call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Renderable, visible nodes inside the frustum
    pub visible: usize,
    pub drawn: usize,
    /// Draws that failed and were skipped
    pub failed: usize,
    /// Visible nodes with no renderer for the pass
    pub skipped: usize,
    pub renderer_switches: usize,
}

impl FrameStats {
    pub fn accumulate(&mut self, other: &FrameStats) {
        self.visible += other.visible;
        self.drawn += other.drawn;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.renderer_switches += other.renderer_switches;
    }
}

/// Per-frame hooks, all optional. Called on the render thread.
pub trait FrameCallback: Send + Sync {
    /// Before culling. The graph may be edited here.
    fn on_pre_frame(&self, _scene: &Scene, _frame: &FrameInfo) {}

    /// After culling and sorting, before the first draw. Read-only.
    fn on_pre_draw(&self, _scene: &Scene, _frame: &FrameInfo) {}

    /// After the last draw.
    fn on_post_frame(&self, _scene: &Scene, _frame: &FrameInfo) {}
}

pub struct Scene {
    name: String,
    graph: Arc<SceneGraph>,
    tasks: Arc<RenderTaskQueue>,
    materials: Arc<MaterialManager>,
    textures: Arc<TextureManager>,
    camera: Mutex<Camera>,
    next_camera: Mutex<Option<Camera>>,
    callbacks: Mutex<Vec<Arc<dyn FrameCallback>>>,
    needs_restore: AtomicBool,
}

impl Scene {
    /// Create a new scene (internal: only via Engine)
    pub(crate) fn new(
        name: impl Into<String>,
        camera: Camera,
        graph_config: SceneGraphConfig,
        tasks: Arc<RenderTaskQueue>,
        materials: Arc<MaterialManager>,
        textures: Arc<TextureManager>,
    ) -> Self {
        Self {
            name: name.into(),
            graph: Arc::new(SceneGraph::with_config(graph_config)),
            tasks,
            materials,
            textures,
            camera: Mutex::new(camera),
            next_camera: Mutex::new(None),
            callbacks: Mutex::new(Vec::new()),
            needs_restore: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &Arc<SceneGraph> {
        &self.graph
    }

    pub fn node_handle(&self, key: NodeKey) -> NodeHandle {
        NodeHandle::new(Arc::clone(&self.graph), key)
    }

    // ===== IMMEDIATE EDITS (block on the write lock) =====

    /// Insert `node` and attach it under the root in one locked step.
    pub fn add(&self, node: SceneNode) -> Result<NodeHandle> {
        let key = self.graph.request_modifications(|data| {
            let key = data.create_node(node);
            data.add(key).map(|_| key)
        })??;
        Ok(self.node_handle(key))
    }

    /// Insert `node` and attach it under `parent` in one locked step.
    pub fn add_child(&self, parent: NodeKey, node: SceneNode) -> Result<NodeHandle> {
        let key = self.graph.request_modifications(|data| {
            let key = data.create_node(node);
            match data.add_child(parent, key) {
                Ok(()) => Ok(key),
                Err(error) => {
                    // The node was just created and never attached.
                    let _ = data.destroy(key);
                    Err(error)
                }
            }
        })??;
        Ok(self.node_handle(key))
    }

    /// Detach a node. `Ok(false)` if it was not attached.
    pub fn remove(&self, key: NodeKey) -> Result<bool> {
        self.graph.remove(key)
    }

    // ===== DEFERRED EDITS (render tasks) =====

    /// Attach `key` under `parent` (the root when `None`) during the next
    /// task drain.
    pub fn queue_attach(&self, key: NodeKey, parent: Option<NodeKey>) -> TaskHandle {
        let graph = Arc::clone(&self.graph);
        self.tasks.submit_awaitable(
            RenderTask::new(TaskKind::AddObject, move |_| {
                graph.request_modifications(|data| match parent {
                    Some(parent) => data.add_child(parent, key),
                    None => data.add(key),
                })?
            })
            .with_target(format!("{:?}", key)),
        )
    }

    /// Detach `key` during the next task drain.
    pub fn queue_remove(&self, key: NodeKey) -> TaskHandle {
        let graph = Arc::clone(&self.graph);
        self.tasks.submit_awaitable(
            RenderTask::new(TaskKind::RemoveObject, move |_| graph.remove(key).map(|_| ()))
                .with_target(format!("{:?}", key)),
        )
    }

    /// Move `key` under `new_parent` during the next task drain.
    pub fn queue_reparent(&self, key: NodeKey, new_parent: NodeKey) -> TaskHandle {
        let graph = Arc::clone(&self.graph);
        self.tasks.submit_awaitable(
            RenderTask::new(TaskKind::Reparent, move |_| graph.reparent(key, new_parent))
                .with_target(format!("{:?}", key)),
        )
    }

    /// Run `modify` under one write lock during the next task drain.
    pub fn queue_modifications<F>(&self, modify: F) -> TaskHandle
    where
        F: FnOnce(&mut GraphData) -> Result<()> + Send + 'static,
    {
        let graph = Arc::clone(&self.graph);
        self.tasks.submit_awaitable(RenderTask::new(TaskKind::SceneModification, move |_| {
            graph.request_modifications(modify)?
        }))
    }

    // ===== RESOURCES =====

    /// Register a material with the shared manager on the render thread.
    pub fn add_material(&self, material: Arc<Material>) -> TaskHandle {
        self.tasks.submit_awaitable(self.materials.add(material))
    }

    pub fn remove_material(&self, name: &str) -> TaskHandle {
        self.tasks.submit_awaitable(self.materials.remove(name))
    }

    pub fn add_texture(&self, texture: Arc<Texture>) -> TaskHandle {
        self.tasks.submit_awaitable(self.textures.add(texture))
    }

    pub fn remove_texture(&self, name: &str) -> TaskHandle {
        self.tasks.submit_awaitable(self.textures.remove(name))
    }

    pub fn mark_needs_restore(&self) {
        self.needs_restore.store(true, Ordering::Release);
    }

    pub fn needs_restore(&self) -> bool {
        self.needs_restore.load(Ordering::Acquire)
    }

    /// Re-upload registered resources once after a context change.
    /// Returns true if a restore ran.
    pub fn restore_for_new_context_if_needed(&self, device: &mut dyn GraphicsDevice) -> Result<bool> {
        if !self.needs_restore.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }
        let restored = match self.reload_resources(device) {
            Ok(restored) => restored,
            Err(error) => {
                self.needs_restore.store(true, Ordering::Release);
                return Err(error);
            }
        };
        crate::engine_info!(SOURCE, "Scene '{}' restored {} resource(s) for the new context", self.name, restored);
        Ok(true)
    }

    fn reload_resources(&self, device: &mut dyn GraphicsDevice) -> Result<usize> {
        Ok(self.materials.reload(device)? + self.textures.reload(device)?)
    }

    // ===== CAMERA =====

    /// Current camera
    pub fn camera(&self) -> Camera {
        self.camera.lock().clone()
    }

    /// Replace the camera at the start of the next frame.
    pub fn switch_camera(&self, camera: Camera) {
        *self.next_camera.lock() = Some(camera);
    }

    pub fn has_pending_camera(&self) -> bool {
        self.next_camera.lock().is_some()
    }

    /// Resize the viewport of the current and any pending camera.
    pub fn set_viewport(&self, viewport: Viewport) {
        self.camera.lock().set_viewport(viewport);
        if let Some(next) = self.next_camera.lock().as_mut() {
            next.set_viewport(viewport);
        }
    }

    // ===== FRAME CALLBACKS =====

    pub fn register_frame_callback(&self, callback: Arc<dyn FrameCallback>) {
        self.callbacks.lock().push(callback);
    }

    /// Returns false if `callback` was not registered.
    pub fn unregister_frame_callback(&self, callback: &Arc<dyn FrameCallback>) -> bool {
        let mut callbacks = self.callbacks.lock();
        let before = callbacks.len();
        callbacks.retain(|registered| !Arc::ptr_eq(registered, callback));
        callbacks.len() != before
    }

    // ===== RENDERING (render thread) =====

    /// Render the color pass.
    pub fn render(&self, device: &mut dyn GraphicsDevice, frame: &FrameInfo) -> Result<FrameStats> {
        self.render_pass(RenderPassType::Color, device, frame)
    }

    /// Render every visible object that has a renderer for `pass`, grouped
    /// by renderer.
    ///
    /// Failures of single objects are logged and counted; the frame goes
    /// on. Errors from the graph lock (interruption) are returned.
    pub fn render_pass(
        &self,
        pass: RenderPassType,
        device: &mut dyn GraphicsDevice,
        frame: &FrameInfo,
    ) -> Result<FrameStats> {
        self.restore_for_new_context_if_needed(device)?;
        if let Some(next) = self.next_camera.lock().take() {
            *self.camera.lock() = next;
            crate::engine_debug!(SOURCE, "Scene '{}' switched camera at frame {}", self.name, frame.frame);
        }

        let callbacks: Vec<Arc<dyn FrameCallback>> = self.callbacks.lock().clone();
        for callback in &callbacks {
            callback.on_pre_frame(self, frame);
        }

        let camera = self.camera();
        let matrices = FrameMatrices::from_camera(&camera);
        let mut stats = FrameStats::default();
        {
            let data = self.graph.acquire_read_lock()?;
            let visible = data.visible_objects(&camera);
            stats.visible = visible.len();

            let mut draw_keys = Vec::with_capacity(visible.len());
            for (index, key) in visible.iter().enumerate() {
                let Some(renderable) = data.node(*key).and_then(|node| node.renderable()) else {
                    continue;
                };
                match renderable.renderer_for(pass) {
                    Ok(renderer) => draw_keys.push(draw_sort_key(renderer.id(), index as u32)),
                    Err(error) => {
                        stats.skipped += 1;
                        crate::engine_trace!(SOURCE, "Scene '{}': {}", self.name, error);
                    }
                }
            }
            sort_draw_keys(&mut draw_keys);

            for callback in &callbacks {
                callback.on_pre_draw(self, frame);
            }

            let mut last_used: Option<Arc<dyn ObjectRenderer>> = None;
            for draw_key in draw_keys {
                let key = visible[draw_index(draw_key)];
                let Some(node) = data.node(key) else {
                    continue;
                };
                let Some(renderable) = node.renderable() else {
                    continue;
                };
                let model = *node.transformation().world_model_matrix();
                match renderable.render(pass, device, last_used.as_deref(), &matrices, &model) {
                    Ok(used) => {
                        if last_used.as_ref().map_or(true, |last| last.id() != used.id()) {
                            stats.renderer_switches += 1;
                        }
                        last_used = Some(used);
                        stats.drawn += 1;
                    }
                    Err(error) => {
                        stats.failed += 1;
                        crate::engine_error!(SOURCE, "Scene '{}': failed to draw {:?}: {}", self.name, key, error);
                    }
                }
            }
        }

        for callback in &callbacks {
            callback.on_post_frame(self, frame);
        }
        Ok(stats)
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("callbacks", &self.callbacks.lock().len())
            .field("needs_restore", &self.needs_restore())
            .finish()
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
