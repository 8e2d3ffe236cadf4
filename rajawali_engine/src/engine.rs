/// Rajawali Engine - explicitly constructed context object
///
/// The engine owns the render control, the resource managers shared by all
/// scenes, and optionally the dedicated render thread. There is no global
/// state: create one `Engine` per rendering surface and pass it around.

use std::sync::Arc;
use parking_lot::Mutex;
use crate::camera::Camera;
use crate::control::{
    RenderControl, RenderControlConfig, RenderLoop, RenderLoopConfig, RenderState, SurfaceEvent,
    TaskHandle,
};
use crate::error::Result;
use crate::renderer::GraphicsDevice;
use crate::resource::{MaterialManager, TextureManager};
use crate::scene::{Scene, SceneGraphConfig};

const SOURCE: &str = "rajawali::Engine";

/// Engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Applied to every scene the engine creates
    pub scene_graph: SceneGraphConfig,
    pub render_control: RenderControlConfig,
    pub render_loop: RenderLoopConfig,
}

/// Engine context
///
/// # Example
///
/// ```no_run
/// use rajawali_engine::rajawali::{Engine, EngineConfig, SurfaceEvent};
/// use rajawali_engine::rajawali::camera::{Camera, Viewport};
/// use rajawali_engine::rajawali::render::{ContextType, HeadlessDevice};
/// use rajawali_engine::glam::Vec3;
///
/// let engine = Engine::new(Box::new(HeadlessDevice::new()), EngineConfig::default());
/// let camera = Camera::perspective(Vec3::Z * 10.0, Vec3::ZERO, Vec3::Y, 1.0, 0.1, 100.0, Viewport::new(640, 480));
/// let scene = engine.create_scene("main", camera);
/// engine.add_scene(&scene);
///
/// engine.start()?;
/// engine.send_event(SurfaceEvent::ContextAcquired {
///     context_type: ContextType::OpenGles,
///     major_version: 3,
///     minor_version: 0,
/// })?;
/// engine.send_event(SurfaceEvent::SizeChanged { width: 640, height: 480 })?;
/// // ...
/// engine.shutdown()?;
/// # Ok::<(), rajawali_engine::rajawali::Error>(())
/// ```
pub struct Engine {
    config: EngineConfig,
    control: Arc<RenderControl>,
    materials: Arc<MaterialManager>,
    textures: Arc<TextureManager>,
    render_loop: Mutex<Option<RenderLoop>>,
}

impl Engine {
    pub fn new(device: Box<dyn GraphicsDevice>, config: EngineConfig) -> Self {
        let control = Arc::new(RenderControl::new(device, config.render_control.clone()));
        Self {
            config,
            control,
            materials: Arc::new(MaterialManager::new()),
            textures: Arc::new(TextureManager::new()),
            render_loop: Mutex::new(None),
        }
    }

    // ===== ACCESSORS =====

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Render control, for platforms that drive the callbacks themselves
    pub fn control(&self) -> &Arc<RenderControl> {
        &self.control
    }

    pub fn material_manager(&self) -> &Arc<MaterialManager> {
        &self.materials
    }

    pub fn texture_manager(&self) -> &Arc<TextureManager> {
        &self.textures
    }

    // ===== SCENES =====

    /// Create a scene wired to this engine's task queue and managers.
    /// The scene is not rendered until passed to `add_scene`.
    pub fn create_scene(&self, name: impl Into<String>, camera: Camera) -> Arc<Scene> {
        Arc::new(Scene::new(
            name,
            camera,
            self.config.scene_graph.clone(),
            Arc::clone(self.control.task_queue()),
            Arc::clone(&self.materials),
            Arc::clone(&self.textures),
        ))
    }

    pub fn add_scene(&self, scene: &Arc<Scene>) -> TaskHandle {
        self.control.add_scene(Arc::clone(scene))
    }

    pub fn remove_scene(&self, scene: &Arc<Scene>) -> TaskHandle {
        self.control.remove_scene(scene)
    }

    // ===== RENDER THREAD =====

    /// Spawn the dedicated render thread.
    ///
    /// # Errors
    ///
    /// `InvalidState` if already started or shut down.
    pub fn start(&self) -> Result<()> {
        let mut slot = self.render_loop.lock();
        if slot.is_some() {
            crate::engine_bail!(SOURCE, "Render thread already started");
        }
        if self.control.state() == RenderState::Destroyed {
            crate::engine_bail!(SOURCE, "Engine was shut down");
        }
        *slot = Some(RenderLoop::spawn(Arc::clone(&self.control), self.config.render_loop.clone())?);
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.render_loop.lock().as_ref().is_some_and(RenderLoop::is_running)
    }

    /// Forward a platform event to the render thread.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the render thread is not running.
    pub fn send_event(&self, event: SurfaceEvent) -> Result<()> {
        match self.render_loop.lock().as_ref() {
            Some(render_loop) => render_loop.send(event),
            None => Err(crate::engine_err!(SOURCE, "Render thread not started, dropped {:?}", event)),
        }
    }

    pub fn request_render(&self) -> Result<()> {
        self.send_event(SurfaceEvent::RequestRender)
    }

    /// Stop the render thread if any and destroy the render control.
    /// Pending tasks are discarded. Idempotent.
    pub fn shutdown(&self) -> Result<()> {
        let render_loop = self.render_loop.lock().take();
        if let Some(render_loop) = render_loop {
            render_loop.shutdown()?;
        }
        if self.control.state() != RenderState::Destroyed {
            self.control.destroy()?;
        }
        crate::engine_info!(SOURCE, "Engine shut down");
        Ok(())
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
