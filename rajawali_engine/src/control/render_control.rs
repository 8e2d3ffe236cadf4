/// RenderControl - the render thread's side of the platform surface
///
/// The platform layer calls the `on_*` callbacks on its render thread. The
/// control tracks the lifecycle state, owns the graphics device, and each
/// frame drains the task queue before rendering the registered scenes.
///
/// The thread that delivers `on_render_context_acquired` becomes the render
/// thread. Frame and resize callbacks fail with `NotRenderThread` anywhere
/// else.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use glam::Vec4;
use parking_lot::Mutex;
use crate::camera::Viewport;
use crate::error::{Error, Result};
use crate::renderer::{ContextInfo, ContextType, GraphicsDevice};
use crate::scene::{FrameInfo, FrameStats, Scene};
use super::render_state::{next_state, RenderEvent, RenderState};
use super::render_task::{RenderTask, TaskContext, TaskHandle, TaskKind};
use super::render_task_queue::{DrainReport, RenderTaskQueue};
use super::render_thread::RenderThreadBinding;

const SOURCE: &str = "rajawali::RenderControl";

/// Render control configuration
#[derive(Debug, Clone)]
pub struct RenderControlConfig {
    /// Target frames per second. 0 renders on demand only.
    pub frame_rate: f64,
    /// Frames between FPS reports. 0 disables reporting.
    pub fps_report_interval: u32,
    /// Color the surface is cleared to each frame
    pub clear_color: Vec4,
}

impl Default for RenderControlConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60.0,
            fps_report_interval: 50,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

impl RenderControlConfig {
    /// Time between frames, `None` when rendering on demand.
    pub fn frame_interval(&self) -> Option<Duration> {
        if self.frame_rate > 0.0 && self.frame_rate.is_finite() {
            Some(Duration::from_secs_f64(1.0 / self.frame_rate))
        } else {
            None
        }
    }
}

/// Listener for render control events. Called on the render thread.
pub trait RenderControlClient: Send + Sync {
    fn on_fps_update(&self, _fps: f64) {}

    fn on_state_changed(&self, _previous: RenderState, _current: RenderState) {}
}

/// What one `on_render_frame` call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// False when the control was not running
    pub rendered: bool,
    pub frame: u64,
    pub tasks: DrainReport,
    pub stats: FrameStats,
}

#[derive(Debug, Default)]
struct FrameClock {
    started: Option<Instant>,
    last_frame: Option<Instant>,
    window_start: Option<Instant>,
    window_frames: u32,
    last_fps: f64,
}

impl FrameClock {
    fn tick(&mut self, now: Instant, frame: u64) -> FrameInfo {
        let started = *self.started.get_or_insert(now);
        let delta = self.last_frame.map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last_frame = Some(now);
        self.window_start.get_or_insert(now);
        FrameInfo {
            frame,
            elapsed: now.saturating_duration_since(started),
            delta,
        }
    }

    /// Count a finished frame. Returns the measured rate once per
    /// `interval` frames.
    fn count_frame(&mut self, now: Instant, interval: u32) -> Option<f64> {
        if interval == 0 {
            return None;
        }
        self.window_frames += 1;
        if self.window_frames < interval {
            return None;
        }
        let elapsed = self.window_start.map_or(Duration::ZERO, |start| now.saturating_duration_since(start));
        let fps = if elapsed.is_zero() {
            0.0
        } else {
            self.window_frames as f64 / elapsed.as_secs_f64()
        };
        self.window_frames = 0;
        self.window_start = Some(now);
        self.last_fps = fps;
        Some(fps)
    }

    /// Forget timing after a pause so the first delta is not the pause.
    fn reset_window(&mut self) {
        self.last_frame = None;
        self.window_start = None;
        self.window_frames = 0;
    }
}

pub struct RenderControl {
    config: RenderControlConfig,
    state: Mutex<RenderState>,
    device: Mutex<Box<dyn GraphicsDevice>>,
    binding: Arc<RenderThreadBinding>,
    tasks: Arc<RenderTaskQueue>,
    scenes: Arc<Mutex<Vec<Arc<Scene>>>>,
    viewport: Mutex<Viewport>,
    frame_count: AtomicU64,
    clock: Mutex<FrameClock>,
    client: Mutex<Option<Arc<dyn RenderControlClient>>>,
}

impl RenderControl {
    pub fn new(device: Box<dyn GraphicsDevice>, config: RenderControlConfig) -> Self {
        let binding = Arc::new(RenderThreadBinding::new());
        Self {
            config,
            state: Mutex::new(RenderState::Uninitialized),
            device: Mutex::new(device),
            tasks: Arc::new(RenderTaskQueue::new(Arc::clone(&binding))),
            binding,
            scenes: Arc::new(Mutex::new(Vec::new())),
            viewport: Mutex::new(Viewport::new(0, 0)),
            frame_count: AtomicU64::new(0),
            clock: Mutex::new(FrameClock::default()),
            client: Mutex::new(None),
        }
    }

    // ===== ACCESSORS =====

    pub fn config(&self) -> &RenderControlConfig {
        &self.config
    }

    pub fn state(&self) -> RenderState {
        *self.state.lock()
    }

    pub fn task_queue(&self) -> &Arc<RenderTaskQueue> {
        &self.tasks
    }

    pub fn binding(&self) -> &Arc<RenderThreadBinding> {
        &self.binding
    }

    pub fn viewport(&self) -> Viewport {
        *self.viewport.lock()
    }

    /// Frames rendered so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Acquire)
    }

    pub fn last_measured_fps(&self) -> f64 {
        self.clock.lock().last_fps
    }

    pub fn set_client(&self, client: Option<Arc<dyn RenderControlClient>>) {
        *self.client.lock() = client;
    }

    /// Registered scenes, in render order
    pub fn scenes(&self) -> Vec<Arc<Scene>> {
        self.scenes.lock().clone()
    }

    // ===== TASKS AND SCENES =====

    pub fn submit(&self, task: RenderTask) {
        self.tasks.submit(task);
    }

    pub fn submit_awaitable(&self, task: RenderTask) -> TaskHandle {
        self.tasks.submit_awaitable(task)
    }

    /// Register `scene` for rendering from the next drain on.
    pub fn add_scene(&self, scene: Arc<Scene>) -> TaskHandle {
        let scenes = Arc::clone(&self.scenes);
        let target = scene.name().to_string();
        self.submit_awaitable(
            RenderTask::new(TaskKind::AddScene, move |_| {
                let mut scenes = scenes.lock();
                if scenes.iter().any(|registered| Arc::ptr_eq(registered, &scene)) {
                    crate::engine_bail!(SOURCE, "Scene '{}' is already registered", scene.name());
                }
                scene.mark_needs_restore();
                scenes.push(scene);
                Ok(())
            })
            .with_target(target),
        )
    }

    /// Unregister `scene` at the next drain.
    pub fn remove_scene(&self, scene: &Arc<Scene>) -> TaskHandle {
        let scenes = Arc::clone(&self.scenes);
        let scene = Arc::clone(scene);
        let target = scene.name().to_string();
        self.submit_awaitable(
            RenderTask::new(TaskKind::RemoveScene, move |_| {
                let mut scenes = scenes.lock();
                let before = scenes.len();
                scenes.retain(|registered| !Arc::ptr_eq(registered, &scene));
                if scenes.len() == before {
                    crate::engine_bail!(SOURCE, "Scene '{}' is not registered", scene.name());
                }
                Ok(())
            })
            .with_target(target),
        )
    }

    // ===== PLATFORM CALLBACKS =====

    /// A GPU context was created on the calling thread.
    pub fn on_render_context_acquired(
        &self,
        context_type: ContextType,
        major_version: u32,
        minor_version: u32,
    ) -> Result<()> {
        let next = self.peek(RenderEvent::ContextAcquired)?;
        let info = ContextInfo { context_type, major_version, minor_version };

        self.binding.bind_current();
        self.device.lock().on_context_acquired(info)?;
        for scene in self.scenes() {
            scene.mark_needs_restore();
        }
        crate::engine_info!(SOURCE, "Render context acquired: {:?} {}.{}",
            context_type, major_version, minor_version);
        self.commit(next);
        Ok(())
    }

    pub fn on_surface_size_changed(&self, width: u32, height: u32) -> Result<()> {
        self.binding.assert_render_thread("on_surface_size_changed")?;
        let next = self.peek(RenderEvent::SurfaceSizeChanged)?;

        let viewport = Viewport::new(width, height);
        self.device.lock().set_viewport(viewport)?;
        *self.viewport.lock() = viewport;
        for scene in self.scenes() {
            scene.set_viewport(viewport);
        }
        self.commit(next);
        Ok(())
    }

    /// Drain queued tasks, then render every registered scene.
    ///
    /// Does nothing unless running. A failing scene is logged and the
    /// others still render; an interrupted scene lock aborts the frame.
    pub fn on_render_frame(&self) -> Result<FrameReport> {
        let state = self.state();
        if state == RenderState::Destroyed {
            crate::engine_bail!(SOURCE, "Frame requested after the render control was destroyed");
        }
        if !state.is_rendering() {
            return Ok(FrameReport { frame: self.frame_count(), ..FrameReport::default() });
        }
        self.binding.assert_render_thread("on_render_frame")?;

        let frame = self.frame_count.load(Ordering::Acquire);
        let info = self.clock.lock().tick(Instant::now(), frame);
        let mut device = self.device.lock();

        let tasks = {
            let mut context = TaskContext { device: &mut **device, frame };
            self.tasks.drain(&mut context)?
        };
        device.clear(self.config.clear_color)?;

        let mut stats = FrameStats::default();
        for scene in self.scenes() {
            match scene.render(&mut **device, &info) {
                Ok(scene_stats) => stats.accumulate(&scene_stats),
                Err(Error::Interrupted) => return Err(Error::Interrupted),
                Err(error) => {
                    crate::engine_error!(SOURCE, "Scene '{}' failed to render frame {}: {}",
                        scene.name(), frame, error);
                }
            }
        }
        drop(device);

        self.frame_count.fetch_add(1, Ordering::AcqRel);
        self.report_fps();
        Ok(FrameReport { rendered: true, frame, tasks, stats })
    }

    pub fn on_render_thread_pause(&self) -> Result<()> {
        let next = self.peek(RenderEvent::Pause)?;
        self.commit(next);
        Ok(())
    }

    pub fn on_render_thread_resume(&self) -> Result<()> {
        let next = self.peek(RenderEvent::Resume)?;
        self.clock.lock().reset_window();
        self.commit(next);
        Ok(())
    }

    /// The GPU context is gone. Every handle of it is invalid from now on;
    /// queued tasks are kept and run once frames resume.
    pub fn on_render_context_lost(&self) -> Result<()> {
        let next = self.peek(RenderEvent::ContextLost)?;

        self.device.lock().on_context_lost();
        for scene in self.scenes() {
            scene.mark_needs_restore();
        }
        self.binding.unbind();
        crate::engine_warn!(SOURCE, "Render context lost, {} task(s) pending", self.tasks.len());
        self.commit(next);
        Ok(())
    }

    /// Terminal shutdown. Pending and later tasks are discarded and scenes
    /// dropped.
    pub fn destroy(&self) -> Result<()> {
        let next = self.peek(RenderEvent::Destroy)?;

        self.tasks.close();
        self.scenes.lock().clear();
        self.binding.unbind();
        self.commit(next);
        Ok(())
    }

    // ===== INTERNALS =====

    fn peek(&self, event: RenderEvent) -> Result<RenderState> {
        let current = self.state();
        next_state(current, event).inspect_err(|error| {
            crate::engine_error!(SOURCE, "{}", error);
        })
    }

    fn commit(&self, next: RenderState) {
        let previous = std::mem::replace(&mut *self.state.lock(), next);
        if previous == next {
            return;
        }
        crate::engine_info!(SOURCE, "Render state {} -> {}", previous, next);
        let client = self.client.lock().clone();
        if let Some(client) = client {
            client.on_state_changed(previous, next);
        }
    }

    fn report_fps(&self) {
        let measured = self.clock.lock().count_frame(Instant::now(), self.config.fps_report_interval);
        let Some(fps) = measured else {
            return;
        };
        crate::engine_debug!(SOURCE, "Measured {:.1} FPS", fps);
        let client = self.client.lock().clone();
        if let Some(client) = client {
            client.on_fps_update(fps);
        }
    }
}

impl std::fmt::Debug for RenderControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderControl")
            .field("state", &self.state())
            .field("frame_count", &self.frame_count())
            .field("pending_tasks", &self.tasks.len())
            .field("scenes", &self.scenes.lock().len())
            .finish()
    }
}

#[cfg(test)]
#[path = "render_control_tests.rs"]
mod tests;
