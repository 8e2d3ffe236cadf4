/// RenderLoop - dedicated render thread driving a RenderControl
///
/// Platform code that has no render thread of its own posts `SurfaceEvent`s
/// here. The loop thread becomes the render thread when the context is
/// acquired, paces frames at the configured rate while running, and blocks
/// on events otherwise.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use crate::error::{Error, Result};
use crate::renderer::ContextType;
use super::render_control::RenderControl;
use super::render_state::RenderState;

const SOURCE: &str = "rajawali::RenderLoop";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    ContextAcquired {
        context_type: ContextType,
        major_version: u32,
        minor_version: u32,
    },
    SizeChanged {
        width: u32,
        height: u32,
    },
    Pause,
    Resume,
    ContextLost,
    /// Render one frame now, regardless of pacing
    RequestRender,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct RenderLoopConfig {
    pub thread_name: String,
}

impl Default for RenderLoopConfig {
    fn default() -> Self {
        Self {
            thread_name: "rajawali-render".to_string(),
        }
    }
}

pub struct RenderLoop {
    sender: Sender<SurfaceEvent>,
    thread: Option<JoinHandle<()>>,
}

impl RenderLoop {
    /// Start the render thread.
    ///
    /// # Errors
    ///
    /// `BackendError` if the OS refuses to spawn the thread.
    pub fn spawn(control: Arc<RenderControl>, config: RenderLoopConfig) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let thread = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || run(control, receiver))
            .map_err(|error| Error::BackendError(format!(
                "Failed to spawn render thread '{}': {}", config.thread_name, error
            )))?;

        crate::engine_info!(SOURCE, "Render thread '{}' started", config.thread_name);
        Ok(Self {
            sender,
            thread: Some(thread),
        })
    }

    /// Post an event to the render thread.
    ///
    /// # Errors
    ///
    /// `InvalidState` once the loop has stopped.
    pub fn send(&self, event: SurfaceEvent) -> Result<()> {
        self.sender.send(event).map_err(|_| {
            crate::engine_err!(SOURCE, "Render loop has stopped, dropped {:?}", event)
        })
    }

    pub fn request_render(&self) -> Result<()> {
        self.send(SurfaceEvent::RequestRender)
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|thread| !thread.is_finished())
    }

    /// Stop the loop, destroy the control and join the thread.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        // The loop may already be gone; joining is enough then.
        let _ = self.sender.send(SurfaceEvent::Shutdown);
        thread.join().map_err(|_| {
            crate::engine_error!(SOURCE, "Render thread panicked");
            Error::BackendError("render thread panicked".to_string())
        })
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn run(control: Arc<RenderControl>, events: Receiver<SurfaceEvent>) {
    let interval = control.config().frame_interval();
    let mut next_frame = Instant::now();

    loop {
        let paced = interval.filter(|_| control.state().is_rendering());
        let event = match paced {
            Some(_) => match events.recv_deadline(next_frame) {
                Ok(event) => Some(event),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match events.recv() {
                Ok(event) => Some(event),
                Err(_) => break,
            },
        };

        match event {
            None => {
                render_frame(&control);
                next_frame = schedule_next(next_frame, interval.unwrap_or(Duration::ZERO));
            }
            Some(SurfaceEvent::Shutdown) => break,
            Some(SurfaceEvent::RequestRender) => render_frame(&control),
            Some(event) => {
                if let Err(error) = dispatch(&control, event) {
                    crate::engine_error!(SOURCE, "Failed to handle {:?}: {}", event, error);
                }
                next_frame = Instant::now();
            }
        }
    }

    if control.state() != RenderState::Destroyed {
        if let Err(error) = control.destroy() {
            crate::engine_error!(SOURCE, "Render control destroy failed: {}", error);
        }
    }
    crate::engine_info!(SOURCE, "Render thread stopped after {} frame(s)", control.frame_count());
}

fn dispatch(control: &RenderControl, event: SurfaceEvent) -> Result<()> {
    match event {
        SurfaceEvent::ContextAcquired { context_type, major_version, minor_version } => {
            control.on_render_context_acquired(context_type, major_version, minor_version)
        }
        SurfaceEvent::SizeChanged { width, height } => control.on_surface_size_changed(width, height),
        SurfaceEvent::Pause => control.on_render_thread_pause(),
        SurfaceEvent::Resume => control.on_render_thread_resume(),
        SurfaceEvent::ContextLost => control.on_render_context_lost(),
        SurfaceEvent::RequestRender | SurfaceEvent::Shutdown => Ok(()),
    }
}

fn render_frame(control: &RenderControl) {
    match control.on_render_frame() {
        Ok(_) => {}
        Err(Error::Interrupted) => {
            crate::engine_warn!(SOURCE, "Frame {} interrupted", control.frame_count());
        }
        Err(error) => {
            crate::engine_error!(SOURCE, "Frame {} failed: {}", control.frame_count(), error);
        }
    }
}

/// Next deadline on the fixed grid. Missed slots are dropped, not replayed.
fn schedule_next(previous: Instant, interval: Duration) -> Instant {
    let next = previous + interval;
    let now = Instant::now();
    if next < now {
        now + interval
    } else {
        next
    }
}

#[cfg(test)]
#[path = "render_loop_tests.rs"]
mod tests;
