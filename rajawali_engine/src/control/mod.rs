//! Render control: lifecycle, render thread ownership and cross-thread tasks
//!
//! Any thread may submit a `RenderTask`. Only the render thread runs them,
//! at the start of each frame and before the scenes are traversed.

mod render_control;
mod render_loop;
mod render_state;
mod render_task;
mod render_task_queue;
mod render_thread;

pub use render_control::{FrameReport, RenderControl, RenderControlClient, RenderControlConfig};
pub use render_loop::{RenderLoop, RenderLoopConfig, SurfaceEvent};
pub use render_state::{next_state, RenderEvent, RenderState};
pub use render_task::{RenderTask, TaskBody, TaskContext, TaskHandle, TaskKind};
pub use render_task_queue::{DrainReport, RenderTaskQueue};
pub use render_thread::RenderThreadBinding;
