/// RenderTask - a deferred unit of work executed once on the render thread
///
/// A task is a boxed closure tagged with its kind and an optional target
/// name for diagnostics. Failures and panics inside the body are caught at
/// the execution boundary, logged, and delivered only to a caller holding
/// the task's `TaskHandle`. Without a handle, submission is fire-and-forget.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use crate::error::{Error, Result};
use crate::renderer::GraphicsDevice;
use super::render_thread::RenderThreadBinding;

const SOURCE: &str = "rajawali::RenderTask";

/// What a task does, for logging and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    AddObject,
    RemoveObject,
    Reparent,
    SceneModification,
    AddMaterial,
    RemoveMaterial,
    AddTexture,
    RemoveTexture,
    AddScene,
    RemoveScene,
    Custom,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskKind::AddObject => "add-object",
            TaskKind::RemoveObject => "remove-object",
            TaskKind::Reparent => "reparent",
            TaskKind::SceneModification => "scene-modification",
            TaskKind::AddMaterial => "add-material",
            TaskKind::RemoveMaterial => "remove-material",
            TaskKind::AddTexture => "add-texture",
            TaskKind::RemoveTexture => "remove-texture",
            TaskKind::AddScene => "add-scene",
            TaskKind::RemoveScene => "remove-scene",
            TaskKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// What a task body may touch while it runs on the render thread
pub struct TaskContext<'a> {
    pub device: &'a mut dyn GraphicsDevice,
    /// Index of the frame whose drain runs this task
    pub frame: u64,
}

pub type TaskBody = Box<dyn FnOnce(&mut TaskContext<'_>) -> Result<()> + Send>;

// ============================================================================
// RenderTask
// ============================================================================

pub struct RenderTask {
    kind: TaskKind,
    target: Option<String>,
    body: TaskBody,
    completion: Option<Sender<Result<()>>>,
}

impl RenderTask {
    pub fn new<F>(kind: TaskKind, body: F) -> Self
    where
        F: FnOnce(&mut TaskContext<'_>) -> Result<()> + Send + 'static,
    {
        Self {
            kind,
            target: None,
            body: Box::new(body),
            completion: None,
        }
    }

    /// Name the object the task acts on, for failure logs.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Attach a completion channel and return the waiting side.
    pub(crate) fn completion_handle(&mut self, binding: Option<Arc<RenderThreadBinding>>) -> TaskHandle {
        let (sender, receiver) = bounded(1);
        self.completion = Some(sender);
        TaskHandle {
            kind: self.kind,
            receiver,
            outcome: Mutex::new(None),
            binding,
        }
    }

    /// Run the body once, catching errors and panics.
    ///
    /// Returns the same outcome that is delivered to a waiting handle.
    pub(crate) fn run(self, context: &mut TaskContext<'_>) -> Result<()> {
        let RenderTask { kind, target, body, completion } = self;
        let label = match &target {
            Some(target) => format!("{} task on '{}'", kind, target),
            None => format!("{} task", kind),
        };

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| body(context))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(Error::TaskFailed(format!("{}: {}", label, error))),
            Err(payload) => Err(Error::TaskPanicked(format!("{}: {}", label, panic_message(&*payload)))),
        };

        if let Err(error) = &outcome {
            crate::engine_error!(SOURCE, "{}", error);
        }
        if let Some(sender) = completion {
            // The waiter may have dropped its handle.
            let _ = sender.send(outcome.clone());
        }
        outcome
    }
}

impl fmt::Debug for RenderTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderTask")
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("awaited", &self.completion.is_some())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ============================================================================
// TaskHandle
// ============================================================================

/// Opt-in completion future for one task
///
/// The outcome is cached once received, so it can be read any number of
/// times. A task dropped without running reports `TaskDiscarded`.
pub struct TaskHandle {
    kind: TaskKind,
    receiver: Receiver<Result<()>>,
    outcome: Mutex<Option<Result<()>>>,
    binding: Option<Arc<RenderThreadBinding>>,
}

impl TaskHandle {
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Block until the task has run.
    ///
    /// # Errors
    ///
    /// The task's own failure, `TaskDiscarded` if it was dropped unrun, or
    /// `InvalidState` when called on the render thread, which would never
    /// get to run it.
    pub fn wait(&self) -> Result<()> {
        if let Some(outcome) = self.try_result() {
            return outcome;
        }
        self.check_not_render_thread()?;
        let outcome = self.receiver.recv().unwrap_or(Err(Error::TaskDiscarded));
        self.store(outcome)
    }

    /// Like `wait`, failing with `Timeout` once `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<()> {
        if let Some(outcome) = self.try_result() {
            return outcome;
        }
        self.check_not_render_thread()?;
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => self.store(outcome),
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout),
            Err(RecvTimeoutError::Disconnected) => self.store(Err(Error::TaskDiscarded)),
        }
    }

    /// Outcome if the task already ran, without blocking.
    pub fn try_result(&self) -> Option<Result<()>> {
        if let Some(outcome) = self.outcome.lock().clone() {
            return Some(outcome);
        }
        match self.receiver.try_recv() {
            Ok(outcome) => Some(self.store(outcome)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.store(Err(Error::TaskDiscarded))),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.try_result().is_some()
    }

    fn store(&self, outcome: Result<()>) -> Result<()> {
        *self.outcome.lock() = Some(outcome.clone());
        outcome
    }

    fn check_not_render_thread(&self) -> Result<()> {
        if self.binding.as_ref().is_some_and(|binding| binding.is_render_thread()) {
            crate::engine_bail!(SOURCE, "Waiting for a {} task on the render thread would never return", self.kind);
        }
        Ok(())
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("kind", &self.kind)
            .field("outcome", &*self.outcome.lock())
            .finish()
    }
}

#[cfg(test)]
#[path = "render_task_tests.rs"]
mod tests;
