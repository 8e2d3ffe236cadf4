/// RenderTaskQueue - multi-producer, render-thread-consumer FIFO
///
/// Submission never blocks. The render thread drains at the start of each
/// frame, before traversal. A drain runs only the tasks present when it
/// starts; tasks submitted meanwhile, including by running tasks, wait for
/// the next drain. The queue is unbounded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use crossbeam_queue::SegQueue;
use crate::error::Result;
use super::render_task::{RenderTask, TaskContext, TaskHandle};
use super::render_thread::RenderThreadBinding;

const SOURCE: &str = "rajawali::RenderTaskQueue";

/// Outcome of one drain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub executed: usize,
    pub failed: usize,
}

pub struct RenderTaskQueue {
    tasks: SegQueue<RenderTask>,
    binding: Arc<RenderThreadBinding>,
    closed: AtomicBool,
}

impl RenderTaskQueue {
    pub fn new(binding: Arc<RenderThreadBinding>) -> Self {
        Self {
            tasks: SegQueue::new(),
            binding,
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueue fire-and-forget.
    pub fn submit(&self, task: RenderTask) {
        if self.is_closed() {
            crate::engine_warn!(SOURCE, "Dropped {} task submitted to a closed queue", task.kind());
            return;
        }
        crate::engine_trace!(SOURCE, "Queued {} task", task.kind());
        self.tasks.push(task);
        // A close that raced with the push must not strand the task.
        if self.is_closed() {
            self.discard_all();
        }
    }

    /// Enqueue and return a handle to wait on the outcome.
    pub fn submit_awaitable(&self, mut task: RenderTask) -> TaskHandle {
        let handle = task.completion_handle(Some(Arc::clone(&self.binding)));
        self.submit(task);
        handle
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run the tasks queued so far, in submission order.
    ///
    /// A failing task is logged and counted; the rest still run.
    ///
    /// # Errors
    ///
    /// `NotRenderThread` if called from any other thread.
    pub fn drain(&self, context: &mut TaskContext<'_>) -> Result<DrainReport> {
        self.binding.assert_render_thread("RenderTaskQueue::drain")?;

        let mut report = DrainReport::default();
        let pending = self.tasks.len();
        for _ in 0..pending {
            let Some(task) = self.tasks.pop() else {
                break;
            };
            report.executed += 1;
            if task.run(context).is_err() {
                report.failed += 1;
            }
        }
        if report.executed > 0 {
            crate::engine_trace!(SOURCE, "Drained {} task(s), {} failed", report.executed, report.failed);
        }
        Ok(report)
    }

    /// Drop every queued task without running it. Waiters see
    /// `TaskDiscarded`. Returns how many were dropped.
    pub fn discard_all(&self) -> usize {
        let mut discarded = 0;
        while self.tasks.pop().is_some() {
            discarded += 1;
        }
        if discarded > 0 {
            crate::engine_warn!(SOURCE, "Discarded {} pending task(s)", discarded);
        }
        discarded
    }

    /// Refuse further submissions and discard what is queued.
    /// Returns how many pending tasks were dropped.
    pub fn close(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        self.discard_all()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn binding(&self) -> &Arc<RenderThreadBinding> {
        &self.binding
    }
}

#[cfg(test)]
#[path = "render_task_queue_tests.rs"]
mod tests;
