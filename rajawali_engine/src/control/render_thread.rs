/// RenderThreadBinding - which thread currently owns the GPU context
///
/// Bound when a context is acquired, cleared when it is lost or the render
/// control is destroyed. Render-thread-only operations call
/// `assert_render_thread` first.

use std::thread::{self, ThreadId};
use parking_lot::Mutex;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct RenderThreadBinding {
    thread: Mutex<Option<ThreadId>>,
}

impl RenderThreadBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Designate the calling thread as the render thread.
    pub fn bind_current(&self) {
        *self.thread.lock() = Some(thread::current().id());
    }

    pub fn unbind(&self) {
        *self.thread.lock() = None;
    }

    pub fn render_thread(&self) -> Option<ThreadId> {
        *self.thread.lock()
    }

    pub fn is_render_thread(&self) -> bool {
        *self.thread.lock() == Some(thread::current().id())
    }

    /// `Err(NotRenderThread)` unless called from the bound render thread.
    pub fn assert_render_thread(&self, operation: &str) -> Result<()> {
        if self.is_render_thread() {
            Ok(())
        } else {
            Err(Error::NotRenderThread(format!(
                "{} called from {:?}",
                operation,
                thread::current().name().unwrap_or("<unnamed>")
            )))
        }
    }
}

#[cfg(test)]
#[path = "render_thread_tests.rs"]
mod tests;
