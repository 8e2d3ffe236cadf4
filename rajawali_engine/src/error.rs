//! Error types for the Rajawali engine
//!
//! Structural mistakes (duplicate attach, cycles, illegal lifecycle
//! transitions) are programmer errors and surface as `InvalidState`.
//! Lock waits that are interrupted surface as `Interrupted` and must be
//! propagated, never swallowed. Failures inside render tasks are caught at
//! the task boundary and only reach a caller that explicitly waits on the
//! task's completion handle.

use std::fmt;

/// Result type for Rajawali engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Rajawali engine errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Structural or lifecycle violation (duplicate attach, cycle, unknown node, ...)
    InvalidState(String),

    /// The calling thread was interrupted while waiting for a scene lock
    Interrupted,

    /// A nested lock acquisition that would deadlock was attempted
    LockReentry(String),

    /// A render-thread-only operation was invoked from another thread
    NotRenderThread(String),

    /// The object has no renderer registered for the requested render pass
    UnsupportedRenderType(String),

    /// A GPU handle from a lost or different context was used
    InvalidHandle(String),

    /// Graphics backend failure
    BackendError(String),

    /// A render task body returned an error
    TaskFailed(String),

    /// A render task body panicked
    TaskPanicked(String),

    /// A render task was dropped before it could run
    TaskDiscarded,

    /// A bounded wait elapsed
    Timeout,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::Interrupted => write!(f, "Interrupted while waiting for lock"),
            Error::LockReentry(msg) => write!(f, "Lock reentry: {}", msg),
            Error::NotRenderThread(msg) => write!(f, "Not on render thread: {}", msg),
            Error::UnsupportedRenderType(msg) => write!(f, "Unsupported render type: {}", msg),
            Error::InvalidHandle(msg) => write!(f, "Invalid GPU handle: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::TaskFailed(msg) => write!(f, "Render task failed: {}", msg),
            Error::TaskPanicked(msg) => write!(f, "Render task panicked: {}", msg),
            Error::TaskDiscarded => write!(f, "Render task discarded before execution"),
            Error::Timeout => write!(f, "Timed out"),
        }
    }
}

impl std::error::Error for Error {}

/// Build an `Error::InvalidState`, logging it at error severity first.
///
/// ```ignore
/// return Err(engine_err!("rajawali::SceneGraph", "node {:?} already attached", key));
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::error::Error::InvalidState(message)
    }};
}

/// Early-return form of [`engine_err!`].
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
