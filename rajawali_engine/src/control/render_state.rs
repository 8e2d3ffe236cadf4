/// Render control lifecycle
///
/// ```text
/// Uninitialized ─acquire─▶ ContextAcquired ─resize─▶ Running ⇄ Paused
///                               ▲                       │        │
///                               └──acquire── ContextLost ◀──lose─┘
/// any ─destroy─▶ Destroyed (terminal)
/// ```
///
/// `next_state` is a pure function so the table can be tested on its own.
/// Events that do not apply to the current state leave it unchanged;
/// events that cannot happen in a sane platform sequence are errors.

use std::fmt;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderState {
    Uninitialized,
    ContextAcquired,
    Running,
    Paused,
    ContextLost,
    Destroyed,
}

impl RenderState {
    /// True while a GPU context exists.
    pub fn has_context(&self) -> bool {
        matches!(self, RenderState::ContextAcquired | RenderState::Running | RenderState::Paused)
    }

    /// True when frames should be produced.
    pub fn is_rendering(&self) -> bool {
        *self == RenderState::Running
    }
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Platform surface events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderEvent {
    ContextAcquired,
    SurfaceSizeChanged,
    Pause,
    Resume,
    ContextLost,
    Destroy,
}

/// Apply `event` to `current`.
///
/// # Errors
///
/// `InvalidState` for any event after `Destroyed`, a resize without a
/// context, or a context loss before any context existed.
pub fn next_state(current: RenderState, event: RenderEvent) -> Result<RenderState> {
    use RenderEvent as E;
    use RenderState as S;

    let next = match (current, event) {
        (S::Destroyed, _) => None,
        (_, E::Destroy) => Some(S::Destroyed),

        // A second acquire without a loss means the old context is gone.
        (_, E::ContextAcquired) => Some(S::ContextAcquired),

        (S::ContextAcquired | S::Running, E::SurfaceSizeChanged) => Some(S::Running),
        (S::Paused, E::SurfaceSizeChanged) => Some(S::Paused),
        (S::Uninitialized | S::ContextLost, E::SurfaceSizeChanged) => None,

        (S::Running, E::Pause) => Some(S::Paused),
        (S::Paused, E::Resume) => Some(S::Running),
        (state, E::Pause | E::Resume) => Some(state),

        (S::ContextAcquired | S::Running | S::Paused | S::ContextLost, E::ContextLost) => Some(S::ContextLost),
        (S::Uninitialized, E::ContextLost) => None,
    };

    next.ok_or_else(|| {
        Error::InvalidState(format!("render event {:?} is not valid in state {}", event, current))
    })
}

#[cfg(test)]
#[path = "render_state_tests.rs"]
mod tests;
