/*!
# Rajawali Engine

Scene graph and render control core of the Rajawali 3D engine.

Any thread may edit the scene graph; one render thread owns the GPU
context. The crate provides the pieces that keep the two safe together.

## Architecture

- **SceneGraph**: node tree guarded by an interruptible read/write lock
- **Scene**: scene graph plus camera, frame callbacks and the draw pass
- **RenderControl**: render lifecycle, task draining and FPS reporting
- **RenderTaskQueue**: cross-thread work executed on the render thread
- **GraphicsDevice**: the GPU backend seam (`HeadlessDevice` for tests)
- **ResourceManager**: reference-counted materials and textures

The GPU backend and the windowing layer are supplied by the caller through
`GraphicsDevice` and the `RenderControl` callbacks (or `RenderLoop` events).
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod bounds;
pub mod camera;
pub mod control;
pub mod renderer;
pub mod resource;
pub mod scene;
pub mod transform;

// Main rajawali namespace module
pub mod rajawali {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine context
    pub use crate::engine::{Engine, EngineConfig};

    // Render control and render thread
    pub use crate::control::{
        RenderControl, RenderControlClient, RenderControlConfig, RenderLoop, RenderLoopConfig,
        RenderState, RenderTask, SurfaceEvent, TaskHandle, TaskKind,
    };

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{
            reset_logger, set_logger, set_min_severity, DefaultLogger, LogEntry, LogSeverity, Logger,
        };
    }

    pub mod bounds {
        pub use crate::bounds::*;
    }

    pub mod camera {
        pub use crate::camera::*;
    }

    pub mod control {
        pub use crate::control::*;
    }

    // Render sub-module with all rendering types
    pub mod render {
        pub use crate::renderer::*;
    }

    pub mod resource {
        pub use crate::resource::*;
    }

    pub mod scene {
        pub use crate::scene::*;
    }

    pub mod transform {
        pub use crate::transform::*;
    }
}

// Re-export math library at crate root
pub use glam;
