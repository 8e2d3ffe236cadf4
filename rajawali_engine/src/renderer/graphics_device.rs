/// GraphicsDevice trait - the GPU operations the scene graph needs
///
/// Only bind, draw and upload. Every call must come from the render thread;
/// the device itself never checks, `RenderControl` asserts it before handing
/// the device out.
///
/// Handles carry the context generation they were created in. After a
/// context loss every handle from the previous generation is invalid and
/// owners recreate them lazily on next use.

use std::fmt;
use glam::{Mat4, Vec4};
use crate::camera::Viewport;
use crate::error::Result;

// ============================================================================
// Handles and descriptors
// ============================================================================

/// Opaque GPU object handle, tagged with the context generation that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuHandle {
    pub id: u32,
    pub generation: u32,
}

impl fmt::Display for GpuHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@gen{}", self.id, self.generation)
    }
}

/// Graphics API family reported when a context is acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextType {
    OpenGles,
    Vulkan,
    Headless,
}

/// Context description passed to `on_context_acquired`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextInfo {
    pub context_type: ContextType,
    pub major_version: u32,
    pub minor_version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8,
    Rgb8,
    Luminance8,
}

impl TextureFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::Rgb8 => 3,
            TextureFormat::Luminance8 => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Back,
    Front,
}

/// Fixed-function state a renderer applies before drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderStateDesc {
    pub cull_mode: CullMode,
    pub blending: bool,
    pub depth_test: bool,
    pub depth_write: bool,
}

impl Default for RenderStateDesc {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            blending: false,
            depth_test: true,
            depth_write: true,
        }
    }
}

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Render-thread-only GPU device
pub trait GraphicsDevice: Send {
    // ===== CONTEXT LIFECYCLE =====

    /// A new context exists. Starts a new handle generation.
    fn on_context_acquired(&mut self, info: ContextInfo) -> Result<()>;

    /// The context is gone. All live handles become invalid.
    fn on_context_lost(&mut self);

    /// Current context, if any
    fn context(&self) -> Option<ContextInfo>;

    /// Generation of the current (or last) context
    fn generation(&self) -> u32;

    /// True if `handle` names a live object of the current context
    fn is_valid(&self, handle: GpuHandle) -> bool;

    // ===== UPLOAD =====

    fn create_program(&mut self, vertex_source: &str, fragment_source: &str) -> Result<GpuHandle>;

    fn upload_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<GpuHandle>;

    fn upload_texture(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
        data: &[u8],
    ) -> Result<GpuHandle>;

    /// Free a live object. Stale handles fail with `InvalidHandle`.
    fn destroy(&mut self, handle: GpuHandle) -> Result<()>;

    // ===== BIND =====

    fn bind_program(&mut self, program: GpuHandle) -> Result<()>;

    fn bind_buffer(&mut self, kind: BufferKind, buffer: GpuHandle) -> Result<()>;

    fn bind_texture(&mut self, unit: u32, texture: GpuHandle) -> Result<()>;

    fn set_uniform_mat4(&mut self, name: &str, value: &Mat4) -> Result<()>;

    fn apply_render_state(&mut self, state: &RenderStateDesc) -> Result<()>;

    // ===== DRAW =====

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    fn clear(&mut self, color: Vec4) -> Result<()>;

    /// Draw `index_count` indices from the bound index buffer
    fn draw_indexed(&mut self, index_count: u32) -> Result<()>;
}
