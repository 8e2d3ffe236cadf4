/// Object renderers - per-object GPU state application
///
/// A `RenderableObject` is a geometry plus one `ObjectRenderer` per render
/// pass it takes part in. During traversal the scene asks the object to
/// render for a pass; the object selects its renderer, lets it apply the
/// state that differs from the previously used renderer, and hands the
/// renderer back so the next object can be compared against it.
///
/// `MaterialRenderer` is the stock renderer: a material's program and
/// textures plus fixed-function state.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use glam::Mat4;
use rustc_hash::FxHashMap;
use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::resource::{Geometry, Material};
use super::graphics_device::{BufferKind, CullMode, GraphicsDevice, RenderStateDesc};

pub const UNIFORM_MODEL_MATRIX: &str = "uModelMatrix";
pub const UNIFORM_VIEW_MATRIX: &str = "uViewMatrix";
pub const UNIFORM_PROJECTION_MATRIX: &str = "uProjectionMatrix";
pub const UNIFORM_VIEW_PROJECTION_MATRIX: &str = "uViewProjectionMatrix";

static NEXT_RENDERER_ID: AtomicU32 = AtomicU32::new(1);

/// Process-wide unique renderer id, never 0.
pub fn next_renderer_id() -> u32 {
    NEXT_RENDERER_ID.fetch_add(1, Ordering::Relaxed)
}

// ============================================================================
// Passes and per-frame data
// ============================================================================

/// Render pass an object can take part in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPassType {
    Color,
    Depth,
    Picking,
    Shadow,
}

impl fmt::Display for RenderPassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Camera matrices shared by every object in a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
}

impl FrameMatrices {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            view: *camera.view_matrix(),
            projection: *camera.projection_matrix(),
            view_projection: camera.view_projection_matrix(),
        }
    }
}

// ============================================================================
// ObjectRenderer trait
// ============================================================================

/// Applies GPU state for one kind of object in one pass
///
/// All methods run on the render thread.
pub trait ObjectRenderer: Send + Sync {
    /// Unique id. Equal ids mean identical GPU state.
    fn id(&self) -> u32;

    fn render_state(&self) -> RenderStateDesc;

    /// Bind program, textures and render state, skipping what `last_used`
    /// already left bound.
    fn ensure_state(&self, device: &mut dyn GraphicsDevice, last_used: Option<&dyn ObjectRenderer>) -> Result<()>;

    /// Upload camera matrices. Called once per renderer switch.
    fn set_camera_matrices(&self, device: &mut dyn GraphicsDevice, matrices: &FrameMatrices) -> Result<()>;

    /// Upload per-object uniforms.
    fn prepare_for_object(&self, device: &mut dyn GraphicsDevice, model: &Mat4) -> Result<()>;

    fn issue_draw_calls(&self, device: &mut dyn GraphicsDevice, geometry: &Geometry) -> Result<()>;
}

// ============================================================================
// RenderableObject
// ============================================================================

/// Renderable payload of a scene node
#[derive(Clone)]
pub struct RenderableObject {
    geometry: Arc<Geometry>,
    renderers: FxHashMap<RenderPassType, Arc<dyn ObjectRenderer>>,
}

impl RenderableObject {
    pub fn new(geometry: Arc<Geometry>) -> Self {
        Self {
            geometry,
            renderers: FxHashMap::default(),
        }
    }

    pub fn with_renderer(mut self, pass: RenderPassType, renderer: Arc<dyn ObjectRenderer>) -> Self {
        self.renderers.insert(pass, renderer);
        self
    }

    pub fn geometry(&self) -> &Arc<Geometry> {
        &self.geometry
    }

    /// Register or replace the renderer for `pass`. Returns the old one.
    pub fn set_renderer(&mut self, pass: RenderPassType, renderer: Arc<dyn ObjectRenderer>) -> Option<Arc<dyn ObjectRenderer>> {
        self.renderers.insert(pass, renderer)
    }

    pub fn remove_renderer(&mut self, pass: RenderPassType) -> Option<Arc<dyn ObjectRenderer>> {
        self.renderers.remove(&pass)
    }

    pub fn supports(&self, pass: RenderPassType) -> bool {
        self.renderers.contains_key(&pass)
    }

    /// # Errors
    ///
    /// `UnsupportedRenderType` when no renderer is registered for `pass`.
    pub fn renderer_for(&self, pass: RenderPassType) -> Result<&Arc<dyn ObjectRenderer>> {
        self.renderers.get(&pass).ok_or_else(|| {
            Error::UnsupportedRenderType(format!(
                "geometry '{}' has no renderer for the {} pass",
                self.geometry.name(),
                pass
            ))
        })
    }

    /// Draw this object for `pass` and return the renderer used.
    ///
    /// Camera matrices are only uploaded when the renderer differs from
    /// `last_used`.
    pub fn render(
        &self,
        pass: RenderPassType,
        device: &mut dyn GraphicsDevice,
        last_used: Option<&dyn ObjectRenderer>,
        matrices: &FrameMatrices,
        model: &Mat4,
    ) -> Result<Arc<dyn ObjectRenderer>> {
        let renderer = self.renderer_for(pass)?;
        let switched = last_used.map_or(true, |last| last.id() != renderer.id());

        renderer.ensure_state(device, last_used)?;
        if switched {
            renderer.set_camera_matrices(device, matrices)?;
        }
        renderer.prepare_for_object(device, model)?;
        renderer.issue_draw_calls(device, &self.geometry)?;
        Ok(Arc::clone(renderer))
    }
}

impl fmt::Debug for RenderableObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut passes: Vec<_> = self.renderers.keys().copied().collect();
        passes.sort_by_key(|pass| *pass as u8);
        f.debug_struct("RenderableObject")
            .field("geometry", &self.geometry.name())
            .field("passes", &passes)
            .finish()
    }
}

// ============================================================================
// MaterialRenderer
// ============================================================================

/// Renderer driven by a material: program, textures and render state
pub struct MaterialRenderer {
    id: u32,
    material: Arc<Material>,
    state: RenderStateDesc,
}

impl MaterialRenderer {
    pub fn builder(material: Arc<Material>) -> MaterialRendererBuilder {
        MaterialRendererBuilder::new(material)
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }
}

impl ObjectRenderer for MaterialRenderer {
    fn id(&self) -> u32 {
        self.id
    }

    fn render_state(&self) -> RenderStateDesc {
        self.state
    }

    fn ensure_state(&self, device: &mut dyn GraphicsDevice, last_used: Option<&dyn ObjectRenderer>) -> Result<()> {
        if last_used.is_some_and(|last| last.id() == self.id) {
            return Ok(());
        }

        let program = self.material.ensure_program(device)?;
        device.bind_program(program)?;
        self.material.bind_textures(device)?;
        if last_used.map(|last| last.render_state()) != Some(self.state) {
            device.apply_render_state(&self.state)?;
        }
        Ok(())
    }

    fn set_camera_matrices(&self, device: &mut dyn GraphicsDevice, matrices: &FrameMatrices) -> Result<()> {
        device.set_uniform_mat4(UNIFORM_VIEW_MATRIX, &matrices.view)?;
        device.set_uniform_mat4(UNIFORM_PROJECTION_MATRIX, &matrices.projection)?;
        device.set_uniform_mat4(UNIFORM_VIEW_PROJECTION_MATRIX, &matrices.view_projection)
    }

    fn prepare_for_object(&self, device: &mut dyn GraphicsDevice, model: &Mat4) -> Result<()> {
        device.set_uniform_mat4(UNIFORM_MODEL_MATRIX, model)
    }

    fn issue_draw_calls(&self, device: &mut dyn GraphicsDevice, geometry: &Geometry) -> Result<()> {
        if geometry.index_count() == 0 {
            return Ok(());
        }
        let buffers = geometry.ensure_buffers(device)?;
        device.bind_buffer(BufferKind::Vertex, buffers.vertices)?;
        device.bind_buffer(BufferKind::Index, buffers.indices)?;
        device.draw_indexed(geometry.index_count())
    }
}

impl fmt::Debug for MaterialRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterialRenderer")
            .field("id", &self.id)
            .field("material", &self.material.name())
            .field("state", &self.state)
            .finish()
    }
}

/// Builder for [`MaterialRenderer`]
pub struct MaterialRendererBuilder {
    material: Arc<Material>,
    state: RenderStateDesc,
}

impl MaterialRendererBuilder {
    pub fn new(material: Arc<Material>) -> Self {
        Self {
            material,
            state: RenderStateDesc::default(),
        }
    }

    /// Draw both faces. Overrides `back_sided`.
    pub fn double_sided(mut self, enabled: bool) -> Self {
        if enabled {
            self.state.cull_mode = CullMode::None;
        } else if self.state.cull_mode == CullMode::None {
            self.state.cull_mode = CullMode::Back;
        }
        self
    }

    /// Draw back faces only.
    pub fn back_sided(mut self, enabled: bool) -> Self {
        self.state.cull_mode = if enabled { CullMode::Front } else { CullMode::Back };
        self
    }

    pub fn blending(mut self, enabled: bool) -> Self {
        self.state.blending = enabled;
        self
    }

    pub fn depth_test(mut self, enabled: bool) -> Self {
        self.state.depth_test = enabled;
        self
    }

    pub fn depth_write(mut self, enabled: bool) -> Self {
        self.state.depth_write = enabled;
        self
    }

    pub fn build(self) -> Arc<MaterialRenderer> {
        Arc::new(MaterialRenderer {
            id: next_renderer_id(),
            material: self.material,
            state: self.state,
        })
    }
}

// ============================================================================
// Draw ordering
// ============================================================================

/// Sort key grouping draws by renderer: id in the high half, draw index in
/// the low half.
pub fn draw_sort_key(renderer_id: u32, index: u32) -> u64 {
    ((renderer_id as u64) << 32) | index as u64
}

/// Draw index stored in a sort key.
pub fn draw_index(key: u64) -> usize {
    (key & 0xFFFF_FFFF) as usize
}

/// Sort draw keys so equal renderers are adjacent, keeping submission
/// order within a renderer.
pub fn sort_draw_keys(keys: &mut [u64]) {
    use rdst::RadixSort;
    keys.radix_sort_unstable();
}

#[cfg(test)]
#[path = "object_renderer_tests.rs"]
mod tests;
