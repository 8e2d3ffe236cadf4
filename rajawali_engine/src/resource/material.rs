/// Resource-level material.
///
/// A material pairs shader sources with the textures it samples. Shader
/// generation itself happens elsewhere; here the sources are opaque text.
/// The linked program is created lazily on the render thread and recreated
/// after a context loss.

use std::sync::Arc;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use crate::control::TaskKind;
use crate::error::Result;
use crate::renderer::{GpuHandle, GraphicsDevice};
use crate::engine_bail;
use super::resource_manager::GpuResource;
use super::texture::Texture;

const SOURCE: &str = "rajawali::Material";

/// Material creation descriptor
#[derive(Debug, Clone)]
pub struct MaterialDesc {
    pub name: String,
    pub vertex_shader: String,
    pub fragment_shader: String,
    /// Bound to texture units in order
    pub textures: Vec<Arc<Texture>>,
}

pub struct Material {
    name: String,
    vertex_shader: String,
    fragment_shader: String,
    textures: Vec<Arc<Texture>>,
    program: Mutex<Option<GpuHandle>>,
}

impl Material {
    /// # Errors
    ///
    /// `InvalidState` for empty shader sources or a texture listed twice.
    pub fn from_desc(desc: MaterialDesc) -> Result<Self> {
        if desc.vertex_shader.trim().is_empty() || desc.fragment_shader.trim().is_empty() {
            engine_bail!(SOURCE, "Material '{}' needs both a vertex and a fragment shader", desc.name);
        }
        let mut seen = FxHashSet::default();
        for texture in &desc.textures {
            if !seen.insert(texture.name()) {
                engine_bail!(SOURCE, "Material '{}' lists texture '{}' twice", desc.name, texture.name());
            }
        }
        Ok(Self {
            name: desc.name,
            vertex_shader: desc.vertex_shader,
            fragment_shader: desc.fragment_shader,
            textures: desc.textures,
            program: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn textures(&self) -> &[Arc<Texture>] {
        &self.textures
    }

    /// Program from the last link, valid or not.
    pub fn program(&self) -> Option<GpuHandle> {
        *self.program.lock()
    }

    /// Link the program if missing or stale and return the live handle.
    pub fn ensure_program(&self, device: &mut dyn GraphicsDevice) -> Result<GpuHandle> {
        let mut program = self.program.lock();
        if let Some(current) = *program {
            if device.is_valid(current) {
                return Ok(current);
            }
        }
        let linked = device.create_program(&self.vertex_shader, &self.fragment_shader)?;
        crate::engine_debug!(SOURCE, "Linked program for material '{}' as {}", self.name, linked);
        *program = Some(linked);
        Ok(linked)
    }

    /// Bind every texture to its unit, uploading stale ones first.
    pub fn bind_textures(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        for (unit, texture) in self.textures.iter().enumerate() {
            let handle = texture.ensure_texture(device)?;
            device.bind_texture(unit as u32, handle)?;
        }
        Ok(())
    }
}

impl GpuResource for Material {
    const ADD_TASK: TaskKind = TaskKind::AddMaterial;
    const REMOVE_TASK: TaskKind = TaskKind::RemoveMaterial;

    fn name(&self) -> &str {
        &self.name
    }

    fn ensure_uploaded(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        self.ensure_program(device)?;
        for texture in &self.textures {
            texture.ensure_texture(device)?;
        }
        Ok(())
    }

    /// Frees the program only. Textures may be shared with other materials.
    fn release(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        if let Some(current) = self.program.lock().take() {
            if device.is_valid(current) {
                device.destroy(current)?;
            }
        }
        Ok(())
    }

    fn is_uploaded(&self, device: &dyn GraphicsDevice) -> bool {
        self.program().is_some_and(|program| device.is_valid(program))
    }
}

impl std::fmt::Debug for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Material")
            .field("name", &self.name)
            .field("textures", &self.textures.len())
            .field("program", &self.program())
            .finish()
    }
}

#[cfg(test)]
#[path = "material_tests.rs"]
mod tests;
