/// Resource-level texture.
///
/// Pixel data stays on the CPU side so the texture can be re-uploaded
/// after a context loss. The GPU handle is created lazily on the render
/// thread.

use parking_lot::Mutex;
use crate::control::TaskKind;
use crate::error::Result;
use crate::renderer::{GpuHandle, GraphicsDevice, TextureFormat};
use crate::engine_bail;
use super::resource_manager::GpuResource;

const SOURCE: &str = "rajawali::Texture";

/// Texture creation descriptor
#[derive(Debug, Clone)]
pub struct TextureDesc {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
}

pub struct Texture {
    name: String,
    width: u32,
    height: u32,
    format: TextureFormat,
    data: Vec<u8>,
    handle: Mutex<Option<GpuHandle>>,
}

impl Texture {
    /// # Errors
    ///
    /// `InvalidState` for a zero-sized texture or when `data` does not match
    /// `width * height * bytes_per_pixel`.
    pub fn from_desc(desc: TextureDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            engine_bail!(SOURCE, "Texture '{}' has zero size {}x{}", desc.name, desc.width, desc.height);
        }
        let expected = desc.width as usize * desc.height as usize * desc.format.bytes_per_pixel();
        if desc.data.len() != expected {
            engine_bail!(SOURCE, "Texture '{}': expected {} bytes of {:?} data, got {}",
                desc.name, expected, desc.format, desc.data.len());
        }
        Ok(Self {
            name: desc.name,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            data: desc.data,
            handle: Mutex::new(None),
        })
    }

    /// Single-color RGBA texture, handy as a placeholder.
    pub fn solid(name: impl Into<String>, rgba: [u8; 4]) -> Self {
        Self {
            name: name.into(),
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8,
            data: rgba.to_vec(),
            handle: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Handle from the last upload, valid or not.
    pub fn handle(&self) -> Option<GpuHandle> {
        *self.handle.lock()
    }

    /// Upload if missing or stale and return the live handle.
    pub fn ensure_texture(&self, device: &mut dyn GraphicsDevice) -> Result<GpuHandle> {
        let mut handle = self.handle.lock();
        if let Some(current) = *handle {
            if device.is_valid(current) {
                return Ok(current);
            }
        }
        let uploaded = device.upload_texture(self.width, self.height, self.format, &self.data)?;
        crate::engine_debug!(SOURCE, "Uploaded texture '{}' as {}", self.name, uploaded);
        *handle = Some(uploaded);
        Ok(uploaded)
    }
}

impl GpuResource for Texture {
    const ADD_TASK: TaskKind = TaskKind::AddTexture;
    const REMOVE_TASK: TaskKind = TaskKind::RemoveTexture;

    fn name(&self) -> &str {
        &self.name
    }

    fn ensure_uploaded(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        self.ensure_texture(device).map(|_| ())
    }

    fn release(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        if let Some(current) = self.handle.lock().take() {
            if device.is_valid(current) {
                device.destroy(current)?;
            }
        }
        Ok(())
    }

    fn is_uploaded(&self, device: &dyn GraphicsDevice) -> bool {
        self.handle().is_some_and(|handle| device.is_valid(handle))
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("handle", &self.handle())
            .finish()
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
