/// Resource-level geometry.
///
/// A `Geometry` is an indexed triangle list in local space plus its bounding
/// volumes, computed once at creation. GPU buffers are created lazily on the
/// render thread the first time the geometry is drawn, and again after a
/// context loss has invalidated them.

use glam::Vec3;
use parking_lot::Mutex;
use crate::bounds::{Aabb, BoundingSphere};
use crate::error::Result;
use crate::renderer::{BufferKind, GpuHandle, GraphicsDevice};
use crate::engine_bail;

const SOURCE: &str = "rajawali::Geometry";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryBuffers {
    pub vertices: GpuHandle,
    pub indices: GpuHandle,
}

pub struct Geometry {
    name: String,
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    bounding_box: Option<Aabb>,
    bounding_sphere: Option<BoundingSphere>,
    buffers: Mutex<Option<GeometryBuffers>>,
}

impl Geometry {
    /// Create a geometry from positions and triangle indices.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the index count is not a multiple of three or an
    /// index points past the last vertex.
    pub fn new(name: impl Into<String>, positions: Vec<Vec3>, indices: Vec<u32>) -> Result<Self> {
        let name = name.into();
        if indices.len() % 3 != 0 {
            engine_bail!(SOURCE, "Geometry '{}': {} indices is not a triangle list", name, indices.len());
        }
        if let Some(bad) = indices.iter().find(|i| **i as usize >= positions.len()) {
            engine_bail!(SOURCE, "Geometry '{}': index {} out of range ({} vertices)",
                name, bad, positions.len());
        }

        let bounding_box = Aabb::from_points(&positions);
        let bounding_sphere = BoundingSphere::from_points(&positions);
        Ok(Self {
            name,
            positions,
            indices,
            bounding_box,
            bounding_sphere,
            buffers: Mutex::new(None),
        })
    }

    /// Axis-aligned cube centred on the origin.
    pub fn cube(half_size: f32) -> Self {
        let h = half_size.abs();
        let positions = vec![
            Vec3::new(-h, -h, -h),
            Vec3::new(h, -h, -h),
            Vec3::new(h, h, -h),
            Vec3::new(-h, h, -h),
            Vec3::new(-h, -h, h),
            Vec3::new(h, -h, h),
            Vec3::new(h, h, h),
            Vec3::new(-h, h, h),
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1, 0, 3, 2, // back
            4, 5, 6, 4, 6, 7, // front
            0, 1, 5, 0, 5, 4, // bottom
            3, 6, 2, 3, 7, 6, // top
            0, 4, 7, 0, 7, 3, // left
            1, 2, 6, 1, 6, 5, // right
        ];
        let bounding_box = Aabb::from_points(&positions);
        let bounding_sphere = BoundingSphere::from_points(&positions);
        Self {
            name: "cube".to_string(),
            positions,
            indices,
            bounding_box,
            bounding_sphere,
            buffers: Mutex::new(None),
        }
    }

    // ===== ACCESSORS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Local-space box, `None` for an empty geometry.
    pub fn bounding_box(&self) -> Option<Aabb> {
        self.bounding_box
    }

    pub fn bounding_sphere(&self) -> Option<BoundingSphere> {
        self.bounding_sphere
    }

    /// Buffers from the last upload, valid or not.
    pub fn buffers(&self) -> Option<GeometryBuffers> {
        *self.buffers.lock()
    }

    // ===== GPU =====

    /// Upload vertex and index buffers if missing or stale.
    ///
    /// Must run on the render thread.
    pub fn ensure_buffers(&self, device: &mut dyn GraphicsDevice) -> Result<GeometryBuffers> {
        let mut buffers = self.buffers.lock();
        if let Some(current) = *buffers {
            if device.is_valid(current.vertices) && device.is_valid(current.indices) {
                return Ok(current);
            }
        }

        let uploaded = GeometryBuffers {
            vertices: device.upload_buffer(BufferKind::Vertex, bytemuck::cast_slice(&self.positions))?,
            indices: device.upload_buffer(BufferKind::Index, bytemuck::cast_slice(&self.indices))?,
        };
        crate::engine_debug!(SOURCE, "Uploaded buffers for '{}' ({} triangles)",
            self.name, self.triangle_count());
        *buffers = Some(uploaded);
        Ok(uploaded)
    }

    /// Free live buffers. Stale ones are simply forgotten.
    pub fn release_buffers(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        if let Some(current) = self.buffers.lock().take() {
            for handle in [current.vertices, current.indices] {
                if device.is_valid(handle) {
                    device.destroy(handle)?;
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Geometry")
            .field("name", &self.name)
            .field("vertices", &self.positions.len())
            .field("indices", &self.indices.len())
            .field("bounding_box", &self.bounding_box)
            .finish()
    }
}

#[cfg(test)]
#[path = "geometry_tests.rs"]
mod tests;
