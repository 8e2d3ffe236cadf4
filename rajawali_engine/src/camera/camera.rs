/// Camera - passive view/projection data container.
///
/// The camera stores what the caller gives it. `Camera::perspective` is a
/// convenience that derives view, projection and frustum from high-level
/// parameters; after that, setters store values and recompute nothing
/// except the frustum, which always follows view and projection.

use glam::{Mat4, Vec3};
use super::frustum::Frustum;

/// Render area on the surface, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    /// Width / height, or 1.0 for an empty viewport.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    view_matrix: Mat4,
    projection_matrix: Mat4,
    frustum: Frustum,
    viewport: Viewport,
}

impl Camera {
    /// Create a camera from explicit matrices. The frustum is extracted
    /// from `projection * view`.
    pub fn new(view: Mat4, projection: Mat4, viewport: Viewport) -> Self {
        Self {
            view_matrix: view,
            projection_matrix: projection,
            frustum: Frustum::from_view_projection(&(projection * view)),
            viewport,
        }
    }

    /// Right-handed perspective camera at `eye` looking at `target`.
    ///
    /// Uses OpenGL clip depth, matching the frustum extraction.
    pub fn perspective(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_radians: f32,
        near: f32,
        far: f32,
        viewport: Viewport,
    ) -> Self {
        let view = Mat4::look_at_rh(eye, target, up);
        let projection = Mat4::perspective_rh_gl(fov_y_radians, viewport.aspect_ratio(), near, far);
        Self::new(view, projection, viewport)
    }

    // ===== GETTERS =====

    /// View matrix (inverse of the camera's world transform).
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    /// Projection matrix (perspective or orthographic).
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// Combined view-projection matrix (projection * view).
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// World-space camera position, recovered from the view matrix.
    pub fn position(&self) -> Vec3 {
        self.view_matrix.inverse().w_axis.truncate()
    }

    /// Distance in front of the camera along its view axis.
    ///
    /// Positive for points in front (view space looks down -Z).
    pub fn view_space_depth(&self, world_point: Vec3) -> f32 {
        -self.view_matrix.transform_point3(world_point).z
    }

    // ===== SETTERS =====

    pub fn set_view(&mut self, matrix: Mat4) {
        self.view_matrix = matrix;
        self.update_frustum();
    }

    pub fn set_projection(&mut self, matrix: Mat4) {
        self.projection_matrix = matrix;
        self.update_frustum();
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn update_frustum(&mut self) {
        self.frustum = Frustum::from_view_projection(&self.view_projection_matrix());
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
