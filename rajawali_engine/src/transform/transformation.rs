/// Transformation - position, scale and orientation of a scene node.
///
/// The local model matrix is derived lazily: setters only flag it dirty and
/// the matrix is rebuilt on the next access. The world model matrix is
/// written by the scene graph when it propagates a parent's world matrix.
///
/// Look-at tracking: when a look target is set and tracking is enabled,
/// every translation re-orients the transformation toward the target, so a
/// translation followed by a rotation results in two rotations.
///
/// Forward is -Z (right-handed, same convention as `glam::Mat4::look_at_rh`).

use glam::{Mat3, Mat4, Quat, Vec3};

/// Squared length under which a direction is considered degenerate
const DEGENERATE_EPSILON: f32 = 1e-10;

#[derive(Debug, Clone)]
pub struct Transformation {
    position: Vec3,
    scale: Vec3,
    orientation: Quat,
    up_axis: Vec3,
    look_at: Option<Vec3>,
    look_at_enabled: bool,
    local_model_matrix: Mat4,
    world_model_matrix: Mat4,
    local_dirty: bool,
}

impl Transformation {
    /// Identity transformation at the origin.
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            orientation: Quat::IDENTITY,
            up_axis: Vec3::Y,
            look_at: None,
            look_at_enabled: false,
            local_model_matrix: Mat4::IDENTITY,
            world_model_matrix: Mat4::IDENTITY,
            local_dirty: false,
        }
    }

    // ===== POSITION =====

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) -> &mut Self {
        self.position = position;
        self.mark_dirty();
        self.reset_to_look_at_if_enabled();
        self
    }

    pub fn set_x(&mut self, x: f32) -> &mut Self {
        self.set_position(Vec3::new(x, self.position.y, self.position.z))
    }

    pub fn set_y(&mut self, y: f32) -> &mut Self {
        self.set_position(Vec3::new(self.position.x, y, self.position.z))
    }

    pub fn set_z(&mut self, z: f32) -> &mut Self {
        self.set_position(Vec3::new(self.position.x, self.position.y, z))
    }

    /// Move by `delta` in parent space.
    pub fn translate(&mut self, delta: Vec3) -> &mut Self {
        self.set_position(self.position + delta)
    }

    /// Move by `delta` expressed in this transformation's own axes.
    pub fn translate_local(&mut self, delta: Vec3) -> &mut Self {
        self.set_position(self.position + self.orientation * delta)
    }

    // ===== SCALE =====

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vec3) -> &mut Self {
        self.scale = scale;
        self.mark_dirty();
        self
    }

    pub fn set_uniform_scale(&mut self, scale: f32) -> &mut Self {
        self.set_scale(Vec3::splat(scale))
    }

    // ===== ORIENTATION =====

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    /// Replace the orientation. The quaternion is normalized.
    pub fn set_orientation(&mut self, orientation: Quat) -> &mut Self {
        self.orientation = orientation.normalize();
        self.mark_dirty();
        self
    }

    /// Rotate about `axis` (local space) by `angle` radians.
    pub fn rotate(&mut self, axis: Vec3, angle: f32) -> &mut Self {
        if axis.length_squared() < DEGENERATE_EPSILON {
            return self;
        }
        let rotation = Quat::from_axis_angle(axis.normalize(), angle);
        self.set_orientation(self.orientation * rotation)
    }

    /// Unit vector this transformation faces (-Z rotated by the orientation).
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    pub fn up_axis(&self) -> Vec3 {
        self.up_axis
    }

    pub fn set_up_axis(&mut self, up: Vec3) -> &mut Self {
        if up.length_squared() >= DEGENERATE_EPSILON {
            self.up_axis = up.normalize();
            self.reset_to_look_at_if_enabled();
        }
        self
    }

    // ===== LOOK AT =====

    /// Set the look target and enable tracking; re-orients immediately.
    pub fn set_look_at(&mut self, target: Vec3) -> &mut Self {
        self.look_at = Some(target);
        self.look_at_enabled = true;
        self.reset_to_look_at();
        self
    }

    pub fn look_at(&self) -> Option<Vec3> {
        self.look_at
    }

    pub fn is_look_at_enabled(&self) -> bool {
        self.look_at_enabled
    }

    /// Toggle automatic look-at tracking without clearing the target.
    pub fn enable_look_at(&mut self, enabled: bool) -> &mut Self {
        self.look_at_enabled = enabled;
        self.reset_to_look_at_if_enabled();
        self
    }

    /// Orient toward the look target, if one is set and not degenerate.
    pub fn reset_to_look_at(&mut self) -> &mut Self {
        if let Some(target) = self.look_at {
            if let Some(orientation) = orientation_towards(self.position, target, self.up_axis) {
                self.orientation = orientation;
                self.mark_dirty();
            }
        }
        self
    }

    fn reset_to_look_at_if_enabled(&mut self) {
        if self.look_at_enabled {
            self.reset_to_look_at();
        }
    }

    // ===== MATRICES =====

    /// True if a setter ran since the local matrix was last rebuilt.
    pub fn is_dirty(&self) -> bool {
        self.local_dirty
    }

    fn mark_dirty(&mut self) {
        self.local_dirty = true;
    }

    /// Local model matrix (scale, then rotate, then translate), rebuilt if dirty.
    pub fn local_model_matrix(&mut self) -> Mat4 {
        if self.local_dirty {
            self.local_model_matrix = self.compute_local_model_matrix();
            self.local_dirty = false;
        }
        self.local_model_matrix
    }

    /// Local model matrix computed from the current fields, without touching the cache.
    pub fn compute_local_model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation, self.position)
    }

    /// Recompute the world matrix from the parent's world matrix.
    pub fn calculate_world_model_matrix(&mut self, parent_world: &Mat4) -> Mat4 {
        self.world_model_matrix = *parent_world * self.local_model_matrix();
        self.world_model_matrix
    }

    /// World matrix as of the last graph propagation.
    pub fn world_model_matrix(&self) -> &Mat4 {
        &self.world_model_matrix
    }

    /// World-space position as of the last graph propagation.
    pub fn world_position(&self) -> Vec3 {
        self.world_model_matrix.w_axis.truncate()
    }
}

impl Default for Transformation {
    fn default() -> Self {
        Self::new()
    }
}

/// Orientation whose forward (-Z) points from `position` to `target`.
///
/// Returns `None` when the target coincides with the position or the
/// direction is parallel to `up`.
fn orientation_towards(position: Vec3, target: Vec3, up: Vec3) -> Option<Quat> {
    let direction = target - position;
    if direction.length_squared() < DEGENERATE_EPSILON {
        return None;
    }
    let forward = direction.normalize();
    let right = forward.cross(up);
    if right.length_squared() < DEGENERATE_EPSILON {
        return None;
    }
    let right = right.normalize();
    let true_up = right.cross(forward);
    let basis = Mat3::from_cols(right, true_up, -forward);
    Some(Quat::from_mat3(&basis).normalize())
}

#[cfg(test)]
#[path = "transformation_tests.rs"]
mod tests;
