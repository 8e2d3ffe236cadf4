/// Bounding sphere: center + radius.

use glam::{Mat4, Vec3};
use super::aabb::Aabb;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Negative radii are clamped to zero.
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius: radius.max(0.0) }
    }

    /// Sphere centered on the points' box center, enclosing every point.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let aabb = Aabb::from_points(points)?;
        let center = aabb.center();
        let radius = points
            .iter()
            .map(|p| p.distance_squared(center))
            .fold(0.0_f32, f32::max)
            .sqrt();
        Some(Self { center, radius })
    }

    /// Transform by a matrix. The radius scales by the largest axis scale.
    pub fn transformed(&self, matrix: &Mat4) -> BoundingSphere {
        let max_scale = matrix.x_axis.truncate().length()
            .max(matrix.y_axis.truncate().length())
            .max(matrix.z_axis.truncate().length());
        BoundingSphere {
            center: matrix.transform_point3(self.center),
            radius: self.radius * max_scale,
        }
    }

    /// Enclosing box.
    pub fn to_aabb(&self) -> Aabb {
        Aabb::from_center_half_extents(self.center, Vec3::splat(self.radius))
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.distance_squared(self.center) <= self.radius * self.radius
    }

    pub fn intersects(&self, other: &BoundingSphere) -> bool {
        let reach = self.radius + other.radius;
        self.center.distance_squared(other.center) <= reach * reach
    }
}

#[cfg(test)]
#[path = "bounding_sphere_tests.rs"]
mod tests;
