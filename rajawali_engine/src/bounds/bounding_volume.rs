/// Bounding volume attached to a scene node, in the node's local space.
///
/// The scene graph converts every volume to a world-space `Aabb` when it
/// propagates bounds, so queries only ever deal with boxes.

use glam::{Mat4, Vec3};
use super::aabb::Aabb;
use super::bounding_sphere::BoundingSphere;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundingVolume {
    Box(Aabb),
    Sphere(BoundingSphere),
}

impl BoundingVolume {
    /// World-space box enclosing this volume after `world` is applied.
    pub fn world_aabb(&self, world: &Mat4) -> Aabb {
        match self {
            BoundingVolume::Box(aabb) => aabb.transformed(world),
            BoundingVolume::Sphere(sphere) => sphere.transformed(world).to_aabb(),
        }
    }

    pub fn center(&self) -> Vec3 {
        match self {
            BoundingVolume::Box(aabb) => aabb.center(),
            BoundingVolume::Sphere(sphere) => sphere.center,
        }
    }
}

impl From<Aabb> for BoundingVolume {
    fn from(aabb: Aabb) -> Self {
        BoundingVolume::Box(aabb)
    }
}

impl From<BoundingSphere> for BoundingVolume {
    fn from(sphere: BoundingSphere) -> Self {
        BoundingVolume::Sphere(sphere)
    }
}
