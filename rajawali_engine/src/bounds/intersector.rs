/// Ray intersection tests against boxes, spheres, planes and triangles.
///
/// Every test returns the ray parameter `t` of the hit (distance along the
/// normalized direction, `t >= 0`), or `None`. Near-parallel denominators
/// below `INTERSECT_EPSILON` count as "no intersection" rather than
/// producing infinities or NaN.

use glam::{Vec3, Vec4};
use super::aabb::Aabb;

/// Tolerance for degenerate denominators
pub const INTERSECT_EPSILON: f32 = 1e-5;

/// Half-line with a normalized direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// The direction is normalized; a zero direction stays zero and only
    /// hits volumes containing the origin.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction: direction.normalize_or_zero() }
    }

    /// Ray starting at `start` and pointing through `end`.
    ///
    /// Returns `None` when the two points coincide.
    pub fn from_points(start: Vec3, end: Vec3) -> Option<Self> {
        let direction = end - start;
        if direction.length_squared() < INTERSECT_EPSILON * INTERSECT_EPSILON {
            return None;
        }
        Some(Self { origin: start, direction: direction.normalize() })
    }

    /// Point at parameter `t`.
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Slab test. An origin inside (or on) the box hits at `t = 0`.
pub fn intersect_ray_aabb(ray: &Ray, aabb: &Aabb) -> Option<f32> {
    if aabb.contains_point(ray.origin) {
        return Some(0.0);
    }

    let mut t_near = 0.0_f32;
    let mut t_far = f32::INFINITY;

    for axis in 0..3 {
        let origin = ray.origin[axis];
        let direction = ray.direction[axis];
        let (min, max) = (aabb.min[axis], aabb.max[axis]);

        if direction.abs() < INTERSECT_EPSILON {
            // Parallel to this slab: must already be between its planes
            if origin < min || origin > max {
                return None;
            }
            continue;
        }

        let inv = 1.0 / direction;
        let mut t1 = (min - origin) * inv;
        let mut t2 = (max - origin) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }

        t_near = t_near.max(t1);
        t_far = t_far.min(t2);
        if t_near > t_far {
            return None;
        }
    }

    Some(t_near)
}

/// Ray/sphere quadratic; returns the nearest non-negative root.
///
/// From inside the sphere that is the exit point.
pub fn intersect_ray_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    let a = ray.direction.length_squared();
    if a < INTERSECT_EPSILON {
        return None;
    }
    let b = oc.dot(ray.direction);
    let c = oc.length_squared() - radius * radius;
    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let t0 = (-b - root) / a;
    let t1 = (-b + root) / a;
    if t0 >= 0.0 {
        Some(t0)
    } else if t1 >= 0.0 {
        Some(t1)
    } else {
        None
    }
}

/// Plane given as (A, B, C, D) with `Ax + By + Cz + D = 0`.
pub fn intersect_ray_plane(ray: &Ray, plane: Vec4) -> Option<f32> {
    let normal = plane.truncate();
    let denominator = normal.dot(ray.direction);
    if denominator.abs() < INTERSECT_EPSILON {
        return None;
    }
    let t = -(normal.dot(ray.origin) + plane.w) / denominator;
    if t >= 0.0 { Some(t) } else { None }
}

/// Moller-Trumbore ray/triangle test (both faces).
pub fn intersect_ray_triangle(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let p = ray.direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < INTERSECT_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    let s = ray.origin - v0;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(q) * inv_det;
    if t >= 0.0 { Some(t) } else { None }
}

#[cfg(test)]
#[path = "intersector_tests.rs"]
mod tests;
