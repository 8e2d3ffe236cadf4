/// Axis-aligned bounding box and the min/max bounds combinators.
///
/// Boxes are stored as min/max corners. A box produced by any constructor or
/// combinator in this module satisfies `min <= max` component-wise.

use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner (x, y, z)
    pub min: Vec3,
    /// Maximum corner (x, y, z)
    pub max: Vec3,
}

impl Aabb {
    /// Build a box from two arbitrary corners (order does not matter).
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    /// Box centered on `center` with the given half extents.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        let half = half_extents.abs();
        Self { min: center - half, max: center + half }
    }

    /// Smallest box containing every point. `None` for an empty slice.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut min = *first;
        let mut max = *first;
        for point in rest {
            check_and_adjust_min_bounds(&mut min, *point);
            check_and_adjust_max_bounds(&mut max, *point);
        }
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Transform by a matrix, returning the enclosing world box.
    ///
    /// Uses the Arvo method: projects each matrix axis onto the box extents
    /// for a tight result without transforming all 8 corners.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        let translation = matrix.col(3).truncate();
        let mut new_min = translation;
        let mut new_max = translation;

        for i in 0..3 {
            let axis = matrix.col(i).truncate();
            let a = axis * self.min[i];
            let b = axis * self.max[i];
            new_min += a.min(b);
            new_max += a.max(b);
        }

        Aabb { min: new_min, max: new_max }
    }

    /// Widen this box so it also encloses `other`.
    pub fn merge(&mut self, other: &Aabb) {
        check_and_adjust_min_bounds(&mut self.min, other.min);
        check_and_adjust_max_bounds(&mut self.max, other.max);
    }

    /// Union of two boxes.
    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut merged = *self;
        merged.merge(other);
        merged
    }

    /// True if `other` lies entirely within `self`.
    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x && self.max.x >= other.max.x
        && self.min.y <= other.min.y && self.max.y >= other.max.y
        && self.min.z <= other.min.z && self.max.z >= other.max.z
    }

    /// True if the point lies inside or on the box.
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// True if the two boxes overlap or touch.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x
        && self.min.y <= other.max.y && self.max.y >= other.min.y
        && self.min.z <= other.max.z && self.max.z >= other.min.z
    }
}

/// Lower `current` to the component-wise minimum of itself and `candidate`.
///
/// Idempotent: a second call with the same candidate changes nothing.
pub fn check_and_adjust_min_bounds(current: &mut Vec3, candidate: Vec3) {
    if candidate.x < current.x { current.x = candidate.x; }
    if candidate.y < current.y { current.y = candidate.y; }
    if candidate.z < current.z { current.z = candidate.z; }
}

/// Raise `current` to the component-wise maximum of itself and `candidate`.
pub fn check_and_adjust_max_bounds(current: &mut Vec3, candidate: Vec3) {
    if candidate.x > current.x { current.x = candidate.x; }
    if candidate.y > current.y { current.y = candidate.y; }
    if candidate.z > current.z { current.z = candidate.z; }
}

#[cfg(test)]
#[path = "aabb_tests.rs"]
mod tests;
