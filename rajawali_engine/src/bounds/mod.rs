//! Bounds module - bounding volumes and ray intersection.

mod aabb;
mod bounding_sphere;
mod bounding_volume;
pub mod intersector;

pub use aabb::{Aabb, check_and_adjust_min_bounds, check_and_adjust_max_bounds};
pub use bounding_sphere::BoundingSphere;
pub use bounding_volume::BoundingVolume;
pub use intersector::{Ray, INTERSECT_EPSILON};
