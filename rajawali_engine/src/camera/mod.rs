//! Camera module - passive camera, viewport and frustum.
//!
//! Cameras are plain data owned by the scene that uses them. The scene
//! graph only reads the frustum (culling) and the view matrix (picking).

mod camera;
mod frustum;

pub use camera::{Camera, Viewport};
pub use frustum::{
    Frustum, FrustumTest,
    PLANE_LEFT, PLANE_RIGHT, PLANE_BOTTOM, PLANE_TOP, PLANE_NEAR, PLANE_FAR,
};
