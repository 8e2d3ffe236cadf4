use glam::{Mat4, Vec3};
use crate::bounds::Aabb;
use super::*;

fn create_test_camera() -> Camera {
    Camera::perspective(
        Vec3::new(0.0, 0.0, 5.0),
        Vec3::ZERO,
        Vec3::Y,
        std::f32::consts::FRAC_PI_4,
        0.1,
        100.0,
        Viewport::new(1920, 1080),
    )
}

// ============================================================================
// Viewport
// ============================================================================

#[test]
fn test_viewport_aspect_ratio() {
    assert!((Viewport::new(1920, 1080).aspect_ratio() - 16.0 / 9.0).abs() < 1e-6);
    assert_eq!(Viewport::new(100, 0).aspect_ratio(), 1.0);
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_camera_new_extracts_frustum() {
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    let proj = Mat4::perspective_rh_gl(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 0.1, 100.0);

    let camera = Camera::new(view, proj, Viewport::new(1920, 1080));

    assert_eq!(*camera.view_matrix(), view);
    assert_eq!(*camera.projection_matrix(), proj);
    assert_eq!(camera.viewport().width, 1920);
    assert_eq!(*camera.frustum(), Frustum::from_view_projection(&(proj * view)));
}

#[test]
fn test_view_projection_matrix() {
    let camera = create_test_camera();
    assert_eq!(
        camera.view_projection_matrix(),
        *camera.projection_matrix() * *camera.view_matrix()
    );
}

#[test]
fn test_position_from_view() {
    let camera = create_test_camera();
    assert!(camera.position().abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-4));
}

#[test]
fn test_view_space_depth() {
    let camera = create_test_camera();
    assert!((camera.view_space_depth(Vec3::ZERO) - 5.0).abs() < 1e-4);
    assert!((camera.view_space_depth(Vec3::new(3.0, 1.0, -2.0)) - 7.0).abs() < 1e-4);
    assert!(camera.view_space_depth(Vec3::new(0.0, 0.0, 10.0)) < 0.0);
}

// ============================================================================
// Setters
// ============================================================================

#[test]
fn test_set_view_updates_frustum() {
    let mut camera = create_test_camera();
    let origin_box = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE);
    assert!(camera.frustum().intersects_aabb(&origin_box));

    // Turn around: the origin is now behind the camera
    camera.set_view(Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 10.0), Vec3::Y));
    assert!(!camera.frustum().intersects_aabb(&origin_box));
}

#[test]
fn test_set_viewport() {
    let mut camera = create_test_camera();
    camera.set_viewport(Viewport::new(640, 480));
    assert_eq!(*camera.viewport(), Viewport::new(640, 480));
}
