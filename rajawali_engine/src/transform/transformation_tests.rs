use glam::{Mat4, Quat, Vec3};
use super::*;

const EPS: f32 = 1e-5;

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_new_is_identity() {
    let mut t = Transformation::new();
    assert_eq!(t.position(), Vec3::ZERO);
    assert_eq!(t.scale(), Vec3::ONE);
    assert_eq!(t.orientation(), Quat::IDENTITY);
    assert!(!t.is_dirty());
    assert_eq!(t.local_model_matrix(), Mat4::IDENTITY);
    assert_eq!(*t.world_model_matrix(), Mat4::IDENTITY);
}

// ============================================================================
// Dirty flag / lazy local matrix
// ============================================================================

#[test]
fn test_setter_marks_dirty_and_access_clears() {
    let mut t = Transformation::new();
    t.set_position(Vec3::new(1.0, 2.0, 3.0));
    assert!(t.is_dirty());

    let m = t.local_model_matrix();
    assert!(!t.is_dirty());
    assert!(m.w_axis.truncate().abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), EPS));
}

#[test]
fn test_local_matrix_composes_scale_rotation_translation() {
    let mut t = Transformation::new();
    t.set_scale(Vec3::splat(2.0))
        .set_orientation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2))
        .set_position(Vec3::new(0.0, 0.0, -10.0));

    // +X scaled by 2, rotated 90° about Y → -Z * 2, then translated
    let p = t.local_model_matrix().transform_point3(Vec3::X);
    assert!(p.abs_diff_eq(Vec3::new(0.0, 0.0, -12.0), EPS), "got {:?}", p);
}

#[test]
fn test_set_components() {
    let mut t = Transformation::new();
    t.set_x(1.0).set_y(2.0).set_z(3.0);
    assert_eq!(t.position(), Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn test_translate_local_follows_orientation() {
    let mut t = Transformation::new();
    t.set_orientation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
    t.translate_local(Vec3::NEG_Z);
    // Facing -X after a 90° yaw
    assert!(t.position().abs_diff_eq(Vec3::NEG_X, EPS), "got {:?}", t.position());
}

#[test]
fn test_rotate_with_zero_axis_is_ignored() {
    let mut t = Transformation::new();
    t.rotate(Vec3::ZERO, 1.0);
    assert_eq!(t.orientation(), Quat::IDENTITY);
    assert!(!t.is_dirty());
}

// ============================================================================
// World matrix
// ============================================================================

#[test]
fn test_world_matrix_applies_parent() {
    let mut t = Transformation::new();
    t.set_position(Vec3::new(1.0, 0.0, 0.0));
    let parent = Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0));

    t.calculate_world_model_matrix(&parent);
    assert!(t.world_position().abs_diff_eq(Vec3::new(1.0, 5.0, 0.0), EPS));
}

// ============================================================================
// Look-at tracking
// ============================================================================

#[test]
fn test_set_look_at_points_forward_at_target() {
    let mut t = Transformation::new();
    t.set_position(Vec3::new(0.0, 0.0, 5.0));
    t.set_look_at(Vec3::ZERO);

    assert!(t.is_look_at_enabled());
    assert!(t.forward().abs_diff_eq(Vec3::NEG_Z, EPS), "got {:?}", t.forward());
}

#[test]
fn test_translation_reorients_when_tracking() {
    let mut t = Transformation::new();
    t.set_look_at(Vec3::ZERO);
    t.set_position(Vec3::new(5.0, 0.0, 0.0));

    assert!(t.forward().abs_diff_eq(Vec3::NEG_X, EPS), "got {:?}", t.forward());
}

#[test]
fn test_disabled_tracking_keeps_orientation() {
    let mut t = Transformation::new();
    t.set_position(Vec3::new(0.0, 0.0, 5.0));
    t.set_look_at(Vec3::ZERO);
    t.enable_look_at(false);
    let before = t.orientation();

    t.set_position(Vec3::new(5.0, 0.0, 0.0));
    assert_eq!(t.orientation(), before);
    assert_eq!(t.look_at(), Some(Vec3::ZERO));
}

#[test]
fn test_degenerate_look_at_keeps_orientation() {
    let mut t = Transformation::new();
    // Target equals position
    t.set_look_at(Vec3::ZERO);
    assert_eq!(t.orientation(), Quat::IDENTITY);

    // Direction parallel to the up axis
    t.set_look_at(Vec3::new(0.0, 10.0, 0.0));
    assert_eq!(t.orientation(), Quat::IDENTITY);
}
