/// Tests for Geometry
///
/// Uses HeadlessDevice to check lazy buffer creation and re-upload after a
/// context loss.

use glam::Vec3;
use crate::error::Error;
use crate::renderer::{ContextInfo, ContextType, GraphicsDevice, HeadlessDevice};
use super::*;

// ============================================================================
// Helper Functions
// ============================================================================

fn acquired_device() -> HeadlessDevice {
    let mut device = HeadlessDevice::new();
    device.on_context_acquired(ContextInfo {
        context_type: ContextType::Headless,
        major_version: 1,
        minor_version: 0,
    }).unwrap();
    device
}

// ============================================================================
// Creation
// ============================================================================

#[test]
fn test_cube_bounds() {
    let cube = Geometry::cube(2.0);
    let aabb = cube.bounding_box().unwrap();
    assert_eq!(aabb.min, Vec3::splat(-2.0));
    assert_eq!(aabb.max, Vec3::splat(2.0));
    assert_eq!(cube.triangle_count(), 12);
    assert!(cube.bounding_sphere().unwrap().radius >= 2.0 * 3f32.sqrt() - 1e-4);
}

#[test]
fn test_rejects_partial_triangle() {
    let result = Geometry::new("bad", vec![Vec3::ZERO; 3], vec![0, 1]);
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[test]
fn test_rejects_out_of_range_index() {
    let result = Geometry::new("bad", vec![Vec3::ZERO; 3], vec![0, 1, 3]);
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[test]
fn test_empty_geometry_has_no_bounds() {
    let empty = Geometry::new("empty", Vec::new(), Vec::new()).unwrap();
    assert!(empty.bounding_box().is_none());
    assert!(empty.bounding_sphere().is_none());
}

// ============================================================================
// GPU buffers
// ============================================================================

#[test]
fn test_buffers_uploaded_once() {
    let mut device = acquired_device();
    let cube = Geometry::cube(1.0);

    let first = cube.ensure_buffers(&mut device).unwrap();
    let second = cube.ensure_buffers(&mut device).unwrap();
    assert_eq!(first, second);
    assert_eq!(device.counters().buffers_uploaded, 2);
}

#[test]
fn test_buffers_reuploaded_after_context_loss() {
    let mut device = acquired_device();
    let cube = Geometry::cube(1.0);
    let before = cube.ensure_buffers(&mut device).unwrap();

    device.on_context_lost();
    device.on_context_acquired(ContextInfo {
        context_type: ContextType::Headless,
        major_version: 1,
        minor_version: 0,
    }).unwrap();

    let after = cube.ensure_buffers(&mut device).unwrap();
    assert_ne!(before, after);
    assert_eq!(after.vertices.generation, 2);
    assert_eq!(device.counters().buffers_uploaded, 4);
}

#[test]
fn test_release_buffers() {
    let mut device = acquired_device();
    let cube = Geometry::cube(1.0);
    cube.ensure_buffers(&mut device).unwrap();

    cube.release_buffers(&mut device).unwrap();
    assert!(cube.buffers().is_none());
    assert_eq!(device.live_objects(), 0);
}
