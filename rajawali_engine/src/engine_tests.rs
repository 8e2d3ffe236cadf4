//! Unit tests for the Engine context object
//!
//! Tests that swap the global logger are marked #[serial].

use std::sync::Arc;
use std::time::Duration;
use glam::Vec3;
use parking_lot::Mutex;
use serial_test::serial;
use crate::camera::Viewport;
use crate::error::Error;
use crate::log::{self as engine_log, LogEntry, Logger};
use crate::renderer::{
    ContextType, HeadlessDevice, MaterialRenderer, ObjectRenderer, RenderPassType, RenderableObject,
};
use crate::resource::{Geometry, Material, MaterialDesc};
use crate::scene::SceneNode;
use super::*;

// ============================================================================
// TEST HELPERS
// ============================================================================

const WAIT: Duration = Duration::from_secs(5);

/// Test logger that captures log messages for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().push(entry.message.clone());
    }
}

fn engine() -> (Engine, HeadlessDevice) {
    let device = HeadlessDevice::new();
    let probe = device.clone();
    let config = EngineConfig {
        render_control: RenderControlConfig { frame_rate: 0.0, ..RenderControlConfig::default() },
        ..EngineConfig::default()
    };
    (Engine::new(Box::new(device), config), probe)
}

fn camera() -> Camera {
    Camera::perspective(
        Vec3::new(0.0, 0.0, 10.0),
        Vec3::ZERO,
        Vec3::Y,
        std::f32::consts::FRAC_PI_2,
        0.1,
        100.0,
        Viewport::new(640, 480),
    )
}

fn material(name: &str) -> Arc<Material> {
    Arc::new(Material::from_desc(MaterialDesc {
        name: name.to_string(),
        vertex_shader: "vs".to_string(),
        fragment_shader: "fs".to_string(),
        textures: Vec::new(),
    }).unwrap())
}

fn bring_up(engine: &Engine) {
    engine.start().unwrap();
    engine.send_event(SurfaceEvent::ContextAcquired {
        context_type: ContextType::OpenGles,
        major_version: 3,
        minor_version: 0,
    }).unwrap();
    engine.send_event(SurfaceEvent::SizeChanged { width: 640, height: 480 }).unwrap();
}

// ============================================================================
// SCENE TESTS
// ============================================================================

#[test]
fn test_scenes_share_engine_managers() {
    let (engine, _probe) = engine();
    let first = engine.create_scene("first", camera());
    let second = engine.create_scene("second", camera());
    let shared = material("shared");

    let a = first.add_material(Arc::clone(&shared));
    let b = second.add_material(Arc::clone(&shared));
    bring_up(&engine);
    engine.request_render().unwrap();

    a.wait_timeout(WAIT).unwrap();
    b.wait_timeout(WAIT).unwrap();
    assert_eq!(engine.material_manager().reference_count("shared"), 2);
    engine.shutdown().unwrap();
}

#[test]
fn test_end_to_end_frame() {
    let (engine, probe) = engine();
    let scene = engine.create_scene("main", camera());
    let renderer = MaterialRenderer::builder(material("flat")).build();
    let renderable = RenderableObject::new(Arc::new(Geometry::cube(1.0)))
        .with_renderer(RenderPassType::Color, renderer as Arc<dyn ObjectRenderer>);
    scene.add(SceneNode::new().with_renderable(renderable)).unwrap();

    let added = engine.add_scene(&scene);
    bring_up(&engine);
    engine.request_render().unwrap();
    added.wait_timeout(WAIT).unwrap();

    // A second request is ordered after the first frame completed.
    let marker = engine.control().submit_awaitable(crate::control::RenderTask::new(
        crate::control::TaskKind::Custom,
        |_| Ok(()),
    ));
    engine.request_render().unwrap();
    marker.wait_timeout(WAIT).unwrap();

    assert!(probe.counters().draw_calls >= 1);
    engine.shutdown().unwrap();
    assert_eq!(engine.control().state(), RenderState::Destroyed);
}

// ============================================================================
// LIFECYCLE TESTS
// ============================================================================

#[test]
fn test_start_twice_fails() {
    let (engine, _probe) = engine();
    engine.start().unwrap();
    assert!(engine.is_started());
    assert!(matches!(engine.start(), Err(Error::InvalidState(_))));
    engine.shutdown().unwrap();
    assert!(!engine.is_started());
}

#[test]
fn test_send_event_before_start_fails() {
    let (engine, _probe) = engine();
    assert!(matches!(engine.request_render(), Err(Error::InvalidState(_))));
}

#[test]
fn test_shutdown_without_start_destroys_control() {
    let (engine, _probe) = engine();
    let pending = engine.add_scene(&engine.create_scene("main", camera()));

    engine.shutdown().unwrap();
    assert_eq!(engine.control().state(), RenderState::Destroyed);
    assert_eq!(pending.wait(), Err(Error::TaskDiscarded));
}

#[test]
fn test_shutdown_idempotent_and_final() {
    let (engine, _probe) = engine();
    engine.start().unwrap();
    engine.shutdown().unwrap();
    engine.shutdown().unwrap();
    assert!(matches!(engine.start(), Err(Error::InvalidState(_))));
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_lifecycle_is_logged() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    engine_log::set_logger(TestLogger { entries: Arc::clone(&entries) });

    let (engine, _probe) = engine();
    engine.start().unwrap();
    engine.shutdown().unwrap();
    engine_log::reset_logger();

    let entries = entries.lock();
    assert!(entries.iter().any(|message| message.contains("Render thread 'rajawali-render' started")));
    assert!(entries.iter().any(|message| message == "Engine shut down"));
}
