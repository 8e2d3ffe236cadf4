#![allow(dead_code)]
//! Shared helpers for integration tests
//!
//! Everything runs against `HeadlessDevice`, so no GPU is required.

use std::sync::Arc;
use std::time::Duration;
use rajawali_engine::glam::Vec3;
use rajawali_engine::rajawali::camera::{Camera, Viewport};
use rajawali_engine::rajawali::render::{
    ContextType, HeadlessDevice, MaterialRenderer, ObjectRenderer, RenderPassType, RenderableObject,
};
use rajawali_engine::rajawali::resource::{Geometry, Material, MaterialDesc};
use rajawali_engine::rajawali::scene::SceneNode;
use rajawali_engine::rajawali::transform::Transformation;
use rajawali_engine::rajawali::{
    Engine, EngineConfig, RenderControlConfig, RenderTask, SurfaceEvent, TaskKind,
};

pub const WAIT: Duration = Duration::from_secs(5);

/// Engine rendering on demand only, plus a probe on its device
pub fn headless_engine() -> (Engine, HeadlessDevice) {
    let device = HeadlessDevice::new();
    let probe = device.clone();
    let config = EngineConfig {
        render_control: RenderControlConfig { frame_rate: 0.0, ..RenderControlConfig::default() },
        ..EngineConfig::default()
    };
    (Engine::new(Box::new(device), config), probe)
}

/// Start the render thread and bring the surface up.
pub fn bring_up(engine: &Engine) {
    engine.start().unwrap();
    acquire_context(engine);
}

pub fn acquire_context(engine: &Engine) {
    engine.send_event(SurfaceEvent::ContextAcquired {
        context_type: ContextType::OpenGles,
        major_version: 3,
        minor_version: 0,
    }).unwrap();
    engine.send_event(SurfaceEvent::SizeChanged { width: 640, height: 480 }).unwrap();
}

/// Render one frame and return once it has fully completed.
///
/// The marker task drains at the start of the second frame, which only
/// begins after the first one finished.
pub fn render_and_settle(engine: &Engine) {
    engine.request_render().unwrap();
    let marker = engine.control().submit_awaitable(RenderTask::new(TaskKind::Custom, |_| Ok(())));
    engine.request_render().unwrap();
    marker.wait_timeout(WAIT).unwrap();
}

pub fn front_camera() -> Camera {
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

pub fn flat_material(name: &str) -> Arc<Material> {
    Arc::new(Material::from_desc(MaterialDesc {
        name: name.to_string(),
        vertex_shader: "void main() {}".to_string(),
        fragment_shader: "void main() {}".to_string(),
        textures: Vec::new(),
    }).unwrap())
}

pub fn drawable_cube(position: Vec3, renderer: &Arc<MaterialRenderer>) -> SceneNode {
    let mut transformation = Transformation::new();
    transformation.set_position(position);
    let renderable = RenderableObject::new(Arc::new(Geometry::cube(1.0)))
        .with_renderer(RenderPassType::Color, Arc::clone(renderer) as Arc<dyn ObjectRenderer>);
    SceneNode::new().with_transformation(transformation).with_renderable(renderable)
}
