use std::sync::Arc;
use glam::{Mat4, Vec3};
use parking_lot::Mutex;
use crate::camera::{Camera, Viewport};
use crate::control::{RenderTaskQueue, RenderThreadBinding, TaskContext};
use crate::error::{Error, Result};
use crate::renderer::{
    ContextInfo, ContextType, GraphicsDevice, HeadlessDevice, MaterialRenderer, RenderPassType,
    RenderableObject,
};
use crate::resource::{Geometry, Material, MaterialDesc, MaterialManager, TextureManager};
use crate::transform::{Transformable, Transformation};
use super::*;

// ============================================================================
// TEST HELPERS
// ============================================================================

struct Fixture {
    scene: Arc<Scene>,
    tasks: Arc<RenderTaskQueue>,
    materials: Arc<MaterialManager>,
    device: HeadlessDevice,
}

impl Fixture {
    fn new() -> Self {
        let binding = Arc::new(RenderThreadBinding::new());
        binding.bind_current();
        let tasks = Arc::new(RenderTaskQueue::new(binding));
        let materials = Arc::new(MaterialManager::new());
        let scene = Arc::new(Scene::new(
            "test",
            front_camera(),
            SceneGraphConfig::default(),
            Arc::clone(&tasks),
            Arc::clone(&materials),
            Arc::new(TextureManager::new()),
        ));
        let mut device = HeadlessDevice::new();
        device.on_context_acquired(gles()).unwrap();
        Self { scene, tasks, materials, device }
    }

    fn drain(&mut self) {
        let mut context = TaskContext { device: &mut self.device, frame: 0 };
        self.tasks.drain(&mut context).unwrap();
    }

    fn render(&mut self) -> Result<FrameStats> {
        self.scene.render(&mut self.device, &FrameInfo::default())
    }

    fn count(&self, name: &str) -> usize {
        self.device.commands().iter().filter(|command| command.as_str() == name).count()
    }
}

fn gles() -> ContextInfo {
    ContextInfo {
        context_type: ContextType::OpenGles,
        major_version: 3,
        minor_version: 0,
    }
}

fn front_camera() -> Camera {
    Camera::perspective(
        Vec3::new(0.0, 0.0, 10.0),
        Vec3::ZERO,
        Vec3::Y,
        std::f32::consts::FRAC_PI_2,
        0.1,
        100.0,
        Viewport::new(100, 100),
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

fn cube_at(position: Vec3, renderer: &Arc<MaterialRenderer>) -> SceneNode {
    let mut transformation = Transformation::new();
    transformation.set_position(position);
    let renderable = RenderableObject::new(Arc::new(Geometry::cube(1.0)))
        .with_renderer(RenderPassType::Color, Arc::clone(renderer) as Arc<dyn ObjectRenderer>);
    SceneNode::new().with_transformation(transformation).with_renderable(renderable)
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<&'static str>>,
    pre_draw_edit: Mutex<Option<Result<()>>>,
}

impl FrameCallback for Recorder {
    fn on_pre_frame(&self, _scene: &Scene, _frame: &FrameInfo) {
        self.events.lock().push("pre_frame");
    }

    fn on_pre_draw(&self, scene: &Scene, _frame: &FrameInfo) {
        self.events.lock().push("pre_draw");
        *self.pre_draw_edit.lock() = Some(scene.graph().clear().map(|_| ()));
    }

    fn on_post_frame(&self, _scene: &Scene, _frame: &FrameInfo) {
        self.events.lock().push("post_frame");
    }
}

// ============================================================================
// Traversal
// ============================================================================

#[test]
fn test_render_draws_visible_objects() {
    let mut fixture = Fixture::new();
    let renderer = MaterialRenderer::builder(material("m")).build();
    fixture.scene.add(cube_at(Vec3::ZERO, &renderer)).unwrap();
    fixture.scene.add(cube_at(Vec3::new(2.0, 0.0, 0.0), &renderer)).unwrap();
    fixture.scene.add(cube_at(Vec3::new(1000.0, 0.0, 0.0), &renderer)).unwrap();

    let stats = fixture.render().unwrap();
    assert_eq!(stats.visible, 2);
    assert_eq!(stats.drawn, 2);
    assert_eq!(stats.renderer_switches, 1);
    assert_eq!(fixture.device.counters().draw_calls, 2);
}

#[test]
fn test_invisible_object_not_drawn() {
    let mut fixture = Fixture::new();
    let renderer = MaterialRenderer::builder(material("m")).build();
    let hidden = fixture.scene.add(cube_at(Vec3::ZERO, &renderer)).unwrap();
    fixture.scene.graph()
        .request_modifications(|data| data.set_visible(hidden.key(), false))
        .unwrap()
        .unwrap();

    let stats = fixture.render().unwrap();
    assert_eq!(stats.drawn, 0);
    let data = fixture.scene.graph().acquire_read_lock().unwrap();
    assert!(data.node(hidden.key()).unwrap().is_in_frustum());
}

#[test]
fn test_object_without_pass_renderer_is_skipped() {
    let mut fixture = Fixture::new();
    let bare = RenderableObject::new(Arc::new(Geometry::cube(1.0)));
    fixture.scene.add(SceneNode::new().with_renderable(bare)).unwrap();

    let stats = fixture.render().unwrap();
    assert_eq!(stats.visible, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.drawn, 0);
}

#[test]
fn test_draws_grouped_by_renderer() {
    let mut fixture = Fixture::new();
    let a = MaterialRenderer::builder(material("a")).build();
    let b = MaterialRenderer::builder(material("b")).build();
    fixture.scene.add(cube_at(Vec3::new(-2.0, 0.0, 0.0), &a)).unwrap();
    fixture.scene.add(cube_at(Vec3::ZERO, &b)).unwrap();
    fixture.scene.add(cube_at(Vec3::new(2.0, 0.0, 0.0), &a)).unwrap();

    let stats = fixture.render().unwrap();
    assert_eq!(stats.drawn, 3);
    assert_eq!(stats.renderer_switches, 2);
    assert_eq!(fixture.count("bind_program"), 2);
}

#[test]
fn test_world_matrix_reaches_device() {
    let mut fixture = Fixture::new();
    let renderer = MaterialRenderer::builder(material("m")).build();
    let node = fixture.scene.add(cube_at(Vec3::ZERO, &renderer)).unwrap();
    node.request_transformations(|t: &mut Transformation| {
        t.set_position(Vec3::new(1.0, 2.0, 0.0));
    }).unwrap();

    fixture.render().unwrap();
    let data = fixture.scene.graph().acquire_read_lock().unwrap();
    let world = *data.node(node.key()).unwrap().transformation().world_model_matrix();
    assert_eq!(world, Mat4::from_translation(Vec3::new(1.0, 2.0, 0.0)));
}

// ============================================================================
// Camera and callbacks
// ============================================================================

#[test]
fn test_switch_camera_applies_at_next_frame() {
    let mut fixture = Fixture::new();
    let renderer = MaterialRenderer::builder(material("m")).build();
    fixture.scene.add(cube_at(Vec3::ZERO, &renderer)).unwrap();

    let away = Camera::perspective(
        Vec3::new(0.0, 0.0, 10.0),
        Vec3::new(0.0, 0.0, 20.0),
        Vec3::Y,
        std::f32::consts::FRAC_PI_2,
        0.1,
        100.0,
        Viewport::new(100, 100),
    );
    fixture.scene.switch_camera(away.clone());
    assert!(fixture.scene.has_pending_camera());
    assert_ne!(fixture.scene.camera().view_matrix(), away.view_matrix());

    let stats = fixture.render().unwrap();
    assert_eq!(stats.drawn, 0);
    assert!(!fixture.scene.has_pending_camera());
    assert_eq!(fixture.scene.camera().view_matrix(), away.view_matrix());
}

#[test]
fn test_frame_callbacks_order_and_pre_draw_is_read_only() {
    let mut fixture = Fixture::new();
    let recorder = Arc::new(Recorder::default());
    fixture.scene.register_frame_callback(Arc::clone(&recorder) as Arc<dyn FrameCallback>);

    fixture.render().unwrap();

    assert_eq!(*recorder.events.lock(), vec!["pre_frame", "pre_draw", "post_frame"]);
    assert!(matches!(*recorder.pre_draw_edit.lock(), Some(Err(Error::LockReentry(_)))));
}

#[test]
fn test_unregister_frame_callback() {
    let mut fixture = Fixture::new();
    let recorder: Arc<dyn FrameCallback> = Arc::new(Recorder::default());
    fixture.scene.register_frame_callback(Arc::clone(&recorder));
    assert!(fixture.scene.unregister_frame_callback(&recorder));
    assert!(!fixture.scene.unregister_frame_callback(&recorder));
    fixture.render().unwrap();
}

// ============================================================================
// Deferred edits
// ============================================================================

#[test]
fn test_queued_modifications_run_at_drain() {
    let mut fixture = Fixture::new();
    let detached = fixture.scene.graph().create_node(SceneNode::new()).unwrap();

    let attach = fixture.scene.queue_attach(detached, None);
    assert!(!fixture.scene.graph().contains(detached).unwrap());

    fixture.drain();
    assert_eq!(attach.wait(), Ok(()));
    assert!(fixture.scene.graph().contains(detached).unwrap());

    let remove = fixture.scene.queue_remove(detached);
    fixture.drain();
    assert_eq!(remove.wait(), Ok(()));
    assert!(!fixture.scene.graph().contains(detached).unwrap());
}

#[test]
fn test_queued_modification_failure_reaches_handle() {
    let mut fixture = Fixture::new();
    let a = fixture.scene.add(SceneNode::new()).unwrap();

    let handle = fixture.scene.queue_modifications(move |data| data.add(a.key()));
    fixture.drain();
    assert!(matches!(handle.wait(), Err(Error::TaskFailed(_))));
}

#[test]
fn test_queue_reparent() {
    let mut fixture = Fixture::new();
    let parent = fixture.scene.add(SceneNode::new()).unwrap();
    let child = fixture.scene.add(SceneNode::new()).unwrap();

    let handle = fixture.scene.queue_reparent(child.key(), parent.key());
    fixture.drain();
    handle.wait().unwrap();

    let data = fixture.scene.graph().acquire_read_lock().unwrap();
    assert_eq!(data.node(child.key()).unwrap().parent(), Some(parent.key()));
}

#[test]
fn test_add_child_failure_leaves_no_orphan() {
    let fixture = Fixture::new();
    let detached_parent = fixture.scene.graph().create_node(SceneNode::new()).unwrap();
    fixture.scene.graph().destroy(detached_parent).unwrap();

    assert!(fixture.scene.add_child(detached_parent, SceneNode::new()).is_err());
    let data = fixture.scene.graph().acquire_read_lock().unwrap();
    assert!(data.is_empty());
}

// ============================================================================
// Resources
// ============================================================================

#[test]
fn test_add_material_goes_through_queue() {
    let mut fixture = Fixture::new();
    let handle = fixture.scene.add_material(material("brick"));
    assert!(!fixture.materials.contains("brick"));

    fixture.drain();
    handle.wait().unwrap();
    assert!(fixture.materials.contains("brick"));

    let handle = fixture.scene.remove_material("brick");
    fixture.drain();
    handle.wait().unwrap();
    assert!(!fixture.materials.contains("brick"));
}

#[test]
fn test_restore_after_context_change() {
    let mut fixture = Fixture::new();
    let handle = fixture.scene.add_material(material("brick"));
    fixture.drain();
    handle.wait().unwrap();

    fixture.device.on_context_lost();
    fixture.device.on_context_acquired(gles()).unwrap();
    fixture.scene.mark_needs_restore();

    fixture.render().unwrap();
    assert!(!fixture.scene.needs_restore());
    assert_eq!(fixture.device.counters().programs_created, 2);
}

#[test]
fn test_failed_restore_is_retried() {
    let mut fixture = Fixture::new();
    let handle = fixture.scene.add_material(material("brick"));
    fixture.drain();
    handle.wait().unwrap();

    fixture.device.on_context_lost();
    fixture.scene.mark_needs_restore();
    assert!(fixture.scene.restore_for_new_context_if_needed(&mut fixture.device).is_err());
    assert!(fixture.scene.needs_restore());

    fixture.device.on_context_acquired(gles()).unwrap();
    assert_eq!(fixture.scene.restore_for_new_context_if_needed(&mut fixture.device), Ok(true));
    assert!(!fixture.scene.needs_restore());
    assert_eq!(fixture.device.counters().programs_created, 2);
}
