//! Scene management module
//!
//! Provides the locked scene graph, its nodes, and the scene that renders
//! it once per frame on the render thread.

mod graph_data;
mod scene;
mod scene_graph;
mod scene_lock;
mod scene_node;

pub use graph_data::{GraphData, RayHit};
pub use scene::{FrameCallback, FrameInfo, FrameStats, Scene};
pub use scene_graph::{NodeHandle, SceneGraph, SceneGraphConfig};
pub use scene_lock::{HoldKind, SceneLock, SceneReadGuard, SceneWriteGuard};
pub use scene_node::{NodeFlags, NodeKey, SceneNode};
