//! Resource module
//!
//! GPU-backed resources and the reference-counted managers that register
//! them through render tasks.

mod geometry;
mod material;
mod resource_manager;
mod texture;

pub use geometry::{Geometry, GeometryBuffers};
pub use material::{Material, MaterialDesc};
pub use resource_manager::{GpuResource, MaterialManager, ResourceManager, TextureManager};
pub use texture::{Texture, TextureDesc};
