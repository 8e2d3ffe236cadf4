/// Renderer module - the GPU device contract and per-object renderers

// Module declarations
pub mod graphics_device;
pub mod headless_device;
pub mod object_renderer;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use headless_device::{DeviceCommand, DeviceCounters, HeadlessDevice};
pub use object_renderer::{
    FrameMatrices, MaterialRenderer, MaterialRendererBuilder, ObjectRenderer,
    RenderPassType, RenderableObject,
};
