/// HeadlessDevice - GraphicsDevice without a GPU
///
/// Records every command it receives and counts uploads and draws, so the
/// render lifecycle can be exercised and inspected in tests. Clones share
/// the same recording: keep one clone as a probe and hand the other to the
/// render control.

use std::sync::Arc;
use glam::{Mat4, Vec4};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use crate::camera::Viewport;
use crate::error::{Error, Result};
use super::graphics_device::{
    BufferKind, ContextInfo, GpuHandle, GraphicsDevice, RenderStateDesc, TextureFormat,
};

// ============================================================================
// Recorded commands
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    ContextAcquired(ContextInfo),
    ContextLost,
    CreateProgram(GpuHandle),
    UploadBuffer(BufferKind, GpuHandle, usize),
    UploadTexture(GpuHandle, u32, u32),
    Destroy(GpuHandle),
    BindProgram(GpuHandle),
    BindBuffer(BufferKind, GpuHandle),
    BindTexture(u32, GpuHandle),
    SetUniform(String),
    ApplyRenderState(RenderStateDesc),
    SetViewport(Viewport),
    Clear,
    DrawIndexed(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectKind {
    Program,
    Buffer,
    Texture,
}

/// Counters since creation, across context generations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceCounters {
    pub programs_created: u32,
    pub buffers_uploaded: u32,
    pub textures_uploaded: u32,
    pub objects_destroyed: u32,
    pub draw_calls: u32,
    pub state_changes: u32,
}

#[derive(Debug, Default)]
struct HeadlessState {
    context: Option<ContextInfo>,
    generation: u32,
    next_id: u32,
    live: FxHashMap<u32, ObjectKind>,
    commands: Vec<String>,
    log: Vec<DeviceCommand>,
    counters: DeviceCounters,
}

impl HeadlessState {
    fn record(&mut self, command: DeviceCommand) {
        self.commands.push(command_name(&command).to_string());
        self.log.push(command);
    }

    fn require_context(&self, operation: &str) -> Result<()> {
        if self.context.is_none() {
            return Err(Error::BackendError(format!("{}: no render context", operation)));
        }
        Ok(())
    }

    fn check_handle(&self, handle: GpuHandle, expected: ObjectKind) -> Result<()> {
        match self.live.get(&handle.id) {
            Some(kind) if handle.generation == self.generation && *kind == expected => Ok(()),
            _ => Err(Error::InvalidHandle(format!(
                "{} is not a live {:?} of generation {}",
                handle, expected, self.generation
            ))),
        }
    }

    fn allocate(&mut self, kind: ObjectKind) -> GpuHandle {
        self.next_id += 1;
        self.live.insert(self.next_id, kind);
        GpuHandle { id: self.next_id, generation: self.generation }
    }
}

fn command_name(command: &DeviceCommand) -> &'static str {
    match command {
        DeviceCommand::ContextAcquired(_) => "context_acquired",
        DeviceCommand::ContextLost => "context_lost",
        DeviceCommand::CreateProgram(_) => "create_program",
        DeviceCommand::UploadBuffer(..) => "upload_buffer",
        DeviceCommand::UploadTexture(..) => "upload_texture",
        DeviceCommand::Destroy(_) => "destroy",
        DeviceCommand::BindProgram(_) => "bind_program",
        DeviceCommand::BindBuffer(..) => "bind_buffer",
        DeviceCommand::BindTexture(..) => "bind_texture",
        DeviceCommand::SetUniform(_) => "set_uniform",
        DeviceCommand::ApplyRenderState(_) => "apply_render_state",
        DeviceCommand::SetViewport(_) => "set_viewport",
        DeviceCommand::Clear => "clear",
        DeviceCommand::DrawIndexed(_) => "draw_indexed",
    }
}

// ============================================================================
// HeadlessDevice
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct HeadlessDevice {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== INSPECTION =====

    /// Command names in call order
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().commands.clone()
    }

    /// Full command log in call order
    pub fn command_log(&self) -> Vec<DeviceCommand> {
        self.state.lock().log.clone()
    }

    pub fn counters(&self) -> DeviceCounters {
        self.state.lock().counters
    }

    /// Number of live objects in the current context
    pub fn live_objects(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Forget recorded commands, keep counters and objects
    pub fn clear_commands(&self) {
        let mut state = self.state.lock();
        state.commands.clear();
        state.log.clear();
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn on_context_acquired(&mut self, info: ContextInfo) -> Result<()> {
        let mut state = self.state.lock();
        state.generation += 1;
        state.live.clear();
        state.context = Some(info);
        state.record(DeviceCommand::ContextAcquired(info));
        Ok(())
    }

    fn on_context_lost(&mut self) {
        let mut state = self.state.lock();
        state.context = None;
        state.live.clear();
        state.record(DeviceCommand::ContextLost);
    }

    fn context(&self) -> Option<ContextInfo> {
        self.state.lock().context
    }

    fn generation(&self) -> u32 {
        self.state.lock().generation
    }

    fn is_valid(&self, handle: GpuHandle) -> bool {
        let state = self.state.lock();
        state.context.is_some()
            && handle.generation == state.generation
            && state.live.contains_key(&handle.id)
    }

    fn create_program(&mut self, vertex_source: &str, fragment_source: &str) -> Result<GpuHandle> {
        let mut state = self.state.lock();
        state.require_context("create_program")?;
        if vertex_source.is_empty() || fragment_source.is_empty() {
            return Err(Error::BackendError("create_program: empty shader source".to_string()));
        }
        let handle = state.allocate(ObjectKind::Program);
        state.counters.programs_created += 1;
        state.record(DeviceCommand::CreateProgram(handle));
        Ok(handle)
    }

    fn upload_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<GpuHandle> {
        let mut state = self.state.lock();
        state.require_context("upload_buffer")?;
        let handle = state.allocate(ObjectKind::Buffer);
        state.counters.buffers_uploaded += 1;
        state.record(DeviceCommand::UploadBuffer(kind, handle, data.len()));
        Ok(handle)
    }

    fn upload_texture(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
        data: &[u8],
    ) -> Result<GpuHandle> {
        let mut state = self.state.lock();
        state.require_context("upload_texture")?;
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(Error::BackendError(format!(
                "upload_texture: expected {} bytes for {}x{} {:?}, got {}",
                expected, width, height, format, data.len()
            )));
        }
        let handle = state.allocate(ObjectKind::Texture);
        state.counters.textures_uploaded += 1;
        state.record(DeviceCommand::UploadTexture(handle, width, height));
        Ok(handle)
    }

    fn destroy(&mut self, handle: GpuHandle) -> Result<()> {
        let mut state = self.state.lock();
        state.require_context("destroy")?;
        if handle.generation != state.generation || state.live.remove(&handle.id).is_none() {
            return Err(Error::InvalidHandle(format!("destroy: {} is not live", handle)));
        }
        state.counters.objects_destroyed += 1;
        state.record(DeviceCommand::Destroy(handle));
        Ok(())
    }

    fn bind_program(&mut self, program: GpuHandle) -> Result<()> {
        let mut state = self.state.lock();
        state.require_context("bind_program")?;
        state.check_handle(program, ObjectKind::Program)?;
        state.record(DeviceCommand::BindProgram(program));
        Ok(())
    }

    fn bind_buffer(&mut self, kind: BufferKind, buffer: GpuHandle) -> Result<()> {
        let mut state = self.state.lock();
        state.require_context("bind_buffer")?;
        state.check_handle(buffer, ObjectKind::Buffer)?;
        state.record(DeviceCommand::BindBuffer(kind, buffer));
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: GpuHandle) -> Result<()> {
        let mut state = self.state.lock();
        state.require_context("bind_texture")?;
        state.check_handle(texture, ObjectKind::Texture)?;
        state.record(DeviceCommand::BindTexture(unit, texture));
        Ok(())
    }

    fn set_uniform_mat4(&mut self, name: &str, _value: &Mat4) -> Result<()> {
        let mut state = self.state.lock();
        state.require_context("set_uniform_mat4")?;
        state.record(DeviceCommand::SetUniform(name.to_string()));
        Ok(())
    }

    fn apply_render_state(&mut self, render_state: &RenderStateDesc) -> Result<()> {
        let mut state = self.state.lock();
        state.require_context("apply_render_state")?;
        state.counters.state_changes += 1;
        state.record(DeviceCommand::ApplyRenderState(*render_state));
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        let mut state = self.state.lock();
        state.require_context("set_viewport")?;
        state.record(DeviceCommand::SetViewport(viewport));
        Ok(())
    }

    fn clear(&mut self, _color: Vec4) -> Result<()> {
        let mut state = self.state.lock();
        state.require_context("clear")?;
        state.record(DeviceCommand::Clear);
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<()> {
        let mut state = self.state.lock();
        state.require_context("draw_indexed")?;
        state.counters.draw_calls += 1;
        state.record(DeviceCommand::DrawIndexed(index_count));
        Ok(())
    }
}

#[cfg(test)]
#[path = "headless_device_tests.rs"]
mod tests;
