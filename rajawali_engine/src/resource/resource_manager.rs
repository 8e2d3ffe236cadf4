/// Reference-counted registry of GPU-backed resources, shared by scenes.
///
/// Registration and release happen through render tasks so that GPU
/// allocation and destruction only ever run on the render thread: `add`
/// and `remove` build the task, the caller submits it. The first `add` of a
/// name uploads the resource, the last matching `remove` releases it.
///
/// After a context is reacquired, `reload` recreates the GPU objects of
/// every registered resource.

use std::sync::Arc;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use crate::control::{RenderTask, TaskKind};
use crate::error::Result;
use crate::renderer::GraphicsDevice;
use crate::engine_bail;
use super::material::Material;
use super::texture::Texture;

const SOURCE: &str = "rajawali::ResourceManager";

/// A resource whose GPU objects can be (re)created and freed on demand
pub trait GpuResource: Send + Sync + 'static {
    /// Task kind used when registering
    const ADD_TASK: TaskKind;
    /// Task kind used when unregistering
    const REMOVE_TASK: TaskKind;

    fn name(&self) -> &str;

    /// Create GPU objects if missing or stale.
    fn ensure_uploaded(&self, device: &mut dyn GraphicsDevice) -> Result<()>;

    /// Free live GPU objects.
    fn release(&self, device: &mut dyn GraphicsDevice) -> Result<()>;

    fn is_uploaded(&self, device: &dyn GraphicsDevice) -> bool;
}

struct Entry<R> {
    resource: Arc<R>,
    references: usize,
}

pub struct ResourceManager<R: GpuResource> {
    entries: Mutex<FxHashMap<String, Entry<R>>>,
}

pub type MaterialManager = ResourceManager<Material>;
pub type TextureManager = ResourceManager<Texture>;

impl<R: GpuResource> ResourceManager<R> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    // ===== TASK FACTORIES =====

    /// Task that registers `resource`, uploading it on first registration.
    pub fn add(self: &Arc<Self>, resource: Arc<R>) -> RenderTask {
        let manager = Arc::clone(self);
        let target = resource.name().to_string();
        RenderTask::new(R::ADD_TASK, move |context| manager.register(resource, context.device))
            .with_target(target)
    }

    /// Task that drops one reference to `name`, releasing it on the last.
    pub fn remove(self: &Arc<Self>, name: &str) -> RenderTask {
        let manager = Arc::clone(self);
        let target = name.to_string();
        let key = target.clone();
        RenderTask::new(R::REMOVE_TASK, move |context| manager.unregister(&key, context.device))
            .with_target(target)
    }

    // ===== RENDER THREAD =====

    /// # Errors
    ///
    /// `InvalidState` if a different resource is already registered under
    /// the same name; the device error if the first upload fails, in which
    /// case nothing is registered.
    pub fn register(&self, resource: Arc<R>, device: &mut dyn GraphicsDevice) -> Result<()> {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(resource.name()) {
            if !Arc::ptr_eq(&entry.resource, &resource) {
                engine_bail!(SOURCE, "A different resource named '{}' is already registered", resource.name());
            }
            entry.references += 1;
            return Ok(());
        }

        resource.ensure_uploaded(device)?;
        crate::engine_debug!(SOURCE, "Registered '{}'", resource.name());
        entries.insert(resource.name().to_string(), Entry { resource, references: 1 });
        Ok(())
    }

    /// # Errors
    ///
    /// `InvalidState` if `name` is not registered.
    pub fn unregister(&self, name: &str, device: &mut dyn GraphicsDevice) -> Result<()> {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(name) else {
            engine_bail!(SOURCE, "Cannot remove '{}': not registered", name);
        };
        entry.references -= 1;
        if entry.references > 0 {
            return Ok(());
        }

        if let Some(entry) = entries.remove(name) {
            entry.resource.release(device)?;
            crate::engine_debug!(SOURCE, "Released '{}'", name);
        }
        Ok(())
    }

    /// Recreate GPU objects for every registered resource. Returns how many
    /// needed a new upload.
    pub fn reload(&self, device: &mut dyn GraphicsDevice) -> Result<usize> {
        let entries = self.entries.lock();
        let mut reloaded = 0;
        for entry in entries.values() {
            if !entry.resource.is_uploaded(device) {
                entry.resource.ensure_uploaded(device)?;
                reloaded += 1;
            }
        }
        if reloaded > 0 {
            crate::engine_debug!(SOURCE, "Reloaded {} resource(s) for the new context", reloaded);
        }
        Ok(reloaded)
    }

    /// Release everything regardless of reference counts.
    pub fn clear(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        let drained: Vec<Entry<R>> = self.entries.lock().drain().map(|(_, entry)| entry).collect();
        for entry in drained {
            entry.resource.release(device)?;
        }
        Ok(())
    }

    // ===== QUERIES =====

    pub fn get(&self, name: &str) -> Option<Arc<R>> {
        self.entries.lock().get(name).map(|entry| Arc::clone(&entry.resource))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().contains_key(name)
    }

    /// Number of outstanding `add`s for `name`, 0 if unregistered.
    pub fn reference_count(&self, name: &str) -> usize {
        self.entries.lock().get(name).map_or(0, |entry| entry.references)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<R: GpuResource> Default for ResourceManager<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "resource_manager_tests.rs"]
mod tests;
