//! Shader resource binding cache
//!
//! Bindings are shared by every draw that uses the same pipeline with the same
//! resources, so they are keyed by pipeline id plus the ordered resource ids
//! rather than by entity.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::render::api::{BackendResult, BindingHandle, GraphicsDevice, ResourceId};
use super::pipeline_manager::{PipelineCache, PipelineEntry, PipelineId};

/// A cached binding
#[derive(Debug, Clone)]
pub struct BindingEntry {
    /// Device binding
    pub handle: BindingHandle,
    /// Mutable variables have been bound
    pub initialized: bool,
}

/// Bindings keyed by `(pipeline, resource ids)`
#[derive(Debug, Default)]
pub struct BindingCache {
    entries: HashMap<(PipelineId, Vec<ResourceId>), BindingEntry>,
}

impl BindingCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the binding for this pipeline and resource list, creating it on a miss
    pub fn get_or_create(
        &mut self,
        device: &mut dyn GraphicsDevice,
        pipeline: &PipelineEntry,
        resources: &[ResourceId],
    ) -> BackendResult<&mut BindingEntry> {
        match self.entries.entry((pipeline.id, resources.to_vec())) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(slot) => {
                let handle = device.create_binding(pipeline.handle)?;
                log::debug!("Created binding for pipeline {:?} with {} resources", pipeline.id, resources.len());
                Ok(slot.insert(BindingEntry { handle, initialized: false }))
            }
        }
    }

    /// Number of cached bindings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release every binding
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        for (_, entry) in self.entries.drain() {
            device.release_binding(entry.handle);
        }
    }
}

/// Process-scoped pipeline and binding caches.
///
/// Created after the device and destroyed with [`ShaderCaches::destroy`]
/// before it; the terrain and model renderer only borrow it per call.
#[derive(Debug, Default)]
pub struct ShaderCaches {
    /// Pipeline state objects
    pub pipelines: PipelineCache,
    /// Shader resource bindings
    pub bindings: BindingCache,
}

impl ShaderCaches {
    /// Create empty caches
    pub fn new() -> Self {
        Self::default()
    }

    /// Release bindings, then pipelines
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        self.bindings.destroy(device);
        self.pipelines.destroy(device);
    }
}
