//! Pipeline cache
//!
//! Pipelines are created on first use and shared by every draw with the same
//! fixed and dynamic state. Each entry remembers whether its static shader
//! variables have been bound so callers bind them exactly once.

use std::collections::HashMap;

use crate::render::api::{BackendResult, GraphicsDevice, PipelineHandle};
use super::pipeline_config::{DynamicPipelineState, FixedPipelineState};

/// Dense id of a cached pipeline, used in binding cache keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineId(pub u32);

/// A cached pipeline
#[derive(Debug, Clone)]
pub struct PipelineEntry {
    /// Cache id
    pub id: PipelineId,
    /// Device pipeline
    pub handle: PipelineHandle,
    /// Static variables have been bound
    pub static_initialized: bool,
}

/// Pipelines keyed by `(fixed, dynamic)` state
#[derive(Debug, Default)]
pub struct PipelineCache {
    entries: Vec<PipelineEntry>,
    lookup: HashMap<(FixedPipelineState, DynamicPipelineState), usize>,
}

impl PipelineCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the pipeline for this state, creating it on a miss
    pub fn get_or_create(
        &mut self,
        device: &mut dyn GraphicsDevice,
        fixed: &FixedPipelineState,
        dynamic: &DynamicPipelineState,
    ) -> BackendResult<&mut PipelineEntry> {
        let key = (*fixed, *dynamic);
        let index = if let Some(&index) = self.lookup.get(&key) {
            index
        } else {
            let handle = device.create_pipeline(fixed, dynamic)?;
            let index = self.entries.len();
            log::debug!("Created pipeline {index} for program {:?}", fixed.program);
            self.entries.push(PipelineEntry {
                id: PipelineId(index as u32),
                handle,
                static_initialized: false,
            });
            self.lookup.insert(key, index);
            index
        };

        Ok(&mut self.entries[index])
    }

    /// Number of cached pipelines
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release every pipeline
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        for entry in self.entries.drain(..) {
            device.release_pipeline(entry.handle);
        }
        self.lookup.clear();
    }
}
