//! In-memory graphics device
//!
//! Keeps every resource's contents on the CPU and records draws into a
//! [`RenderQueue`] together with the state bound at the time. Used by the
//! headless demo and by tests to inspect exactly what the scene submitted.

use std::collections::HashMap;

use slotmap::{new_key_type, Key, KeyData, SlotMap};

use crate::render::api::{
    BackendResult, BindingHandle, BoundResource, BufferDesc, BufferHandle, DrawAttribs,
    DrawIndexedAttribs, GraphicsDevice, PipelineHandle, SamplerDesc, ShaderStages, TextureData,
    TextureDesc, TextureHandle, Usage,
};
use crate::render::pipeline::{DynamicPipelineState, FixedPipelineState};
use crate::render::render_queue::{DrawKind, QueuedDraw, RenderQueue};
use crate::render::RenderError;

new_key_type! {
    struct BufferKey;
    struct TextureKey;
    struct PipelineKey;
    struct BindingKey;
}

fn to_ffi<K: Key>(key: K) -> u64 {
    key.data().as_ffi()
}

fn from_ffi<K: Key>(raw: u64) -> K {
    KeyData::from_ffi(raw).into()
}

/// A buffer and its current contents
#[derive(Debug, Clone)]
pub struct RecordedBuffer {
    /// Creation parameters
    pub desc: BufferDesc,
    /// Latest contents
    pub data: Vec<u8>,
    /// Number of discard writes since creation
    pub writes: u32,
}

/// A texture and its current contents
#[derive(Debug, Clone)]
pub struct RecordedTexture {
    /// Creation parameters
    pub desc: TextureDesc,
    /// Tightly packed contents per array layer
    pub layers: Vec<Vec<u8>>,
    /// Attached sampler
    pub sampler: Option<SamplerDesc>,
    /// Number of uploads after creation
    pub updates: u32,
}

/// A pipeline and its bound static variables
#[derive(Debug, Clone)]
pub struct RecordedPipeline {
    /// Shader program and target formats
    pub fixed: FixedPipelineState,
    /// Raster and blend state
    pub dynamic: DynamicPipelineState,
    /// Static variables by name
    pub statics: HashMap<String, (ShaderStages, BoundResource)>,
}

/// A binding and its bound variables
#[derive(Debug, Clone)]
pub struct RecordedBinding {
    /// Owning pipeline
    pub pipeline: PipelineHandle,
    /// Mutable variables by name
    pub variables: HashMap<String, (ShaderStages, BoundResource)>,
}

/// Graphics device that records instead of rendering
#[derive(Debug, Default)]
pub struct RecordingDevice {
    buffers: SlotMap<BufferKey, RecordedBuffer>,
    textures: SlotMap<TextureKey, RecordedTexture>,
    pipelines: SlotMap<PipelineKey, RecordedPipeline>,
    bindings: SlotMap<BindingKey, RecordedBinding>,
    queue: RenderQueue,
    bound_pipeline: Option<PipelineHandle>,
    bound_binding: Option<BindingHandle>,
    bound_vertex_buffer: Option<BufferHandle>,
    bound_index_buffer: Option<BufferHandle>,
    fail_creation: bool,
}

impl RecordingDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent resource creation fail, to exercise load failure paths
    pub fn set_fail_creation(&mut self, fail: bool) {
        self.fail_creation = fail;
    }

    /// Buffer by handle
    pub fn buffer(&self, handle: BufferHandle) -> Option<&RecordedBuffer> {
        self.buffers.get(from_ffi::<BufferKey>(handle.0))
    }

    /// Texture by handle
    pub fn texture(&self, handle: TextureHandle) -> Option<&RecordedTexture> {
        self.textures.get(from_ffi::<TextureKey>(handle.0))
    }

    /// Pipeline by handle
    pub fn pipeline(&self, handle: PipelineHandle) -> Option<&RecordedPipeline> {
        self.pipelines.get(from_ffi::<PipelineKey>(handle.0))
    }

    /// Binding by handle
    pub fn binding(&self, handle: BindingHandle) -> Option<&RecordedBinding> {
        self.bindings.get(from_ffi::<BindingKey>(handle.0))
    }

    /// Draws recorded since the last [`RecordingDevice::end_frame`]
    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    /// Sort the frame's draws, hand them to `submit` and clear the queue
    pub fn end_frame(&mut self, submit: impl FnOnce(&RenderQueue)) {
        self.queue.sort();
        submit(&self.queue);
        self.queue.clear();
    }

    /// Live buffer count
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Live texture count
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Live pipeline count
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Live binding count
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    fn check_creation(&self, what: &str) -> BackendResult<()> {
        if self.fail_creation {
            return Err(RenderError::ResourceCreationFailed(format!("{what} creation disabled")));
        }
        Ok(())
    }

    fn record_draw(&mut self, kind: DrawKind, classify: crate::render::api::RenderClassify, classify_index: u32) {
        self.queue.push(QueuedDraw {
            pipeline: self.bound_pipeline,
            binding: self.bound_binding,
            vertex_buffer: self.bound_vertex_buffer,
            index_buffer: self.bound_index_buffer,
            kind,
            classify,
            classify_index,
            sequence: 0,
        });
    }
}

fn pack_layer(desc: &TextureDesc, layer: &TextureData<'_>) -> BackendResult<Vec<u8>> {
    let row = desc.row_pitch();
    let rows = desc.height as usize;
    if layer.stride < row || layer.data.len() < layer.stride * (rows.max(1) - 1) + row {
        return Err(RenderError::ResourceCreationFailed(format!(
            "texture '{}' data too small: {} bytes with stride {}",
            desc.name,
            layer.data.len(),
            layer.stride
        )));
    }

    let mut packed = Vec::with_capacity(row * rows);
    for y in 0..rows {
        let start = y * layer.stride;
        packed.extend_from_slice(&layer.data[start..start + row]);
    }
    Ok(packed)
}

impl GraphicsDevice for RecordingDevice {
    fn create_buffer(&mut self, desc: &BufferDesc, initial: Option<&[u8]>) -> BackendResult<BufferHandle> {
        self.check_creation("buffer")?;
        let size = desc.size as usize;
        let data = match initial {
            Some(bytes) if bytes.len() != size => {
                return Err(RenderError::ResourceCreationFailed(format!(
                    "buffer '{}' expects {size} bytes, got {}",
                    desc.name,
                    bytes.len()
                )));
            }
            Some(bytes) => bytes.to_vec(),
            None if desc.usage == Usage::Immutable => {
                return Err(RenderError::ResourceCreationFailed(format!(
                    "immutable buffer '{}' created without data",
                    desc.name
                )));
            }
            None => vec![0; size],
        };

        let key = self.buffers.insert(RecordedBuffer { desc: desc.clone(), data, writes: 0 });
        Ok(BufferHandle(to_ffi(key)))
    }

    fn create_texture(&mut self, desc: &TextureDesc, layers: &[TextureData<'_>]) -> BackendResult<TextureHandle> {
        self.check_creation("texture")?;
        let layer_count = desc.layers() as usize;
        let packed = if layers.is_empty() {
            if desc.usage == Usage::Immutable {
                return Err(RenderError::ResourceCreationFailed(format!(
                    "immutable texture '{}' created without data",
                    desc.name
                )));
            }
            vec![vec![0; desc.row_pitch() * desc.height as usize]; layer_count]
        } else if layers.len() == layer_count {
            layers
                .iter()
                .map(|layer| pack_layer(desc, layer))
                .collect::<BackendResult<Vec<_>>>()?
        } else {
            return Err(RenderError::ResourceCreationFailed(format!(
                "texture '{}' expects {layer_count} layers, got {}",
                desc.name,
                layers.len()
            )));
        };

        let key = self.textures.insert(RecordedTexture {
            desc: desc.clone(),
            layers: packed,
            sampler: None,
            updates: 0,
        });
        Ok(TextureHandle(to_ffi(key)))
    }

    fn set_texture_sampler(&mut self, texture: TextureHandle, sampler: SamplerDesc) -> BackendResult<()> {
        let recorded = self
            .textures
            .get_mut(from_ffi::<TextureKey>(texture.0))
            .ok_or(RenderError::InvalidHandle("texture"))?;
        recorded.sampler = Some(sampler);
        Ok(())
    }

    fn update_texture(&mut self, texture: TextureHandle, data: TextureData<'_>) -> BackendResult<()> {
        let recorded = self
            .textures
            .get_mut(from_ffi::<TextureKey>(texture.0))
            .ok_or(RenderError::InvalidHandle("texture"))?;
        if recorded.desc.usage == Usage::Immutable {
            return Err(RenderError::RenderingFailed(format!(
                "texture '{}' is immutable",
                recorded.desc.name
            )));
        }
        let packed = pack_layer(&recorded.desc, &data)?;
        recorded.layers[0] = packed;
        recorded.updates += 1;
        Ok(())
    }

    fn write_buffer_discard(&mut self, buffer: BufferHandle, data: &[u8]) -> BackendResult<()> {
        let recorded = self
            .buffers
            .get_mut(from_ffi::<BufferKey>(buffer.0))
            .ok_or(RenderError::InvalidHandle("buffer"))?;
        if recorded.desc.usage != Usage::Dynamic || data.len() > recorded.data.len() {
            return Err(RenderError::RenderingFailed(format!(
                "cannot map buffer '{}' for a {} byte write",
                recorded.desc.name,
                data.len()
            )));
        }
        recorded.data.fill(0);
        recorded.data[..data.len()].copy_from_slice(data);
        recorded.writes += 1;
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(from_ffi::<BufferKey>(buffer.0));
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(from_ffi::<TextureKey>(texture.0));
    }

    fn create_pipeline(
        &mut self,
        fixed: &FixedPipelineState,
        dynamic: &DynamicPipelineState,
    ) -> BackendResult<PipelineHandle> {
        self.check_creation("pipeline")?;
        if !fixed.program.is_valid() {
            return Err(RenderError::ResourceCreationFailed("pipeline without a program".into()));
        }
        let key = self.pipelines.insert(RecordedPipeline {
            fixed: *fixed,
            dynamic: *dynamic,
            statics: HashMap::new(),
        });
        Ok(PipelineHandle(to_ffi(key)))
    }

    fn release_pipeline(&mut self, pipeline: PipelineHandle) {
        self.pipelines.remove(from_ffi::<PipelineKey>(pipeline.0));
    }

    fn set_static_variable(
        &mut self,
        pipeline: PipelineHandle,
        stages: ShaderStages,
        name: &str,
        resource: BoundResource,
    ) -> bool {
        self.pipelines
            .get_mut(from_ffi::<PipelineKey>(pipeline.0))
            .map(|recorded| recorded.statics.insert(name.to_string(), (stages, resource)))
            .is_some()
    }

    fn create_binding(&mut self, pipeline: PipelineHandle) -> BackendResult<BindingHandle> {
        self.check_creation("binding")?;
        if !self.pipelines.contains_key(from_ffi::<PipelineKey>(pipeline.0)) {
            return Err(RenderError::InvalidHandle("pipeline"));
        }
        let key = self.bindings.insert(RecordedBinding { pipeline, variables: HashMap::new() });
        Ok(BindingHandle(to_ffi(key)))
    }

    fn set_binding_variable(
        &mut self,
        binding: BindingHandle,
        stages: ShaderStages,
        name: &str,
        resource: BoundResource,
    ) -> bool {
        self.bindings
            .get_mut(from_ffi::<BindingKey>(binding.0))
            .map(|recorded| recorded.variables.insert(name.to_string(), (stages, resource)))
            .is_some()
    }

    fn release_binding(&mut self, binding: BindingHandle) {
        self.bindings.remove(from_ffi::<BindingKey>(binding.0));
    }

    fn set_vertex_buffer(&mut self, buffer: BufferHandle) {
        self.bound_vertex_buffer = Some(buffer);
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle) {
        self.bound_index_buffer = Some(buffer);
    }

    fn set_pipeline(&mut self, pipeline: PipelineHandle) {
        self.bound_pipeline = Some(pipeline);
    }

    fn commit_bindings(&mut self, binding: BindingHandle) {
        self.bound_binding = Some(binding);
    }

    fn draw(&mut self, attribs: &DrawAttribs) {
        self.record_draw(
            DrawKind::Vertices {
                vertex_count: attribs.vertex_count,
                start_vertex: attribs.start_vertex,
            },
            attribs.classify,
            attribs.classify_index,
        );
    }

    fn draw_indexed(&mut self, attribs: &DrawIndexedAttribs) {
        self.record_draw(
            DrawKind::Indexed { index_count: attribs.index_count },
            attribs.classify,
            attribs.classify_index,
        );
    }
}
