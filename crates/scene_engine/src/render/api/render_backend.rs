//! Graphics device abstraction
//!
//! The scene core never talks to a GPU API directly. Everything it needs from
//! the device (resource creation, discard-write maps, pipeline and binding
//! objects, draw submission) goes through [`GraphicsDevice`], so any backend
//! that implements it can host the terrain and model renderer.

use crate::render::RenderError;
use crate::render::pipeline::{DynamicPipelineState, FixedPipelineState};

use super::types::{
    BindingHandle, BoundResource, BufferDesc, BufferHandle, DrawAttribs, DrawIndexedAttribs,
    PipelineHandle, SamplerDesc, ShaderStages, TextureData, TextureDesc, TextureHandle,
};

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Device interface consumed by the scene core
///
/// All methods are called from the render thread only.
pub trait GraphicsDevice {
    /// Create a buffer, optionally initialised with `initial` bytes.
    ///
    /// Immutable buffers must be given their contents here.
    fn create_buffer(&mut self, desc: &BufferDesc, initial: Option<&[u8]>) -> BackendResult<BufferHandle>;

    /// Create a texture with one [`TextureData`] per array layer (may be empty
    /// for default and dynamic textures)
    fn create_texture(&mut self, desc: &TextureDesc, layers: &[TextureData<'_>]) -> BackendResult<TextureHandle>;

    /// Attach a sampler to a texture's default view
    fn set_texture_sampler(&mut self, texture: TextureHandle, sampler: SamplerDesc) -> BackendResult<()>;

    /// Replace the contents of layer 0 of a default-usage texture
    fn update_texture(&mut self, texture: TextureHandle, data: TextureData<'_>) -> BackendResult<()>;

    /// Map a dynamic buffer with discard semantics and write `data` into it
    fn write_buffer_discard(&mut self, buffer: BufferHandle, data: &[u8]) -> BackendResult<()>;

    /// Release a buffer
    fn release_buffer(&mut self, buffer: BufferHandle);

    /// Release a texture
    fn release_texture(&mut self, texture: TextureHandle);

    /// Compile a pipeline state object
    fn create_pipeline(
        &mut self,
        fixed: &FixedPipelineState,
        dynamic: &DynamicPipelineState,
    ) -> BackendResult<PipelineHandle>;

    /// Release a pipeline state object
    fn release_pipeline(&mut self, pipeline: PipelineHandle);

    /// Bind a resource to a pipeline-level static variable.
    ///
    /// Returns `false` when the pipeline's shaders do not declare the variable.
    fn set_static_variable(
        &mut self,
        pipeline: PipelineHandle,
        stages: ShaderStages,
        name: &str,
        resource: BoundResource,
    ) -> bool;

    /// Create a shader resource binding for a pipeline
    fn create_binding(&mut self, pipeline: PipelineHandle) -> BackendResult<BindingHandle>;

    /// Bind a resource to a mutable variable of a binding.
    ///
    /// Returns `false` when the variable is not declared.
    fn set_binding_variable(
        &mut self,
        binding: BindingHandle,
        stages: ShaderStages,
        name: &str,
        resource: BoundResource,
    ) -> bool;

    /// Release a shader resource binding
    fn release_binding(&mut self, binding: BindingHandle);

    /// Bind the vertex buffer for subsequent draws
    fn set_vertex_buffer(&mut self, buffer: BufferHandle);

    /// Bind the 32-bit index buffer for subsequent draws
    fn set_index_buffer(&mut self, buffer: BufferHandle);

    /// Bind a pipeline for subsequent draws
    fn set_pipeline(&mut self, pipeline: PipelineHandle);

    /// Commit a shader resource binding for subsequent draws
    fn commit_bindings(&mut self, binding: BindingHandle);

    /// Submit a non-indexed draw
    fn draw(&mut self, attribs: &DrawAttribs);

    /// Submit an indexed draw
    fn draw_indexed(&mut self, attribs: &DrawIndexedAttribs);
}
