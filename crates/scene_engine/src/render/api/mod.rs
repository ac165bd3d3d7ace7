//! Public rendering API
//!
//! The device trait the scene core renders through, plus the resource
//! descriptors and handles it traffics in.

pub mod render_backend;
pub mod types;

// Re-export commonly used types
pub use render_backend::{GraphicsDevice, BackendResult};
pub use types::{
    BindFlags, BindingHandle, BoundResource, BufferDesc, BufferHandle, DrawAttribs,
    DrawIndexedAttribs, PipelineHandle, RenderClassify, ResourceId, SamplerDesc,
    ShaderProgramId, ShaderStages, TextureAddress, TextureData, TextureDesc,
    TextureDimension, TextureFilter, TextureFormat, TextureHandle, Usage,
};
