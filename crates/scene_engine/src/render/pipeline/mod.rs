//! Pipeline and binding caches
//!
//! Pipelines are keyed by shader program, render target formats and
//! raster/blend state; bindings by pipeline and the resources they reference.

pub mod pipeline_manager;
pub mod pipeline_config;
pub mod binding_cache;

pub use pipeline_manager::{PipelineCache, PipelineEntry, PipelineId};
pub use pipeline_config::{
    BlendFactor, BlendOp, CullMode, DynamicPipelineState, FixedPipelineState,
};
pub use binding_cache::{BindingCache, BindingEntry, ShaderCaches};
