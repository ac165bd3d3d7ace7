//! Terrain and grass pipelines

use serde::{Deserialize, Serialize};

use crate::render::api::{
    BackendResult, BindingHandle, BoundResource, BufferHandle, DrawIndexedAttribs,
    GraphicsDevice, PipelineHandle, RenderClassify, ResourceId, ShaderProgramId, ShaderStages,
    TextureHandle,
};
use crate::render::context::RenderContext;
use crate::render::pipeline::{
    BlendFactor, BlendOp, CullMode, DynamicPipelineState, FixedPipelineState, ShaderCaches,
};

use super::geometry::TerrainGeometry;
use super::TERRAIN_INDEX_COUNT;

/// Shader programs for the two terrain passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainPrograms {
    /// Opaque ground
    pub terrain: ShaderProgramId,
    /// Blended grass
    pub grass: ShaderProgramId,
}

impl Default for TerrainPrograms {
    fn default() -> Self {
        Self { terrain: ShaderProgramId::INVALID, grass: ShaderProgramId::INVALID }
    }
}

/// A resolved pipeline and its binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainPass {
    /// Pipeline state
    pub pipeline: PipelineHandle,
    /// Shader resource binding
    pub binding: BindingHandle,
}

/// Resources bound as static variables of a terrain pipeline
#[derive(Debug, Clone, Copy)]
pub struct PassResources {
    /// `g_HeightTexture`
    pub height: TextureHandle,
    /// `g_LightTexture`
    pub light: TextureHandle,
    /// `g_NormalTexture`
    pub normal: TextureHandle,
    /// `g_MappingTexture`
    pub mapping: TextureHandle,
    /// `g_UVTexture`, the ground or grass lookup
    pub uv: TextureHandle,
    /// `g_AttributesTexture`
    pub attributes: TextureHandle,
    /// `TerrainSettings`
    pub settings: BufferHandle,
    /// Pixel stage `g_Textures`
    pub textures: TextureHandle,
}

/// Grass draws both faces and blends over the ground without writing depth
pub fn grass_state() -> DynamicPipelineState {
    DynamicPipelineState {
        blend_enable: true,
        src_blend: BlendFactor::SrcAlpha,
        dest_blend: BlendFactor::InvSrcAlpha,
        blend_op: BlendOp::Add,
        depth_write: false,
        ..DynamicPipelineState::default()
    }
    .with_cull_mode(CullMode::None)
    .with_alpha_write(false)
}

/// Resolve the pipeline, bind its statics once and fetch its binding
pub fn prepare_pass(
    device: &mut dyn GraphicsDevice,
    caches: &mut ShaderCaches,
    context: &RenderContext,
    program: ShaderProgramId,
    dynamic: &DynamicPipelineState,
    resources: &PassResources,
) -> BackendResult<TerrainPass> {
    let targets = context.targets();
    let fixed = FixedPipelineState {
        program,
        color_format: targets.color,
        depth_format: targets.depth,
    };

    let pipeline = caches.pipelines.get_or_create(device, &fixed, dynamic)?;
    if !pipeline.static_initialized {
        let statics = [
            (ShaderStages::VERTEX, "ModelViewProj", BoundResource::Buffer(context.view_proj_uniform())),
            (ShaderStages::VERTEX, "g_HeightTexture", BoundResource::Texture(resources.height)),
            (ShaderStages::VERTEX, "g_LightTexture", BoundResource::Texture(resources.light)),
            (ShaderStages::VERTEX, "g_NormalTexture", BoundResource::Texture(resources.normal)),
            (ShaderStages::VERTEX, "g_MappingTexture", BoundResource::Texture(resources.mapping)),
            (ShaderStages::VERTEX, "g_UVTexture", BoundResource::Texture(resources.uv)),
            (ShaderStages::VERTEX, "g_AttributesTexture", BoundResource::Texture(resources.attributes)),
            (ShaderStages::VERTEX, "TerrainSettings", BoundResource::Buffer(resources.settings)),
            (ShaderStages::PIXEL, "g_Textures", BoundResource::Texture(resources.textures)),
        ];
        for (stages, name, resource) in statics {
            if !device.set_static_variable(pipeline.handle, stages, name, resource) {
                log::debug!("Terrain program {:?} does not declare {name}", program);
            }
        }
        pipeline.static_initialized = true;
    }

    let binding = caches.bindings.get_or_create(device, pipeline, &[ResourceId::INVALID])?;
    binding.initialized = true;

    Ok(TerrainPass { pipeline: pipeline.handle, binding: binding.handle })
}

/// Bind the shared geometry and submit one pass
pub fn draw_pass(
    device: &mut dyn GraphicsDevice,
    geometry: &TerrainGeometry,
    pass: &TerrainPass,
    classify: RenderClassify,
) {
    device.set_vertex_buffer(geometry.vertex_buffer);
    device.set_index_buffer(geometry.index_buffer);
    device.set_pipeline(pass.pipeline);
    device.commit_bindings(pass.binding);
    device.draw_indexed(&DrawIndexedAttribs {
        index_count: TERRAIN_INDEX_COUNT,
        classify,
        classify_index: 1,
    });
}
