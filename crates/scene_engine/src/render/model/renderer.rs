//! Model renderer
//!
//! Draws posed models mesh by mesh. Pipelines and bindings come from the
//! shared [`ShaderCaches`]; their constant resources are bound the first
//! time each is seen. Per-draw constants go through two [`UniformRing`]s.
//!
//! Missing data (no texture, no meshes, no terrain, a pipeline the device
//! refused) skips the draw without an error.

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::foundation::time::FrameState;
use crate::render::api::{
    BackendResult, BoundResource, DrawAttribs, GraphicsDevice, ResourceId, ShaderStages,
};
use crate::render::context::{RenderContext, RenderMode, ShadowFilter};
use crate::render::pipeline::{FixedPipelineState, ShaderCaches};
use crate::render::skeleton::BoneBuffer;
use crate::render::uniform_ring::UniformRing;
use crate::render::RenderError;
use crate::terrain::Terrain;

use super::uniforms::{
    body_light_uniform, needs_premultiplied_alpha, vec4_array, ModelSettings, ModelViewSettings,
    Z_TEST_REF,
};
use super::{MeshRenderSettings, Model};

/// Per-entity draw parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    /// First bone of the entity in the bone texture
    pub bone_offset: u32,
    /// Model space origin
    pub body_origin: Vec3,
    /// Uniform scale
    pub body_scale: f32,
    /// Shader lighting switch
    pub enable_light: bool,
    /// Resolved body light; alpha below one forces the alpha state
    pub body_light: Vec4,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            bone_offset: 0,
            body_origin: Vec3::zeros(),
            body_scale: 1.0,
            enable_light: true,
            body_light: Vec4::new(1.0, 1.0, 1.0, 1.0),
        }
    }
}

/// Which virtual meshes to draw and which mesh light each physical mesh uses
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualMeshSelection<'a> {
    /// Per virtual mesh switch; absent or empty draws them all
    pub toggles: Option<&'a [bool]>,
    /// Per physical mesh index into its `lights`
    pub lights: Option<&'a [Option<usize>]>,
}

/// Frame-wide inputs shared by every draw
#[derive(Clone, Copy)]
pub struct SceneResources<'a> {
    /// Render mode, shadow map, camera and overrides
    pub context: &'a RenderContext,
    /// Terrain providing the light position; nothing draws without it
    pub terrain: Option<&'a Terrain>,
    /// Bone texture bound to every model pipeline
    pub bones: &'a BoneBuffer,
    /// World time and luminosity
    pub frame: &'a FrameState,
}

/// One mesh submission
struct MeshDraw<'a> {
    model: &'a Model,
    mesh_index: usize,
    config: &'a RenderConfig,
    model_matrix: &'a Mat4,
    settings: Option<&'a MeshRenderSettings>,
    lights: Option<&'a [Option<usize>]>,
}

/// Draws models through the shared caches
pub struct ModelRenderer {
    model_view: UniformRing<ModelViewSettings>,
    settings: UniformRing<ModelSettings>,
}

impl ModelRenderer {
    /// Create the per-draw constant buffers
    pub fn new(device: &mut dyn GraphicsDevice) -> Result<Self, RenderError> {
        let model_view = UniformRing::new(device, "ModelViewSettings").map_err(|e| {
            log::error!("Failed to create model view uniform: {}", e);
            RenderError::InitializationFailed(format!("model view uniform: {e}"))
        })?;
        let settings = match UniformRing::new(device, "ModelSettings") {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Failed to create model settings uniform: {}", e);
                model_view.destroy(device);
                return Err(RenderError::InitializationFailed(format!("model settings uniform: {e}")));
            }
        };

        Ok(Self { model_view, settings })
    }

    /// Start a new frame of draws
    pub fn reset(&mut self) {
        self.model_view.reset();
        self.settings.reset();
    }

    /// Draws issued since the last reset
    pub fn draws_this_frame(&self) -> usize {
        self.settings.allocated()
    }

    /// Draw every selected mesh of `model`, returning how many were submitted
    pub fn render_body(
        &mut self,
        device: &mut dyn GraphicsDevice,
        caches: &mut ShaderCaches,
        scene: &SceneResources<'_>,
        model: &Model,
        config: &RenderConfig,
        selection: VirtualMeshSelection<'_>,
    ) -> BackendResult<usize> {
        if !model.has_meshes() || scene.terrain.is_none() {
            return Ok(0);
        }

        let model_matrix = (Mat4::new_scaling(config.body_scale) * Mat4::new_translation(&config.body_origin)).transpose();
        let mut drawn = 0;

        if model.has_virtual_meshes() {
            let toggles = selection.toggles.filter(|toggles| !toggles.is_empty());
            for (index, virtual_mesh) in model.virtual_meshes.iter().enumerate() {
                if let Some(toggles) = toggles {
                    if !toggles.get(index).copied().unwrap_or(false) {
                        continue;
                    }
                }
                let draw = MeshDraw {
                    model,
                    mesh_index: virtual_mesh.mesh,
                    config,
                    model_matrix: &model_matrix,
                    settings: Some(&virtual_mesh.settings),
                    lights: selection.lights,
                };
                drawn += usize::from(self.render_mesh(device, caches, scene, &draw)?);
            }
        } else {
            for mesh_index in 0..model.meshes.len() {
                let draw = MeshDraw {
                    model,
                    mesh_index,
                    config,
                    model_matrix: &model_matrix,
                    settings: None,
                    lights: None,
                };
                drawn += usize::from(self.render_mesh(device, caches, scene, &draw)?);
            }
        }

        Ok(drawn)
    }

    fn render_mesh(
        &mut self,
        device: &mut dyn GraphicsDevice,
        caches: &mut ShaderCaches,
        scene: &SceneResources<'_>,
        draw: &MeshDraw<'_>,
    ) -> BackendResult<bool> {
        let model = draw.model;
        let Some(mesh) = model.meshes.get(draw.mesh_index) else {
            return Ok(false);
        };
        if mesh.vertex_count == 0 {
            return Ok(false);
        }
        let (Some(terrain), Some(vertex_buffer)) = (scene.terrain, model.vertex_buffer) else {
            return Ok(false);
        };
        let context = scene.context;

        let settings = draw.settings.unwrap_or(&mesh.settings);
        let model_texture = model.textures.get(draw.mesh_index);
        let texture = settings
            .texture
            .as_ref()
            .or_else(|| model_texture.and_then(|slot| context.texture_override(slot.kind)))
            .or_else(|| model_texture.and_then(|slot| slot.texture.as_ref()));
        let Some(texture) = texture.filter(|texture| texture.is_valid()) else {
            return Ok(false);
        };

        let mut body_light = draw.config.body_light.xyz();
        let mesh_light = draw
            .lights
            .and_then(|lights| lights.get(draw.mesh_index).copied().flatten())
            .and_then(|index| mesh.settings.lights.get(index));
        if let Some(mesh_light) = mesh_light {
            body_light = mesh_light.apply(&body_light, &scene.frame.luminosity_vector());
        }

        let targets = context.targets();
        let fixed = FixedPipelineState {
            program: match context.mode {
                RenderMode::Normal => settings.program,
                RenderMode::ShadowMap => settings.shadow_program,
            },
            color_format: targets.color,
            depth_format: targets.depth,
        };
        let is_alpha = texture.has_alpha() || draw.config.body_light.w < 1.0;
        let dynamic = match context.mode {
            RenderMode::Normal => settings.render_state.select(is_alpha),
            RenderMode::ShadowMap => settings.shadow_render_state.select(is_alpha),
        };

        let Ok(pipeline) = caches.pipelines.get_or_create(device, &fixed, dynamic) else {
            log::trace!("No pipeline for program {:?}, skipping mesh", fixed.program);
            return Ok(false);
        };
        if !pipeline.static_initialized {
            device.set_static_variable(pipeline.handle, ShaderStages::VERTEX, "cbCameraAttribs", BoundResource::Buffer(context.camera_uniform()));
            device.set_static_variable(pipeline.handle, ShaderStages::VERTEX | ShaderStages::PIXEL, "cbLightAttribs", BoundResource::Buffer(context.light_uniform()));
            device.set_static_variable(pipeline.handle, ShaderStages::VERTEX, "ModelViewProj", BoundResource::Buffer(self.model_view.buffer()));
            device.set_static_variable(pipeline.handle, ShaderStages::VERTEX, "g_SkeletonTexture", BoundResource::Texture(scene.bones.texture()));
            device.set_static_variable(pipeline.handle, ShaderStages::VERTEX | ShaderStages::PIXEL, "ModelSettings", BoundResource::Buffer(self.settings.buffer()));
            pipeline.static_initialized = true;
        }

        let vertex_texture = settings.vertex_texture.as_ref();
        let mut resources: Vec<ResourceId> = Vec::with_capacity(3);
        resources.push(texture.id());
        if let (RenderMode::Normal, Some(shadow_map)) = (context.mode, context.shadow_map) {
            resources.push(shadow_map.id);
        }
        if let Some(vertex_texture) = vertex_texture {
            resources.push(vertex_texture.id());
        }

        let Ok(binding) = caches.bindings.get_or_create(device, pipeline, &resources) else {
            log::trace!("No binding for pipeline {:?}, skipping mesh", pipeline.id);
            return Ok(false);
        };
        if !binding.initialized {
            if let Some(shadow_map) = context.shadow_map {
                match shadow_map.filter {
                    ShadowFilter::Pcf => device.set_binding_variable(binding.handle, ShaderStages::PIXEL, "g_tex2DShadowMap", BoundResource::Texture(shadow_map.comparison)),
                    ShadowFilter::Filterable => device.set_binding_variable(binding.handle, ShaderStages::PIXEL, "g_tex2DFilterableShadowMap", BoundResource::Texture(shadow_map.filterable)),
                };
            }
            if let Some(vertex_texture) = vertex_texture {
                device.set_binding_variable(binding.handle, ShaderStages::VERTEX, "g_VertexTexture", BoundResource::Texture(vertex_texture.handle()));
            }
            device.set_binding_variable(binding.handle, ShaderStages::PIXEL, "g_Texture", BoundResource::Texture(texture.handle()));
            binding.initialized = true;
        }
        let (pipeline_handle, binding_handle) = (pipeline.handle, binding.handle);

        self.model_view.allocate(
            device,
            ModelViewSettings {
                model: (*draw.model_matrix).into(),
                view_proj: (*context.view_projection_transposed()).into(),
            },
        )?;

        let origin = draw.config.body_origin;
        let premultiply_alpha = needs_premultiplied_alpha(settings.premultiply_alpha, texture.has_alpha(), dynamic.src_blend);
        self.settings.allocate(
            device,
            ModelSettings {
                light_position: vec4_array(&terrain.light_position()),
                body_light: body_light_uniform(&body_light, draw.config.body_light.w, settings.premultiply_light),
                body_origin: [origin.x, origin.y, origin.z, 0.0],
                bone_offset: draw.config.bone_offset as f32,
                normal_scale: 0.0,
                enable_light: f32::from(u8::from(draw.config.enable_light)),
                alpha_test: settings.alpha_test,
                premultiply_alpha: f32::from(u8::from(premultiply_alpha)),
                world_time: scene.frame.world_time,
                z_test_ref: Z_TEST_REF,
                dummy1: 0.0,
                blend_tex_coord: [0.0, 0.0],
                dummy2: 0.0,
                dummy3: 0.0,
            },
        )?;

        device.set_pipeline(pipeline_handle);
        device.set_vertex_buffer(vertex_buffer);
        device.commit_bindings(binding_handle);
        device.draw(&DrawAttribs {
            vertex_count: mesh.vertex_count,
            start_vertex: mesh.vertex_offset,
            classify: settings.classify,
            classify_index: settings.classify_index,
        });

        Ok(true)
    }

    /// Release the constant buffers
    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        self.model_view.destroy(device);
        self.settings.destroy(device);
    }
}
